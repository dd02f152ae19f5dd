#[derive(thiserror::Error, Debug)]
pub enum OrderBookError {
    #[error("poisoned lock")]
    PoisonedLock,
}
