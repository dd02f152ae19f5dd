#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("tungstenite error")]
    Tungstenite(#[from] tungstenite::Error),
    #[error("connection closed by peer")]
    Closed,
}
