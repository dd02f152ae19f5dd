#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("request error")]
    Request(#[from] reqwest::Error),
    #[error("non-success response: {status} {body}")]
    NonSuccess { status: u16, body: String },
}
