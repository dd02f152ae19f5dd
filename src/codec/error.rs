#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("malformed frame")]
    Malformed(#[from] serde_json::Error),
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("no timestamps found in orderbook levels")]
    NoTimestamps,
    #[error("unsupported frame shape")]
    UnsupportedShape,
    #[error("this codec does not support REST snapshot fetch")]
    SnapshotNotSupported,
    #[error("symbol lookup failed")]
    SymbolLookup(#[from] crate::symbol_map::error::SymbolMapError),
    #[error("snapshot fetch failed")]
    Fetch(#[from] crate::http::error::FetchError),
}
