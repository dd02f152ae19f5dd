use crate::event::Venue;

#[derive(thiserror::Error, Debug)]
pub enum SymbolMapError {
    #[error("failed to read symbol map file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse symbol map file")]
    Json(#[from] serde_json::Error),
    #[error("symbol {symbol} has no mapping for venue {venue}")]
    UnmappedSymbol { venue: Venue, symbol: String },
    #[error("venue {venue} has no ws symbol {ws_symbol}")]
    UnknownWsSymbol { venue: Venue, ws_symbol: String },
    #[error("venue {venue} has no rest symbol {rest_symbol}")]
    UnknownRestSymbol { venue: Venue, rest_symbol: String },
}
