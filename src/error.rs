use crate::codec::error::DecodeError;
use crate::http::error::FetchError;
use crate::order_book::error::OrderBookError;
use crate::resync::error::{ResyncGap, ResyncOverflow};
use crate::stream_client::error::StreamClientError;
use crate::symbol_map::error::SymbolMapError;
use crate::transport::error::TransportError;

#[derive(thiserror::Error, Debug)]
pub enum ObSyncError {
    #[error("stream client error")]
    StreamClient(#[from] StreamClientError),
    #[error("transport error")]
    Transport(#[from] TransportError),
    #[error("decode error")]
    Decode(#[from] DecodeError),
    #[error("fetch error")]
    Fetch(#[from] FetchError),
    #[error("symbol map error")]
    SymbolMap(#[from] SymbolMapError),
    #[error("order book error")]
    OrderBook(#[from] OrderBookError),
    #[error("resync gap")]
    ResyncGap(#[from] ResyncGap),
    #[error("resync overflow")]
    ResyncOverflow(#[from] ResyncOverflow),
}
