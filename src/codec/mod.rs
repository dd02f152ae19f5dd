pub mod binance;
pub mod error;
pub mod kraken;

use async_trait::async_trait;

use crate::clock::Clock;
use crate::event::{OrderbookEvent, TradeEvent, Venue};
use crate::http::HttpFetcher;
use error::DecodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Book,
    Trades,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    Other,
    Heartbeat,
    Book,
    Trade,
}

/// Translates between one venue's wire protocol and the crate's typed events.
/// `StreamClient` is generic over this trait rather than over a per-venue
/// class hierarchy, so codecs are independently unit-testable without a
/// transport.
#[async_trait]
pub trait WireCodec: Send + Sync {
    fn venue(&self) -> Venue;

    fn ws_url(&self) -> &str;

    /// Builds the subscription frame for the given stream and canonical
    /// symbols, translating each symbol through the codec's `SymbolMap`.
    fn encode_subscribe(
        &self,
        kind: StreamKind,
        symbols: &[String],
    ) -> Result<String, DecodeError>;

    fn classify(&self, frame: &str) -> FrameClass;

    fn decode_book(&self, frame: &str, clock: &dyn Clock) -> Result<OrderbookEvent, DecodeError>;

    fn decode_trade(&self, frame: &str, clock: &dyn Clock) -> Result<TradeEvent, DecodeError>;

    /// Only true for Binance: depth deltas must be reconciled against a REST
    /// snapshot before they can be trusted.
    fn requires_resync(&self) -> bool {
        false
    }

    async fn fetch_snapshot(
        &self,
        _http: &dyn HttpFetcher,
        _symbol: &str,
        _depth: usize,
        _clock: &dyn Clock,
    ) -> Result<OrderbookEvent, DecodeError> {
        Err(DecodeError::SnapshotNotSupported)
    }
}
