pub mod clock;
pub mod codec;
pub mod error;
pub mod event;
pub mod http;
pub mod multiplexer;
pub mod order_book;
pub mod resync;
pub mod stream_client;
pub mod symbol_map;
pub mod transport;

pub use error::ObSyncError;
pub use event::{Event, OrderbookEvent, Trade, TradeEvent, Venue};
pub use multiplexer::{StreamMultiplexer, Subscription, TaggedEvent};
pub use order_book::{OrderBook, SharedOrderBook};
pub use symbol_map::SymbolMap;
