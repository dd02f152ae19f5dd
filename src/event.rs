use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// A single price/quantity aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub qty: f64,
}

impl Level {
    pub fn new(price: f64, qty: f64) -> Self {
        Self { price, qty }
    }

    pub fn price_key(&self) -> OrderedFloat<f64> {
        OrderedFloat(self.price)
    }

    /// A level with non-positive quantity is a delete marker.
    pub fn is_delete(&self) -> bool {
        self.qty <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Snapshot,
    Update,
}

/// Venues this crate knows how to speak to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    Binance,
    Kraken,
}

impl Venue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Binance => "binance",
            Venue::Kraken => "kraken",
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resync metadata carried by an order book event. Only Binance populates
/// this; other venues leave it `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResyncCursor {
    pub first_update_id: u64,
    pub last_update_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderbookEvent {
    pub exch_name: Venue,
    pub symbol: String,
    pub kind: EventKind,
    /// Descending by price.
    pub bids: Vec<Level>,
    /// Ascending by price.
    pub asks: Vec<Level>,
    pub ts_exchange_ns: i64,
    pub ts_recorded_ns: i64,
    pub cursor: Option<ResyncCursor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub price: f64,
    pub qty: f64,
    pub side: TradeSide,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub exch_name: Venue,
    pub symbol: String,
    pub ts_exchange_ns: i64,
    pub ts_recorded_ns: i64,
    pub trades: Vec<Trade>,
}

/// The type that crosses channel boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Book(OrderbookEvent),
    Trade(TradeEvent),
}

impl Event {
    pub fn symbol(&self) -> &str {
        match self {
            Event::Book(e) => &e.symbol,
            Event::Trade(e) => &e.symbol,
        }
    }

    pub fn venue(&self) -> Venue {
        match self {
            Event::Book(e) => e.exch_name,
            Event::Trade(e) => e.exch_name,
        }
    }
}
