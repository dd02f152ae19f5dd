pub mod error;

use std::collections::BTreeMap;
use std::sync::Arc;

use ordered_float::OrderedFloat;
use tokio::sync::Mutex;

use crate::event::{EventKind, Level, OrderbookEvent, Venue};
use error::OrderBookError;

type Side = BTreeMap<OrderedFloat<f64>, f64>;

/// Current top-of-book state for one (venue, symbol), bounded to `depth`
/// price levels per side. A price -> quantity map makes insert/replace/
/// delete collapse onto plain map operations: a non-positive quantity
/// removes the level (a no-op if it was never present), any positive
/// quantity inserts or replaces it.
pub struct OrderBook {
    pub venue: Venue,
    pub symbol: String,
    depth: usize,
    bids: Side,
    asks: Side,
    ts_exchange_ns: i64,
    ts_recorded_ns: i64,
}

impl OrderBook {
    pub fn new(venue: Venue, symbol: impl Into<String>, depth: usize) -> Self {
        Self {
            venue,
            symbol: symbol.into(),
            depth,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            ts_exchange_ns: 0,
            ts_recorded_ns: 0,
        }
    }

    pub fn apply(&mut self, event: &OrderbookEvent) {
        match event.kind {
            EventKind::Snapshot => {
                self.bids = build_side(&event.bids, self.depth, Ordering::Descending);
                self.asks = build_side(&event.asks, self.depth, Ordering::Ascending);
            }
            EventKind::Update => {
                for level in &event.bids {
                    apply_level(&mut self.bids, level);
                }
                for level in &event.asks {
                    apply_level(&mut self.asks, level);
                }
                trim_side(&mut self.bids, self.depth, Ordering::Descending);
                trim_side(&mut self.asks, self.depth, Ordering::Ascending);
            }
        }
        self.ts_exchange_ns = event.ts_exchange_ns;
        self.ts_recorded_ns = event.ts_recorded_ns;
    }

    /// A deep copy of the top `depth` (or fewer, if `depth` is larger than
    /// `self.depth`) levels on each side as a fresh snapshot event.
    pub fn snapshot(&self, depth: Option<usize>) -> OrderbookEvent {
        let n = depth.unwrap_or(self.depth).min(self.depth);
        OrderbookEvent {
            exch_name: self.venue,
            symbol: self.symbol.clone(),
            kind: EventKind::Snapshot,
            bids: self
                .bids
                .iter()
                .rev()
                .take(n)
                .map(|(price, qty)| Level::new(price.0, *qty))
                .collect(),
            asks: self
                .asks
                .iter()
                .take(n)
                .map(|(price, qty)| Level::new(price.0, *qty))
                .collect(),
            ts_exchange_ns: self.ts_exchange_ns,
            ts_recorded_ns: self.ts_recorded_ns,
            cursor: None,
        }
    }

    pub fn best_bid(&self) -> Option<Level> {
        self.bids
            .iter()
            .next_back()
            .map(|(p, q)| Level::new(p.0, *q))
    }

    pub fn best_ask(&self) -> Option<Level> {
        self.asks.iter().next().map(|(p, q)| Level::new(p.0, *q))
    }
}

#[derive(Clone, Copy)]
enum Ordering {
    Ascending,
    Descending,
}

fn build_side(levels: &[Level], depth: usize, order: Ordering) -> Side {
    let mut map = Side::new();
    for level in levels {
        if !level.is_delete() {
            map.insert(level.price_key(), level.qty);
        }
    }
    trim_side(&mut map, depth, order);
    map
}

fn apply_level(map: &mut Side, level: &Level) {
    if level.is_delete() {
        map.remove(&level.price_key());
    } else {
        map.insert(level.price_key(), level.qty);
    }
}

/// Discards excess levels from the far side of the book: lowest bids,
/// highest asks.
fn trim_side(map: &mut Side, depth: usize, order: Ordering) {
    while map.len() > depth {
        let key = match order {
            Ordering::Descending => *map.keys().next().expect("map is non-empty"),
            Ordering::Ascending => *map.keys().next_back().expect("map is non-empty"),
        };
        map.remove(&key);
    }
}

/// `OrderBook` guarded by a single exclusive lock: `apply`/`snapshot` are
/// atomic with respect to each other under concurrent readers. Neither
/// method suspends while holding the guard, so a task can never be
/// cancelled mid-critical-section.
#[derive(Clone)]
pub struct SharedOrderBook {
    inner: Arc<Mutex<OrderBook>>,
}

impl SharedOrderBook {
    pub fn new(book: OrderBook) -> Self {
        Self {
            inner: Arc::new(Mutex::new(book)),
        }
    }

    pub async fn apply(&self, event: &OrderbookEvent) -> Result<(), OrderBookError> {
        let mut guard = self.inner.lock().await;
        guard.apply(event);
        Ok(())
    }

    pub async fn snapshot(&self, depth: Option<usize>) -> Result<OrderbookEvent, OrderBookError> {
        let guard = self.inner.lock().await;
        Ok(guard.snapshot(depth))
    }
}
