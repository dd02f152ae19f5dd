use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::clock::Clock;
use crate::event::{EventKind, Level, OrderbookEvent, Trade, TradeEvent, TradeSide, Venue};
use crate::symbol_map::SymbolMap;

use super::error::DecodeError;
use super::{FrameClass, StreamKind, WireCodec};

const WS_URL: &str = "wss://ws.kraken.com";

fn parse_level(level: &Value) -> Result<(Level, f64), DecodeError> {
    let arr = level.as_array().ok_or(DecodeError::UnsupportedShape)?;
    let price: f64 = arr
        .first()
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingField("price"))?
        .parse()
        .map_err(|_| DecodeError::MissingField("price"))?;
    let qty: f64 = arr
        .get(1)
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingField("qty"))?
        .parse()
        .map_err(|_| DecodeError::MissingField("qty"))?;
    let ts: f64 = arr
        .get(2)
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingField("timestamp"))?
        .parse()
        .map_err(|_| DecodeError::MissingField("timestamp"))?;
    Ok((Level::new(price, qty), ts))
}

fn parse_levels(levels: &[Value]) -> Result<(Vec<Level>, Vec<f64>), DecodeError> {
    let mut out = Vec::with_capacity(levels.len());
    let mut timestamps = Vec::with_capacity(levels.len());
    for level in levels {
        let (level, ts) = parse_level(level)?;
        out.push(level);
        timestamps.push(ts);
    }
    Ok((out, timestamps))
}

/// Kraken venue codec. Book frames are self-contained (no resync needed):
/// snapshots and updates are distinguished by key names (`as`/`bs` vs `a`/`b`)
/// rather than by a separate message type.
pub struct KrakenCodec {
    symbols: Arc<SymbolMap>,
}

impl KrakenCodec {
    pub fn new(symbols: Arc<SymbolMap>) -> Self {
        Self { symbols }
    }
}

#[async_trait]
impl WireCodec for KrakenCodec {
    fn venue(&self) -> Venue {
        Venue::Kraken
    }

    fn ws_url(&self) -> &str {
        WS_URL
    }

    fn encode_subscribe(
        &self,
        kind: StreamKind,
        symbols: &[String],
    ) -> Result<String, DecodeError> {
        let pairs = symbols
            .iter()
            .map(|sym| self.symbols.to_ws(Venue::Kraken, sym))
            .collect::<Result<Vec<String>, _>>()?;

        let name = match kind {
            StreamKind::Book => "book",
            StreamKind::Trades => "trade",
        };

        Ok(serde_json::json!({
            "event": "subscribe",
            "pair": pairs,
            "subscription": {"name": name},
        })
        .to_string())
    }

    fn classify(&self, frame: &str) -> FrameClass {
        let value: Value = match serde_json::from_str(frame) {
            Ok(v) => v,
            Err(_) => return FrameClass::Other,
        };

        if value.is_object() {
            return if value.get("event").and_then(Value::as_str) == Some("heartbeat") {
                FrameClass::Heartbeat
            } else {
                FrameClass::Other
            };
        }

        let arr = match value.as_array() {
            Some(a) if a.len() >= 2 => a,
            _ => return FrameClass::Other,
        };

        match arr[arr.len() - 2].as_str() {
            Some(tag) if tag.contains("book") => FrameClass::Book,
            Some(tag) if tag.contains("trade") => FrameClass::Trade,
            _ => FrameClass::Other,
        }
    }

    fn decode_book(&self, frame: &str, clock: &dyn Clock) -> Result<OrderbookEvent, DecodeError> {
        let value: Value = serde_json::from_str(frame)?;
        let arr = value.as_array().ok_or(DecodeError::UnsupportedShape)?;
        let payload = arr.get(1).ok_or(DecodeError::UnsupportedShape)?;
        let ws_symbol = arr
            .last()
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingField("pair"))?;
        let symbol = self.symbols.from_ws(Venue::Kraken, ws_symbol)?;

        let is_snapshot = payload.get("as").is_some() || payload.get("bs").is_some();
        let (akey, bkey, kind) = if is_snapshot {
            ("as", "bs", EventKind::Snapshot)
        } else {
            ("a", "b", EventKind::Update)
        };

        let empty = Vec::new();
        let ask_raw = payload
            .get(akey)
            .and_then(Value::as_array)
            .unwrap_or(&empty);
        let bid_raw = payload
            .get(bkey)
            .and_then(Value::as_array)
            .unwrap_or(&empty);

        let (asks, ask_ts) = parse_levels(ask_raw)?;
        let (bids, bid_ts) = parse_levels(bid_raw)?;

        let ts_seconds = ask_ts
            .iter()
            .chain(bid_ts.iter())
            .cloned()
            .fold(None, |max: Option<f64>, ts| {
                Some(max.map_or(ts, |m| m.max(ts)))
            })
            .ok_or(DecodeError::NoTimestamps)?;

        Ok(OrderbookEvent {
            exch_name: Venue::Kraken,
            symbol,
            kind,
            bids,
            asks,
            ts_exchange_ns: (ts_seconds * 1e9) as i64,
            ts_recorded_ns: clock.now_ns(),
            cursor: None,
        })
    }

    fn decode_trade(&self, frame: &str, clock: &dyn Clock) -> Result<TradeEvent, DecodeError> {
        let value: Value = serde_json::from_str(frame)?;
        let arr = value.as_array().ok_or(DecodeError::UnsupportedShape)?;
        let raw_trades = arr
            .get(1)
            .and_then(Value::as_array)
            .ok_or(DecodeError::UnsupportedShape)?;
        let ws_symbol = arr
            .last()
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingField("pair"))?;
        let symbol = self.symbols.from_ws(Venue::Kraken, ws_symbol)?;

        let mut trades = Vec::with_capacity(raw_trades.len());
        let mut max_ts = f64::MIN;
        for t in raw_trades {
            let t = t.as_array().ok_or(DecodeError::UnsupportedShape)?;
            let price: f64 = t
                .first()
                .and_then(Value::as_str)
                .ok_or(DecodeError::MissingField("price"))?
                .parse()
                .map_err(|_| DecodeError::MissingField("price"))?;
            let qty: f64 = t
                .get(1)
                .and_then(Value::as_str)
                .ok_or(DecodeError::MissingField("qty"))?
                .parse()
                .map_err(|_| DecodeError::MissingField("qty"))?;
            let ts: f64 = t
                .get(2)
                .and_then(Value::as_str)
                .ok_or(DecodeError::MissingField("time"))?
                .parse()
                .map_err(|_| DecodeError::MissingField("time"))?;
            let side = match t.get(3).and_then(Value::as_str) {
                Some("s") => TradeSide::Sell,
                _ => TradeSide::Buy,
            };
            max_ts = max_ts.max(ts);
            trades.push(Trade { price, qty, side });
        }

        Ok(TradeEvent {
            exch_name: Venue::Kraken,
            symbol,
            ts_exchange_ns: (max_ts * 1e9) as i64,
            ts_recorded_ns: clock.now_ns(),
            trades,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    fn symbols() -> Arc<SymbolMap> {
        Arc::new(
            SymbolMap::from_json_str(
                r#"{"btcusdt": {"kraken": {"ws": "XBT/USDT", "rest": "XBTUSDT"}}}"#,
            )
            .unwrap(),
        )
    }

    #[test]
    fn classifies_heartbeat() {
        let codec = KrakenCodec::new(symbols());
        assert_eq!(
            codec.classify(r#"{"event":"heartbeat"}"#),
            FrameClass::Heartbeat
        );
    }

    #[test]
    fn decodes_snapshot_and_update() {
        let codec = KrakenCodec::new(symbols());
        let clock = SystemClock;

        let snapshot = r#"[0, {"bs":[["30000.0","1.0","1700000000.1"]],
            "as":[["30010.0","2.0","1700000000.2"]]}, "book-10", "XBT/USDT"]"#;
        let event = codec.decode_book(snapshot, &clock).unwrap();
        assert_eq!(event.kind, EventKind::Snapshot);
        assert_eq!(event.symbol, "btcusdt");
        assert_eq!(event.bids[0].price, 30000.0);

        let update = r#"[0, {"b":[["30000.0","0","1700000000.3"]]}, "book-10", "XBT/USDT"]"#;
        let event = codec.decode_book(update, &clock).unwrap();
        assert_eq!(event.kind, EventKind::Update);
        assert!(event.bids[0].is_delete());
    }

    #[test]
    fn no_timestamps_is_an_error() {
        let codec = KrakenCodec::new(symbols());
        let clock = SystemClock;
        let frame = r#"[0, {"b":[]}, "book-10", "XBT/USDT"]"#;
        assert!(matches!(
            codec.decode_book(frame, &clock),
            Err(DecodeError::NoTimestamps)
        ));
    }

    #[test]
    fn encode_subscribe_round_trips_as_other() {
        let codec = KrakenCodec::new(symbols());
        let frame = codec
            .encode_subscribe(StreamKind::Book, &["btcusdt".to_owned()])
            .unwrap();
        assert!(frame.contains("subscribe"));
        assert_eq!(codec.classify(&frame), FrameClass::Other);
    }

    #[test]
    fn subscription_status_classifies_as_other() {
        let codec = KrakenCodec::new(symbols());
        let ack = r#"{"channelID":336,"event":"subscriptionStatus","status":"subscribed"}"#;
        assert_eq!(codec.classify(ack), FrameClass::Other);
    }
}
