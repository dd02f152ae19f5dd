use std::sync::Arc;
use std::time::Duration;

use obsync::codec::binance::BinanceCodec;
use obsync::codec::kraken::KrakenCodec;
use obsync::codec::StreamKind;
use obsync::event::{Event, Venue};
use obsync::multiplexer::{Subscription, TaggedEvent};
use obsync::order_book::OrderBook;
use obsync::stream_client::testing::{MockClock, MockConnector, MockHttpFetcher, MockTransport};
use obsync::stream_client::{EventSource, StreamClient, StreamClientConfig};
use obsync::symbol_map::SymbolMap;
use obsync::StreamMultiplexer;

const SYMBOLS: &str = include_str!("fixtures/symbols.json");

fn symbol_map() -> Arc<SymbolMap> {
    Arc::new(SymbolMap::from_json_str(SYMBOLS).unwrap())
}

/// Kraken sends a snapshot frame, then an update that deletes the only
/// resting bid: the client should apply both directly (no resync needed).
#[tokio::test]
async fn kraken_snapshot_then_update_applies_directly() {
    let snapshot = r#"[0, {"bs":[["30000.0","1.0","1700000000.1"]],
        "as":[["30010.0","2.0","1700000000.2"]]}, "book-10", "XBT/USDT"]"#
        .to_owned();
    let update = r#"[0, {"b":[["30000.0","0","1700000000.3"]]}, "book-10", "XBT/USDT"]"#.to_owned();

    let transport = MockTransport::new([snapshot, update]);
    let connector = Arc::new(MockConnector::new(transport));
    let http = Arc::new(MockHttpFetcher::err("kraken never fetches a snapshot"));
    let clock = Arc::new(MockClock::new(0));
    let codec = Arc::new(KrakenCodec::new(symbol_map()));

    let mut config = StreamClientConfig::new("btcusdt", StreamKind::Book);
    config.recv_timeout = Duration::from_millis(200);

    let mut client = StreamClient::new(codec, connector, http, clock, config);
    client.connect().await.unwrap();

    let mut book = OrderBook::new(obsync::event::Venue::Kraken, "btcusdt", 10);

    let Event::Book(event) = client.recv().await.unwrap() else {
        panic!("expected a book event");
    };
    book.apply(&event);

    let Event::Book(event) = client.recv().await.unwrap() else {
        panic!("expected a book event");
    };
    book.apply(&event);

    let snap = book.snapshot(None);
    assert!(snap.bids.is_empty());
    assert_eq!(snap.asks.len(), 1);
    assert_eq!(snap.asks[0].price, 30010.0);

    client.close().await;
}

fn binance_delta(fid: u64, lid: u64) -> String {
    format!(
        r#"{{"e":"depthUpdate","E":1000,"s":"BTCUSDT","U":{fid},"u":{lid},"b":[],"a":[]}}"#
    )
}

/// Buffered deltas arriving before the snapshot must be reconciled using
/// the first-event-validity rule, discarding anything that predates the
/// snapshot's `lastUpdateId`.
#[tokio::test]
async fn binance_first_delta_validity_discards_stale_prefix() {
    let frames = [
        binance_delta(95, 99),
        binance_delta(98, 101),
        binance_delta(102, 105),
    ];
    let transport = MockTransport::new(frames);
    let connector = Arc::new(MockConnector::new(transport));
    let http = Arc::new(MockHttpFetcher::ok(
        r#"{"lastUpdateId":100,"bids":[],"asks":[]}"#,
    ));
    let clock = Arc::new(MockClock::new(0));
    let codec = Arc::new(BinanceCodec::new(symbol_map()));

    let mut config = StreamClientConfig::new("btcusdt", StreamKind::Book);
    config.recv_timeout = Duration::from_millis(200);
    config.snapshot_delay = Duration::from_millis(10);

    let mut client = StreamClient::new(codec, connector, http, clock, config);
    client.connect().await.unwrap();

    // snapshot (lastUpdateId 100), then (98,101), then (102,105) -- (95,99) is discarded
    let mut cursors = Vec::new();
    for _ in 0..3 {
        let Event::Book(event) = client.recv().await.unwrap() else {
            panic!("expected a book event");
        };
        cursors.push(event.cursor);
    }

    assert_eq!(cursors[0].unwrap().last_update_id, 100);
    assert_eq!(cursors[1].unwrap().last_update_id, 101);
    assert_eq!(cursors[2].unwrap().last_update_id, 105);

    client.close().await;
}

/// A gap in the post-sync delta sequence must never be silently applied:
/// the client re-arms a fresh snapshot fetch rather than emitting across it.
#[tokio::test]
async fn binance_gap_after_sync_triggers_resnapshot() {
    // Both deltas are delayed well past the snapshot fetch, so the first
    // snapshot is already applied (and the buffer marked synchronized)
    // before either delta arrives -- this exercises the steady-state
    // `apply_delta` gap path rather than the pre-snapshot buffering path.
    let frames = [
        (Duration::from_millis(40), binance_delta(101, 101)), // contiguous with lastUpdateId 100
        (Duration::from_millis(10), binance_delta(150, 160)), // gap
    ];
    let transport = MockTransport::with_delays(frames);
    let connector = Arc::new(MockConnector::new(transport));
    let http = Arc::new(MockHttpFetcher::ok(
        r#"{"lastUpdateId":100,"bids":[],"asks":[]}"#,
    ));
    let clock = Arc::new(MockClock::new(0));
    let codec = Arc::new(BinanceCodec::new(symbol_map()));

    let mut config = StreamClientConfig::new("btcusdt", StreamKind::Book);
    config.recv_timeout = Duration::from_millis(500);
    config.snapshot_delay = Duration::from_millis(1);

    let mut client = StreamClient::new(codec, connector, http, clock, config);
    client.connect().await.unwrap();

    // snapshot, then the one contiguous delta
    for expected_last_update_id in [100, 101] {
        let Event::Book(event) = client.recv().await.unwrap() else {
            panic!("expected a book event");
        };
        assert_eq!(event.cursor.unwrap().last_update_id, expected_last_update_id);
    }

    // the gapped delta is never emitted directly; the client re-arms a
    // snapshot fetch instead, which (with the same mock REST response)
    // eventually re-emits a snapshot with lastUpdateId 100 again.
    let Event::Book(event) = client.recv().await.unwrap() else {
        panic!("expected a book event");
    };
    assert_eq!(event.kind, obsync::event::EventKind::Snapshot);

    client.close().await;
}

fn kraken_snapshot(pair: &str) -> String {
    format!(
        r#"[0, {{"bs":[["30000.0","1.0","1700000000.1"]],
        "as":[["30010.0","2.0","1700000000.2"]]}}, "book-10", "{pair}"]"#
    )
}

async fn kraken_client(symbol: &str, pair: &str) -> StreamClient<KrakenCodec> {
    let transport = MockTransport::new([kraken_snapshot(pair)]);
    let connector = Arc::new(MockConnector::new(transport));
    let http = Arc::new(MockHttpFetcher::err("kraken never fetches a snapshot"));
    let clock = Arc::new(MockClock::new(0));
    let codec = Arc::new(KrakenCodec::new(symbol_map()));

    let mut config = StreamClientConfig::new(symbol, StreamKind::Book);
    config.recv_timeout = Duration::from_millis(200);

    let mut client = StreamClient::new(codec, connector, http, clock, config);
    client.connect().await.unwrap();
    client
}

/// Two mock clients feeding one multiplexer: both subscription tags must
/// show up on the shared queue, and `close()` must terminate both forwarders
/// rather than hang.
#[tokio::test]
async fn multiplexer_fans_in_both_clients_and_closes_cleanly() {
    let btc_client = kraken_client("btcusdt", "XBT/USDT").await;
    let eth_client = kraken_client("ethusdt", "ETH/USDT").await;

    let btc_subscription = Subscription {
        venue: Venue::Kraken,
        symbol: "btcusdt".into(),
        stream_name: "book",
    };
    let eth_subscription = Subscription {
        venue: Venue::Kraken,
        symbol: "ethusdt".into(),
        stream_name: "book",
    };

    let clients: Vec<(Subscription, Box<dyn EventSource>)> = vec![
        (btc_subscription.clone(), Box::new(btc_client)),
        (eth_subscription.clone(), Box::new(eth_client)),
    ];

    let mut multiplexer = StreamMultiplexer::spawn(clients, 16);

    let mut seen_symbols = Vec::new();
    for _ in 0..2 {
        let TaggedEvent { subscription, event } = multiplexer.recv().await.unwrap();
        assert!(matches!(event, Event::Book(_)));
        seen_symbols.push(subscription.symbol);
    }
    seen_symbols.sort();
    assert_eq!(seen_symbols, vec!["btcusdt".to_owned(), "ethusdt".to_owned()]);

    multiplexer.close().await;
}
