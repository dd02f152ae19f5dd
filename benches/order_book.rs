use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use obsync::event::{EventKind, Level, OrderbookEvent, Venue};
use obsync::order_book::OrderBook;
use rand::Rng;

fn random_level(rng: &mut impl Rng) -> Level {
    Level::new(rng.gen_range(80.0..600.0), rng.gen_range(40.0..10_000.0))
}

fn random_delete(rng: &mut impl Rng) -> Level {
    Level::new(rng.gen_range(80.0..600.0), 0.0)
}

fn update_event(bids: Vec<Level>, asks: Vec<Level>) -> OrderbookEvent {
    OrderbookEvent {
        exch_name: Venue::Kraken,
        symbol: "btcusdt".into(),
        kind: EventKind::Update,
        bids,
        asks,
        ts_exchange_ns: 0,
        ts_recorded_ns: 0,
        cursor: None,
    }
}

fn initialize_order_book() -> OrderBook {
    let mut book = OrderBook::new(Venue::Kraken, "btcusdt", 25);
    let mut rng = rand::thread_rng();

    let bids = (0..20).map(|_| random_level(&mut rng)).collect();
    let asks = (0..20).map(|_| random_level(&mut rng)).collect();
    let snapshot = OrderbookEvent {
        kind: EventKind::Snapshot,
        ..update_event(bids, asks)
    };
    book.apply(&snapshot);
    book
}

fn bench_insert_bid(c: &mut Criterion) {
    let mut book = initialize_order_book();
    let mut rng = rand::thread_rng();

    c.bench_function("insert bid", |b| {
        b.iter_batched_ref(
            || random_level(&mut rng),
            |level| book.apply(black_box(&update_event(vec![*level], vec![]))),
            BatchSize::SmallInput,
        )
    });
}

fn bench_remove_bid(c: &mut Criterion) {
    let mut rng = rand::thread_rng();

    c.bench_function("remove bid", |b| {
        b.iter_batched(
            || (initialize_order_book(), random_delete(&mut rng)),
            |(mut book, level)| book.apply(black_box(&update_event(vec![level], vec![]))),
            BatchSize::SmallInput,
        )
    });
}

fn bench_update_bid(c: &mut Criterion) {
    let mut rng = rand::thread_rng();

    c.bench_function("update bid", |b| {
        b.iter_batched(
            || (initialize_order_book(), random_level(&mut rng)),
            |(mut book, level)| book.apply(black_box(&update_event(vec![level], vec![]))),
            BatchSize::SmallInput,
        )
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let book = initialize_order_book();

    c.bench_function("snapshot", |b| {
        b.iter(|| black_box(book.snapshot(None)))
    });
}

criterion_group!(
    benches,
    bench_insert_bid,
    bench_remove_bid,
    bench_update_bid,
    bench_snapshot
);
criterion_main!(benches);
