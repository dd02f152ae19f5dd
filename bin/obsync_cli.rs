use std::sync::Arc;

use clap::Parser;
use futures::FutureExt;
use obsync::codec::binance::BinanceCodec;
use obsync::codec::kraken::KrakenCodec;
use obsync::codec::StreamKind;
use obsync::event::{Event, Venue};
use obsync::http::ReqwestFetcher;
use obsync::multiplexer::{Subscription, TaggedEvent};
use obsync::order_book::{OrderBook, SharedOrderBook};
use obsync::stream_client::{StreamClient, StreamClientConfig};
use obsync::symbol_map::SymbolMap;
use obsync::transport::WsConnector;
use obsync::StreamMultiplexer;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::Format;

#[derive(Parser, Debug)]
#[clap(name = "obsync")]
struct Opts {
    /// Path to the symbol mapping file.
    #[clap(long, default_value = "symbols.json")]
    symbols: String,

    /// Canonical symbols to subscribe to, comma-separated, e.g. btcusdt,ethusdt
    #[clap(long, short, default_value = "btcusdt")]
    symbol: String,

    /// Venues to connect to, comma-separated: binance,kraken
    #[clap(long, default_value = "binance,kraken")]
    venues: String,

    /// Max depth of each maintained order book
    #[clap(long, default_value = "10")]
    depth: usize,

    /// Channel buffer size for the multiplexed event queue
    #[clap(long, default_value = "1000")]
    queue_buffer: usize,

    /// Level of logging, options are trace, debug, info, warn, error
    #[clap(long, default_value = "info")]
    level: tracing::metadata::LevelFilter,

    /// Path to output file for logging
    #[clap(long, default_value = "obsync.log")]
    log_file_path: String,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let opts = Opts::parse();
    let _tracing_guard = initialize_tracing(&opts.log_file_path, opts.level)?;

    let symbol_map = Arc::new(SymbolMap::load(&opts.symbols)?);
    let venues: Vec<Venue> = opts
        .venues
        .split(',')
        .map(|v| match v.trim() {
            "binance" => Ok(Venue::Binance),
            "kraken" => Ok(Venue::Kraken),
            other => eyre::bail!("unknown venue {other}"),
        })
        .collect::<eyre::Result<Vec<Venue>>>()?;

    let mut clients: Vec<(Subscription, Box<dyn obsync::stream_client::EventSource>)> = Vec::new();

    for venue in venues {
        let config = StreamClientConfig::new(opts.symbol.clone(), StreamKind::Book);
        let connector = Arc::new(WsConnector);
        let http = Arc::new(ReqwestFetcher::new());
        let clock = Arc::new(obsync::clock::SystemClock);

        let subscription = Subscription {
            venue,
            symbol: opts.symbol.clone(),
            stream_name: "book",
        };

        match venue {
            Venue::Binance => {
                let codec = Arc::new(BinanceCodec::new(Arc::clone(&symbol_map)));
                let mut client = StreamClient::new(codec, connector, http, clock, config);
                client.connect().await?;
                clients.push((subscription, Box::new(client)));
            }
            Venue::Kraken => {
                let codec = Arc::new(KrakenCodec::new(Arc::clone(&symbol_map)));
                let mut client = StreamClient::new(codec, connector, http, clock, config);
                client.connect().await?;
                clients.push((subscription, Box::new(client)));
            }
        }
    }

    tracing::info!("spawning stream multiplexer");
    let mut multiplexer = StreamMultiplexer::spawn(clients, opts.queue_buffer);

    let books = std::collections::HashMap::<Venue, SharedOrderBook>::from_iter(
        [Venue::Binance, Venue::Kraken]
            .into_iter()
            .map(|v| (v, SharedOrderBook::new(OrderBook::new(v, opts.symbol.clone(), opts.depth)))),
    );

    let drain = async move {
        while let Some(TaggedEvent { subscription, event }) = multiplexer.recv().await {
            if let Event::Book(book_event) = event {
                if let Some(book) = books.get(&subscription.venue) {
                    book.apply(&book_event).await?;
                    let top = book.snapshot(Some(1)).await?;
                    if let (Some(bid), Some(ask)) = (top.bids.first(), top.asks.first()) {
                        tracing::info!(
                            venue = %subscription.venue,
                            bid_price = bid.price,
                            ask_price = ask.price,
                            "top of book"
                        );
                    }
                }
            }
        }
        Ok::<(), obsync::ObSyncError>(())
    };

    drain.boxed().await?;
    eyre::bail!("event stream ended unexpectedly")
}

fn initialize_tracing(
    file_path: &str,
    level: tracing::metadata::LevelFilter,
) -> eyre::Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::never("log", file_path);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let format = Format::default()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_level(true)
        .compact();

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_max_level(level)
        .event_format(format)
        .with_writer(non_blocking)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(guard)
}
