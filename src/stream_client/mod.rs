pub mod error;
pub mod testing;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::codec::{FrameClass, StreamKind, WireCodec};
use crate::event::Event;
use crate::http::HttpFetcher;
use crate::resync::ResyncBuffer;
use crate::transport::TransportConnector;

use error::StreamClientError;

const MAX_SNAPSHOT_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Connecting,
    Subscribed,
    Streaming,
    Closing,
    Faulted,
}

#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    pub symbol: String,
    pub kind: StreamKind,
    pub queue_capacity: usize,
    pub recv_timeout: Duration,
    pub resync_buffer_size: usize,
    pub book_depth: usize,
    pub snapshot_delay: Duration,
}

impl StreamClientConfig {
    pub fn new(symbol: impl Into<String>, kind: StreamKind) -> Self {
        Self {
            symbol: symbol.into(),
            kind,
            queue_capacity: 1_000,
            recv_timeout: Duration::from_secs(10),
            resync_buffer_size: 100,
            book_depth: 10,
            snapshot_delay: Duration::from_secs(1),
        }
    }
}

/// Resources shared by the receive loop and the (re-armable) snapshot-fetch
/// task, bundled so both can be cloned cheaply into spawned tasks.
struct ResyncContext<C> {
    codec: Arc<C>,
    http: Arc<dyn HttpFetcher>,
    clock: Arc<dyn Clock>,
    symbol: String,
    depth: usize,
    delay: Duration,
}

// Not `#[derive(Clone)]`: the derive would add a `C: Clone` bound even
// though only `Arc<C>` is stored, which no codec implements.
impl<C> Clone for ResyncContext<C> {
    fn clone(&self) -> Self {
        Self {
            codec: Arc::clone(&self.codec),
            http: Arc::clone(&self.http),
            clock: Arc::clone(&self.clock),
            symbol: self.symbol.clone(),
            depth: self.depth,
            delay: self.delay,
        }
    }
}

fn spawn_snapshot_fetch<C: WireCodec + 'static>(
    ctx: ResyncContext<C>,
    resync: Arc<Mutex<ResyncBuffer>>,
    tx: mpsc::Sender<Event>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        for attempt in 1..=MAX_SNAPSHOT_ATTEMPTS {
            tokio::time::sleep(ctx.delay).await;

            let snapshot = match ctx
                .codec
                .fetch_snapshot(ctx.http.as_ref(), &ctx.symbol, ctx.depth, ctx.clock.as_ref())
                .await
            {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::error!(error = %e, attempt, "snapshot fetch failed");
                    continue;
                }
            };

            let mut buf = resync.lock().await;
            match buf.apply_snapshot(snapshot) {
                Ok(events) => {
                    drop(buf);
                    for event in events {
                        if tx.send(Event::Book(event)).await.is_err() {
                            return;
                        }
                    }
                    return;
                }
                Err(gap) => {
                    drop(buf);
                    tracing::warn!(%gap, attempt, "gap while applying snapshot, retrying");
                }
            }
        }
        tracing::error!("giving up on snapshot resync after max attempts");
    })
}

/// Manages one venue connection: connect, subscribe, receive, lifecycle.
/// Generic over its wire codec so the state machine and resync integration
/// are shared code across venues.
pub struct StreamClient<C: WireCodec + 'static> {
    codec: Arc<C>,
    connector: Arc<dyn TransportConnector>,
    http: Arc<dyn HttpFetcher>,
    clock: Arc<dyn Clock>,
    config: StreamClientConfig,
    state: Arc<Mutex<ClientState>>,
    rx: Option<mpsc::Receiver<Event>>,
    receive_task: Option<JoinHandle<Result<(), StreamClientError>>>,
    snapshot_task: Option<JoinHandle<()>>,
}

impl<C: WireCodec + 'static> StreamClient<C> {
    pub fn new(
        codec: Arc<C>,
        connector: Arc<dyn TransportConnector>,
        http: Arc<dyn HttpFetcher>,
        clock: Arc<dyn Clock>,
        config: StreamClientConfig,
    ) -> Self {
        Self {
            codec,
            connector,
            http,
            clock,
            config,
            state: Arc::new(Mutex::new(ClientState::Idle)),
            rx: None,
            receive_task: None,
            snapshot_task: None,
        }
    }

    pub async fn state(&self) -> ClientState {
        *self.state.lock().await
    }

    pub async fn connect(&mut self) -> Result<(), StreamClientError> {
        {
            let mut state = self.state.lock().await;
            if matches!(
                *state,
                ClientState::Connecting | ClientState::Subscribed | ClientState::Streaming
            ) {
                return Ok(());
            }
            *state = ClientState::Connecting;
        }

        let mut transport = self.connector.connect(self.codec.ws_url()).await?;
        let subscribe_frame = self
            .codec
            .encode_subscribe(self.config.kind, std::slice::from_ref(&self.config.symbol))?;
        transport.send_text(subscribe_frame).await?;

        {
            let mut state = self.state.lock().await;
            *state = ClientState::Subscribed;
        }

        let (tx, rx) = mpsc::channel(self.config.queue_capacity);
        self.rx = Some(rx);

        let resync = if self.codec.requires_resync() {
            Some(Arc::new(Mutex::new(ResyncBuffer::new(
                self.config.resync_buffer_size,
            ))))
        } else {
            None
        };

        let resync_ctx = ResyncContext {
            codec: Arc::clone(&self.codec),
            http: Arc::clone(&self.http),
            clock: Arc::clone(&self.clock),
            symbol: self.config.symbol.clone(),
            depth: self.config.book_depth,
            delay: self.config.snapshot_delay,
        };

        if let Some(resync) = &resync {
            self.snapshot_task = Some(spawn_snapshot_fetch(
                resync_ctx.clone(),
                Arc::clone(resync),
                tx.clone(),
            ));
        }

        let state = Arc::clone(&self.state);
        let codec = Arc::clone(&self.codec);
        let clock = Arc::clone(&self.clock);
        let recv_timeout = self.config.recv_timeout;

        self.receive_task = Some(tokio::spawn(async move {
            let mut streaming_announced = false;
            loop {
                let frame = match tokio::time::timeout(recv_timeout, transport.recv_frame()).await
                {
                    Ok(Ok(frame)) => frame,
                    Ok(Err(e)) => {
                        *state.lock().await = ClientState::Faulted;
                        return Err(e.into());
                    }
                    Err(_elapsed) => {
                        tracing::debug!("timeout waiting for frame, retrying");
                        continue;
                    }
                };

                if !streaming_announced {
                    *state.lock().await = ClientState::Streaming;
                    streaming_announced = true;
                }

                let crate::transport::WireFrame::Text(text) = frame;

                match codec.classify(&text) {
                    FrameClass::Heartbeat | FrameClass::Other => continue,
                    FrameClass::Trade => match codec.decode_trade(&text, clock.as_ref()) {
                        Ok(trade) => {
                            if tx.send(Event::Trade(trade)).await.is_err() {
                                return Ok(());
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "dropping unparseable trade frame"),
                    },
                    FrameClass::Book => match codec.decode_book(&text, clock.as_ref()) {
                        Ok(book_event) => match &resync {
                            None => {
                                if tx.send(Event::Book(book_event)).await.is_err() {
                                    return Ok(());
                                }
                            }
                            Some(resync) => {
                                let mut buf = resync.lock().await;
                                if !buf.is_synchronized() {
                                    if let Err(overflow) = buf.buffer_delta(book_event) {
                                        drop(buf);
                                        *state.lock().await = ClientState::Faulted;
                                        return Err(overflow.into());
                                    }
                                } else {
                                    match buf.apply_delta(book_event) {
                                        Ok(event) => {
                                            drop(buf);
                                            if tx.send(Event::Book(event)).await.is_err() {
                                                return Ok(());
                                            }
                                        }
                                        Err(gap) => {
                                            drop(buf);
                                            tracing::warn!(%gap, "resync gap, re-arming snapshot fetch");
                                            spawn_snapshot_fetch(
                                                resync_ctx.clone(),
                                                Arc::clone(resync),
                                                tx.clone(),
                                            );
                                        }
                                    }
                                }
                            }
                        },
                        Err(e) => tracing::warn!(error = %e, "dropping unparseable book frame"),
                    },
                }
            }
        }));

        Ok(())
    }

    /// Returns the next resynchronized event, retrying internally on
    /// per-recv timeout until data is available or the client closes.
    pub async fn recv(&mut self) -> Result<Event, StreamClientError> {
        let rx = self.rx.as_mut().ok_or(StreamClientError::NotConnected)?;
        match rx.recv().await {
            Some(event) => Ok(event),
            None => {
                if let Some(handle) = self.receive_task.take() {
                    if let Ok(Err(e)) = handle.await {
                        return Err(e);
                    }
                }
                Err(StreamClientError::Closed)
            }
        }
    }

    pub async fn close(&mut self) {
        *self.state.lock().await = ClientState::Closing;
        if let Some(handle) = self.receive_task.take() {
            handle.abort();
        }
        if let Some(handle) = self.snapshot_task.take() {
            handle.abort();
        }
        self.rx = None;
        *self.state.lock().await = ClientState::Idle;
    }
}

/// Type-erased view of a `StreamClient` so a multiplexer can hold clients
/// parameterized over different codecs in one collection.
#[async_trait]
pub trait EventSource: Send {
    async fn recv(&mut self) -> Result<Event, StreamClientError>;
    async fn close(&mut self);
}

#[async_trait]
impl<C: WireCodec + 'static> EventSource for StreamClient<C> {
    async fn recv(&mut self) -> Result<Event, StreamClientError> {
        StreamClient::recv(self).await
    }

    async fn close(&mut self) {
        StreamClient::close(self).await
    }
}

/// Exponential backoff with jitter for recreating a `Faulted` client. Not
/// used internally by `StreamClient` itself — callers that recreate faulted
/// clients are expected to wait between attempts using this.
pub mod backoff {
    use std::time::Duration;

    pub fn next_delay(attempt: u32, base: Duration, max: Duration, jitter: Duration) -> Duration {
        let exp = base.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
        let capped = exp.min(max);
        capped.saturating_add(jitter)
    }
}
