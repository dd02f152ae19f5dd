//! Mock collaborators for exercising `StreamClient`, the resync algorithm,
//! and the multiplexer without a live exchange connection.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::http::error::FetchError;
use crate::http::HttpFetcher;
use crate::transport::error::TransportError;
use crate::transport::{Transport, TransportConnector, WireFrame};

/// A clock whose value is set explicitly, so codec/resync behavior is
/// deterministic under test.
pub struct MockClock {
    now_ns: AtomicI64,
}

impl MockClock {
    pub fn new(now_ns: i64) -> Self {
        Self {
            now_ns: AtomicI64::new(now_ns),
        }
    }

    pub fn set(&self, now_ns: i64) {
        self.now_ns.store(now_ns, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ns: i64) {
        self.now_ns.fetch_add(delta_ns, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_ns(&self) -> i64 {
        self.now_ns.load(Ordering::SeqCst)
    }
}

/// A transport backed by a fixed queue of outgoing text frames. Frames sent
/// through it are captured for assertions. Each queued frame may carry an
/// artificial delay, useful for racing it deterministically against a
/// snapshot-fetch task in tests.
pub struct MockTransport {
    outgoing: VecDeque<(Duration, String)>,
    pub sent: Vec<String>,
    closed: bool,
}

impl MockTransport {
    pub fn new(frames: impl IntoIterator<Item = String>) -> Self {
        Self::with_delays(frames.into_iter().map(|f| (Duration::ZERO, f)))
    }

    pub fn with_delays(frames: impl IntoIterator<Item = (Duration, String)>) -> Self {
        Self {
            outgoing: frames.into_iter().collect(),
            sent: Vec::new(),
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(&mut self, frame: String) -> Result<(), TransportError> {
        self.sent.push(frame);
        Ok(())
    }

    async fn recv_frame(&mut self) -> Result<WireFrame, TransportError> {
        match self.outgoing.pop_front() {
            Some((delay, text)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(WireFrame::Text(text))
            }
            None if self.closed => Err(TransportError::Closed),
            None => {
                // Block "forever" (until aborted) rather than busy-loop: a
                // real socket with no data would suspend the same way.
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        Ok(())
    }
}

/// Hands out a fixed, pre-built `MockTransport` to whoever connects first.
pub struct MockConnector {
    transport: Mutex<Option<MockTransport>>,
}

impl MockConnector {
    pub fn new(transport: MockTransport) -> Self {
        Self {
            transport: Mutex::new(Some(transport)),
        }
    }
}

#[async_trait]
impl TransportConnector for MockConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn Transport>, TransportError> {
        let transport = self
            .transport
            .lock()
            .await
            .take()
            .expect("MockConnector::connect called more than once");
        Ok(Box::new(transport))
    }
}

/// Returns a fixed JSON body (or error) regardless of the request, for
/// exercising snapshot-fetch paths.
pub struct MockHttpFetcher {
    response: Result<String, String>,
}

impl MockHttpFetcher {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            response: Ok(body.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
        }
    }
}

#[async_trait]
impl HttpFetcher for MockHttpFetcher {
    async fn get_json(&self, _url: &str, _query: &[(&str, &str)]) -> Result<String, FetchError> {
        match &self.response {
            Ok(body) => Ok(body.clone()),
            Err(message) => Err(FetchError::NonSuccess {
                status: 500,
                body: message.clone(),
            }),
        }
    }
}

pub fn arc_clock(now_ns: i64) -> Arc<MockClock> {
    Arc::new(MockClock::new(now_ns))
}
