use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::event::{Event, Venue};
use crate::stream_client::error::StreamClientError;
use crate::stream_client::EventSource;

/// Identifies one child stream within a multiplexer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub venue: Venue,
    pub symbol: String,
    pub stream_name: &'static str,
}

#[derive(Debug, Clone)]
pub struct TaggedEvent {
    pub subscription: Subscription,
    pub event: Event,
}

/// Fans in several `StreamClient`s (type-erased as `EventSource`s) into one
/// shared bounded queue. `tokio::sync::mpsc` preserves arrival order across
/// senders, so no extra scheduling is needed for fairness.
pub struct StreamMultiplexer {
    rx: mpsc::Receiver<TaggedEvent>,
    forwarders: Vec<JoinHandle<()>>,
}

impl StreamMultiplexer {
    /// Spawns one forwarding task per client, each pushing tagged events
    /// into a single shared bounded channel.
    pub fn spawn(
        clients: Vec<(Subscription, Box<dyn EventSource>)>,
        queue_capacity: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let mut forwarders = Vec::with_capacity(clients.len());

        for (subscription, mut client) in clients {
            let tx = tx.clone();
            forwarders.push(tokio::spawn(async move {
                loop {
                    match client.recv().await {
                        Ok(event) => {
                            let tagged = TaggedEvent {
                                subscription: subscription.clone(),
                                event,
                            };
                            if tx.send(tagged).await.is_err() {
                                break;
                            }
                        }
                        Err(StreamClientError::Closed) => break,
                        Err(e) => {
                            tracing::error!(
                                venue = %subscription.venue,
                                symbol = %subscription.symbol,
                                error = %e,
                                "stream client faulted, stopping forwarder"
                            );
                            break;
                        }
                    }
                }
                client.close().await;
            }));
        }

        Self { rx, forwarders }
    }

    pub async fn recv(&mut self) -> Option<TaggedEvent> {
        self.rx.recv().await
    }

    /// Aborts every child forwarding task (and its owned client) and joins.
    pub async fn close(mut self) {
        for handle in &self.forwarders {
            handle.abort();
        }
        for handle in self.forwarders {
            let _ = handle.await;
        }
    }
}
