pub mod error;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tungstenite::Message;

use error::TransportError;

/// A frame handed up from the transport to a codec. Ping/Pong/Close frames
/// are handled internally by the transport and never surfaced here.
#[derive(Debug, Clone)]
pub enum WireFrame {
    Text(String),
}

/// A text-framed duplex connection. Trait seam so `StreamClient` can be
/// driven by a mock transport in tests.
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, frame: String) -> Result<(), TransportError>;
    async fn recv_frame(&mut self) -> Result<WireFrame, TransportError>;
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens a transport to a venue's streaming endpoint.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError>;
}

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub struct WsTransport {
    stream: WsStream,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, frame: String) -> Result<(), TransportError> {
        self.stream.send(Message::Text(frame)).await?;
        Ok(())
    }

    async fn recv_frame(&mut self) -> Result<WireFrame, TransportError> {
        loop {
            let message = self
                .stream
                .next()
                .await
                .ok_or(TransportError::Closed)??;

            match message {
                Message::Text(text) => return Ok(WireFrame::Text(text)),
                Message::Ping(payload) => {
                    self.stream.send(Message::Pong(payload)).await?;
                }
                Message::Pong(_) => {}
                Message::Close(_) => return Err(TransportError::Closed),
                Message::Binary(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl TransportConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url).await?;
        Ok(Box::new(WsTransport { stream }))
    }
}
