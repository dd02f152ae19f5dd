use crate::codec::error::DecodeError;
use crate::resync::error::ResyncOverflow;
use crate::transport::error::TransportError;

#[derive(thiserror::Error, Debug)]
pub enum StreamClientError {
    #[error("transport error")]
    Transport(#[from] TransportError),
    #[error("decode error")]
    Decode(#[from] DecodeError),
    #[error("resync buffer overflow")]
    ResyncOverflow(#[from] ResyncOverflow),
    #[error("client is not connected")]
    NotConnected,
    #[error("client is closed")]
    Closed,
}
