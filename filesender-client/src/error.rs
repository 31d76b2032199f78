//! Errors reported to the application

use thiserror::Error;

use filesender_common::framing::FrameError;
use filesender_common::io::ProtocolError;

use crate::transport::TransportError;

/// Connection-level failures
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport reported an error; the session is over
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A binary frame could not be decoded, so the stream is corrupt and the
    /// connection is closed
    #[error("corrupt binary stream: {0}")]
    CorruptFrame(#[from] FrameError),
    /// An outbound message could not be encoded
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
