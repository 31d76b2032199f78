//! Outbound side of the connection
//!
//! The client core never touches sockets. It is handed something that can
//! send text and binary messages and close the connection; inbound traffic is
//! pushed into the client through its `on_*` callbacks.

use thiserror::Error;

/// Errors reported by a transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection is already closed
    #[error("connection closed")]
    Closed,
    /// Connecting did not complete in time
    #[error("connection timed out")]
    Timeout,
    /// The WebSocket layer failed
    #[error("websocket error: {0}")]
    WebSocket(String),
}

/// Sending half of a message-oriented connection
pub trait Transport {
    /// Send a text message
    ///
    /// # Errors
    ///
    /// Returns an error if the connection can no longer send.
    fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Send a binary message
    ///
    /// # Errors
    ///
    /// Returns an error if the connection can no longer send.
    fn send_binary(&mut self, bytes: Vec<u8>) -> Result<(), TransportError>;

    /// Close the connection
    ///
    /// Closing an already closed transport does nothing.
    fn close(&mut self);

    /// Returns true once `close` has been called on this side
    fn is_closed(&self) -> bool;
}
