//! Network module types

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::transport::{Transport, TransportError};

/// WebSocket stream to the host
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Message queued for the writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

/// Request from the application to the delivery loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// Ask the host for its file list
    RequestFileList,
    /// Ask the host to send a file
    Download(i32),
    /// Close the connection
    Close,
}

/// Sending half of the command channel
pub type CommandSender = mpsc::UnboundedSender<ClientCommand>;

/// Receiving half of the command channel
pub type CommandReceiver = mpsc::UnboundedReceiver<ClientCommand>;

/// [`Transport`] that queues messages for the writer task
#[derive(Debug)]
pub struct ConnectionHandle {
    tx: mpsc::UnboundedSender<Outgoing>,
    closed: bool,
}

impl ConnectionHandle {
    pub fn new(tx: mpsc::UnboundedSender<Outgoing>) -> Self {
        Self { tx, closed: false }
    }

    fn queue(&mut self, message: Outgoing) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.tx.send(message).map_err(|_| TransportError::Closed)
    }
}

impl Transport for ConnectionHandle {
    fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.queue(Outgoing::Text(text))
    }

    fn send_binary(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
        self.queue(Outgoing::Binary(bytes))
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        // The writer may already be gone, in which case there is nothing to close
        let _ = self.tx.send(Outgoing::Close);
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
