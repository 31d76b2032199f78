//! FileSender client library
//!
//! The protocol core ([`client::Client`]) is transport-agnostic; the
//! [`network`] module drives it over a WebSocket.

pub mod app;
pub mod args;
pub mod catalog;
pub mod client;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod network;
pub mod session;
pub mod transfers;
pub mod transport;

pub use catalog::{Catalog, FileList};
pub use client::{Client, ClientHandler, ClientSettings};
pub use error::ClientError;
pub use session::{Session, SessionPhase};
pub use transport::{Transport, TransportError};
