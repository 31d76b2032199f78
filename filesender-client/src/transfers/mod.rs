//! Receiving files the host shares
//!
//! A share request the application accepts becomes a [`ReceiveState`] in the
//! [`TransferRegistry`], keyed by the handle id its chunk frames carry. Chunks
//! are written through a [`ChunkSink`]; for downloads to disk that is a
//! [`FileSink`] behind a [`QueuedSink`] so storage runs off the delivery loop.

mod file_utils;
mod receive;
mod registry;
mod sink;
mod types;

pub use file_utils::{generate_unique_path, resolve_destination};
pub use receive::{ReceivePhase, ReceiveState};
pub use registry::TransferRegistry;
pub use sink::{ChunkSink, FileSink, MemorySink, QueuedSink, part_path_for};
pub use types::{
    AcceptedTransfer, OfferError, ShareDecision, TransferError, TransferEvent, TransferEvents,
    TransferProgress, TransferSettings,
};
