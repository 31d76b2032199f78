//! Transfer types shared by the registry, the receive state machine and the application

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use filesender_common::protocol::FailReason;
use filesender_common::validators::FileNameError;

use crate::constants::DEFAULT_WRITE_QUEUE_DEPTH;

// =============================================================================
// Transfer Error
// =============================================================================

/// Why an accepted transfer failed
#[derive(Debug, Clone, Error)]
pub enum TransferError {
    /// The destination could not be written
    #[error("storage error: {0}")]
    Storage(Arc<io::Error>),
    /// The server sent a chunk index outside the announced range
    #[error("chunk {index} out of range (chunk count {chunk_count})")]
    ChunkOutOfRange { index: i64, chunk_count: u64 },
    /// The server sent a chunk that does not fit where its index says it goes
    #[error("chunk {index} has {len} bytes, which does not fit the file layout")]
    ChunkTooLarge { index: i64, len: usize },
    /// The server sent an empty chunk where the file layout expects data
    #[error("chunk {index} is empty")]
    EmptyChunk { index: i64 },
    /// No chunk arrived for longer than the configured stall timeout
    #[error("no data received for {0:?}")]
    Stalled(Duration),
}

/// Why an accepted offer could not be set up
///
/// The host is only told the offer was declined; the cause stays local.
#[derive(Debug, Error)]
pub enum OfferError {
    #[error("handle id {0} is already in use")]
    DuplicateHandle(i32),
    #[error("size {file_size}, chunk size {chunk_size} and chunk count {chunk_count} do not describe one file")]
    InvalidLayout {
        file_size: u64,
        chunk_size: u32,
        chunk_count: u64,
    },
    #[error("unsafe file name: {0:?}")]
    InvalidFileName(FileNameError),
    #[error("download directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),
    #[error("could not create download file: {0}")]
    Storage(#[from] io::Error),
}

impl From<io::Error> for TransferError {
    fn from(err: io::Error) -> Self {
        TransferError::Storage(Arc::new(err))
    }
}

// =============================================================================
// Progress Events
// =============================================================================

/// Snapshot of one transfer's progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProgress {
    /// Handle id from the share request
    pub handle_id: i32,
    /// Catalog id of the file
    pub file_id: i32,
    /// File name as offered by the server
    pub file_name: String,
    /// Where the file ends up once complete
    pub path: PathBuf,
    /// Distinct chunks received so far
    pub received_chunks: u64,
    /// Chunks the server announced
    pub chunk_count: u64,
    /// Bytes accepted for writing so far
    ///
    /// Writes queued behind a `QueuedSink` count before they reach storage.
    pub bytes_received: u64,
    /// Size the server announced
    pub total_bytes: u64,
}

impl TransferProgress {
    /// Completion ratio in `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        if self.chunk_count == 0 {
            return 1.0;
        }
        self.received_chunks as f64 / self.chunk_count as f64
    }
}

/// Lifecycle event for an accepted transfer
///
/// Each transfer produces one `Started`, any number of `Progress` (in chunk
/// arrival order) and then at most one of `Completed` or `Failed`. Transfers
/// abandoned because the connection closed produce no terminal event.
///
/// `Completed` is sent once the destination has been finished, which happens
/// on its own task after the last chunk was delivered.
#[derive(Debug, Clone)]
pub enum TransferEvent {
    Started(TransferProgress),
    Progress(TransferProgress),
    Completed(TransferProgress),
    Failed {
        progress: TransferProgress,
        error: TransferError,
    },
}

impl TransferEvent {
    /// Progress snapshot carried by the event
    pub fn progress(&self) -> &TransferProgress {
        match self {
            TransferEvent::Started(p) | TransferEvent::Progress(p) | TransferEvent::Completed(p) => {
                p
            }
            TransferEvent::Failed { progress, .. } => progress,
        }
    }
}

/// Channel the application receives transfer events on
pub type TransferEvents = mpsc::UnboundedSender<TransferEvent>;

// =============================================================================
// Share Decisions
// =============================================================================

/// Where and how to receive an accepted file
#[derive(Debug, Clone)]
pub struct AcceptedTransfer {
    /// Existing directory the file is written into
    pub directory: PathBuf,
    /// Receiver of this transfer's lifecycle events
    pub events: TransferEvents,
}

/// The application's answer to a file share request
#[derive(Debug, Clone)]
pub enum ShareDecision {
    Accept(AcceptedTransfer),
    Deny(FailReason),
}

impl ShareDecision {
    /// Decline with the default reason
    pub fn deny() -> Self {
        ShareDecision::Deny(FailReason::ClientDenied)
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Tuning for the transfer registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSettings {
    /// Maximum queued writes per transfer before delivery waits for storage
    pub write_queue_depth: usize,
    /// Fail transfers that receive nothing for this long (disabled if `None`)
    pub stall_timeout: Option<Duration>,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            write_queue_depth: DEFAULT_WRITE_QUEUE_DEPTH,
            stall_timeout: None,
        }
    }
}
