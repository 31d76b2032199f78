//! Receive state machine for one accepted transfer
//!
//! Chunks may arrive in any order and more than once. Each index is written at
//! `index * chunk_size` the first time it arrives and ignored afterwards, so
//! assembly does not depend on arrival order and duplicates never double-count.
//!
//! Once the last chunk is in, the sink is finished on a task of its own so a
//! slow flush or rename never holds up chunks for other transfers.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use filesender_common::protocol::FileShareRequest;

use super::sink::ChunkSink;
use super::types::{TransferError, TransferEvent, TransferEvents, TransferProgress};

/// Lifecycle of a receive state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceivePhase {
    /// Waiting for more chunks
    Receiving,
    /// Every chunk arrived; `Completed` or `Failed` follows once the
    /// destination is finished
    Finishing,
    /// The transfer cannot complete
    Failed,
}

impl ReceivePhase {
    /// No more chunks are accepted
    pub fn is_terminal(self) -> bool {
        !matches!(self, ReceivePhase::Receiving)
    }
}

/// One bit per chunk index
#[derive(Debug, Clone)]
struct ChunkBitmap {
    words: Vec<u64>,
}

impl ChunkBitmap {
    fn new(len: u64) -> Self {
        let words = usize::try_from(len.div_ceil(64)).unwrap_or(0);
        Self {
            words: vec![0; words],
        }
    }

    fn contains(&self, index: u64) -> bool {
        let (word, bit) = Self::position(index);
        self.words.get(word).is_some_and(|w| w & bit != 0)
    }

    fn insert(&mut self, index: u64) {
        let (word, bit) = Self::position(index);
        if let Some(w) = self.words.get_mut(word) {
            *w |= bit;
        }
    }

    fn position(index: u64) -> (usize, u64) {
        ((index / 64) as usize, 1u64 << (index % 64))
    }
}

/// Assembly state for one transfer
pub struct ReceiveState {
    handle_id: i32,
    file_id: i32,
    file_name: String,
    path: PathBuf,
    total_bytes: u64,
    chunk_size: u32,
    chunk_count: u64,
    received: ChunkBitmap,
    received_count: u64,
    bytes_received: u64,
    phase: ReceivePhase,
    sink: Option<Box<dyn ChunkSink>>,
    events: TransferEvents,
    last_activity: Instant,
}

impl ReceiveState {
    /// Start receiving and emit `Started`
    ///
    /// A transfer with zero chunks starts finishing immediately. Must be
    /// called from within a tokio runtime.
    pub fn start(
        request: &FileShareRequest,
        path: PathBuf,
        sink: Box<dyn ChunkSink>,
        events: TransferEvents,
    ) -> Self {
        let mut state = Self {
            handle_id: request.file_handle_id,
            file_id: request.file_id,
            file_name: request.file_name.clone(),
            path,
            total_bytes: request.file_size,
            chunk_size: request.chunk_size,
            chunk_count: request.chunk_count,
            received: ChunkBitmap::new(request.chunk_count),
            received_count: 0,
            bytes_received: 0,
            phase: ReceivePhase::Receiving,
            sink: Some(sink),
            events,
            last_activity: Instant::now(),
        };

        info!(
            handle_id = state.handle_id,
            file = %state.file_name,
            size = state.total_bytes,
            chunks = state.chunk_count,
            "transfer started"
        );
        state.emit(TransferEvent::Started(state.progress()));

        if state.chunk_count == 0 {
            state.complete();
        }

        state
    }

    /// Apply one chunk
    ///
    /// Returns the phase after the chunk was applied.
    pub async fn received_chunk(&mut self, index: i64, payload: &[u8]) -> ReceivePhase {
        if self.phase.is_terminal() {
            return self.phase;
        }
        self.last_activity = Instant::now();

        let slot = match u64::try_from(index) {
            Ok(slot) if slot < self.chunk_count => slot,
            _ => {
                self.fail(TransferError::ChunkOutOfRange {
                    index,
                    chunk_count: self.chunk_count,
                });
                return self.phase;
            }
        };

        if self.received.contains(slot) {
            trace!(handle_id = self.handle_id, index, "duplicate chunk ignored");
            return self.phase;
        }

        let offset = slot * u64::from(self.chunk_size);
        let len = payload.len() as u64;
        if len > u64::from(self.chunk_size) || offset + len > self.total_bytes {
            self.fail(TransferError::ChunkTooLarge {
                index,
                len: payload.len(),
            });
            return self.phase;
        }
        let expected = u64::from(self.chunk_size).min(self.total_bytes.saturating_sub(offset));
        if len == 0 && expected > 0 {
            self.fail(TransferError::EmptyChunk { index });
            return self.phase;
        }

        let Some(sink) = self.sink.as_mut() else {
            return self.phase;
        };
        if let Err(e) = sink.write_at(offset, payload).await {
            self.fail(e.into());
            return self.phase;
        }

        self.received.insert(slot);
        self.received_count += 1;
        self.bytes_received += len;
        trace!(
            handle_id = self.handle_id,
            index,
            received = self.received_count,
            of = self.chunk_count,
            "chunk written"
        );
        self.emit(TransferEvent::Progress(self.progress()));

        if self.received_count == self.chunk_count {
            self.complete();
        }

        self.phase
    }

    /// Fail the transfer and emit `Failed`
    ///
    /// Does nothing if the transfer already stopped receiving.
    pub fn fail(&mut self, error: TransferError) {
        if self.phase.is_terminal() {
            return;
        }

        warn!(handle_id = self.handle_id, file = %self.file_name, error = %error, "transfer failed");
        self.phase = ReceivePhase::Failed;
        self.sink = None;
        self.emit(TransferEvent::Failed {
            progress: self.progress(),
            error,
        });
    }

    /// Drop the transfer and throw away what was written, without any event
    pub async fn cancel(mut self) {
        info!(handle_id = self.handle_id, file = %self.file_name, "transfer cancelled");
        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.discard().await {
                warn!(handle_id = self.handle_id, error = %e, "could not discard partial download");
            }
        }
    }

    /// Hand the sink to a task that finishes it and reports the outcome
    fn complete(&mut self) {
        let Some(mut sink) = self.sink.take() else {
            return;
        };
        self.phase = ReceivePhase::Finishing;

        let progress = self.progress();
        let events = self.events.clone();
        debug!(handle_id = self.handle_id, "all chunks received, finishing");

        tokio::spawn(async move {
            let event = match sink.finish().await {
                Ok(()) => {
                    info!(
                        handle_id = progress.handle_id,
                        path = %progress.path.display(),
                        bytes = progress.bytes_received,
                        "transfer completed"
                    );
                    TransferEvent::Completed(progress)
                }
                Err(e) => {
                    warn!(handle_id = progress.handle_id, error = %e, "could not finish download");
                    TransferEvent::Failed {
                        progress,
                        error: e.into(),
                    }
                }
            };
            if events.send(event).is_err() {
                debug!("transfer event receiver dropped");
            }
        });
    }

    fn emit(&self, event: TransferEvent) {
        if self.events.send(event).is_err() {
            debug!(handle_id = self.handle_id, "transfer event receiver dropped");
        }
    }

    /// Current progress snapshot
    pub fn progress(&self) -> TransferProgress {
        TransferProgress {
            handle_id: self.handle_id,
            file_id: self.file_id,
            file_name: self.file_name.clone(),
            path: self.path.clone(),
            received_chunks: self.received_count,
            chunk_count: self.chunk_count,
            bytes_received: self.bytes_received,
            total_bytes: self.total_bytes,
        }
    }

    pub fn handle_id(&self) -> i32 {
        self.handle_id
    }

    pub fn phase(&self) -> ReceivePhase {
        self.phase
    }

    /// Time since the last chunk (or since the start if none arrived)
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }
}
