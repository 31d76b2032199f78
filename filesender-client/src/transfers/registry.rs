//! Active transfers keyed by handle id
//!
//! The registry is owned by the client's delivery loop and is only ever
//! touched from there, so it needs no locking.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{error, info, trace, warn};

use filesender_common::framing::ChunkFrame;
use filesender_common::protocol::FileShareRequest;
use filesender_common::validators::validate_file_name;

use super::file_utils::{is_directory, resolve_destination};
use super::receive::{ReceivePhase, ReceiveState};
use super::sink::{ChunkSink, FileSink, QueuedSink};
use super::types::{
    AcceptedTransfer, OfferError, TransferError, TransferEvents, TransferProgress,
    TransferSettings,
};
use crate::constants::MAX_CHUNK_COUNT;

/// Transfers that have been accepted and have not finished yet
pub struct TransferRegistry {
    settings: TransferSettings,
    active: HashMap<i32, ReceiveState>,
}

impl TransferRegistry {
    pub fn new(settings: TransferSettings) -> Self {
        Self {
            settings,
            active: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    /// Accept a share request into `accepted.directory`
    ///
    /// Returns the path the file will be written to.
    ///
    /// # Errors
    ///
    /// Returns why the transfer could not be set up. Nothing is registered and
    /// no file is left behind.
    pub async fn open(
        &mut self,
        request: &FileShareRequest,
        accepted: AcceptedTransfer,
    ) -> Result<PathBuf, OfferError> {
        self.check_request(request)?;

        if let Err(e) = validate_file_name(&request.file_name) {
            warn!(handle_id = request.file_handle_id, file = %request.file_name, error = ?e, "refusing unsafe file name");
            return Err(OfferError::InvalidFileName(e));
        }
        if !is_directory(&accepted.directory).await {
            warn!(directory = %accepted.directory.display(), "download directory does not exist");
            return Err(OfferError::MissingDirectory(accepted.directory));
        }

        let path = resolve_destination(&accepted.directory, &request.file_name)
            .await
            .inspect_err(|e| {
                error!(file = %request.file_name, error = %e, "could not pick a download path");
            })?;
        let file_sink = FileSink::create(&path, request.file_size)
            .await
            .inspect_err(|e| {
                error!(path = %path.display(), error = %e, "could not create download file");
            })?;
        let sink = QueuedSink::spawn(file_sink, self.settings.write_queue_depth);

        self.start_with_sink(request, path.clone(), Box::new(sink), accepted.events)?;
        Ok(path)
    }

    /// Register a transfer that writes into `sink`
    ///
    /// `path` is only reported in progress events.
    pub fn start_with_sink(
        &mut self,
        request: &FileShareRequest,
        path: PathBuf,
        sink: Box<dyn ChunkSink>,
        events: TransferEvents,
    ) -> Result<(), OfferError> {
        self.check_request(request)?;

        let state = ReceiveState::start(request, path, sink, events);
        if !state.phase().is_terminal() {
            self.active.insert(request.file_handle_id, state);
        }
        Ok(())
    }

    fn check_request(&self, request: &FileShareRequest) -> Result<(), OfferError> {
        if self.active.contains_key(&request.file_handle_id) {
            warn!(handle_id = request.file_handle_id, "handle id already in use");
            return Err(OfferError::DuplicateHandle(request.file_handle_id));
        }
        if !request.layout_is_consistent() || request.chunk_count > MAX_CHUNK_COUNT {
            warn!(
                handle_id = request.file_handle_id,
                size = request.file_size,
                chunk_size = request.chunk_size,
                chunks = request.chunk_count,
                "share request layout is not usable"
            );
            return Err(OfferError::InvalidLayout {
                file_size: request.file_size,
                chunk_size: request.chunk_size,
                chunk_count: request.chunk_count,
            });
        }
        Ok(())
    }

    /// Drop a transfer the host was never told about
    ///
    /// Whatever was written is discarded. Returns false if `handle_id` is not
    /// active.
    pub async fn cancel(&mut self, handle_id: i32) -> bool {
        let Some(state) = self.active.remove(&handle_id) else {
            return false;
        };
        state.cancel().await;
        true
    }

    /// Route a chunk to its transfer
    ///
    /// Returns `None` when no active transfer has the frame's id.
    pub async fn on_chunk(&mut self, frame: ChunkFrame<'_>) -> Option<ReceivePhase> {
        let Some(state) = self.active.get_mut(&frame.transfer_id) else {
            trace!(
                transfer_id = frame.transfer_id,
                index = frame.chunk_index,
                "discarding chunk for unknown transfer"
            );
            return None;
        };

        let phase = state.received_chunk(frame.chunk_index, frame.payload).await;
        if phase.is_terminal() {
            self.active.remove(&frame.transfer_id);
        }
        Some(phase)
    }

    /// Drop every active transfer without a terminal event
    ///
    /// Partially written `.part` files stay on disk. Returns how many
    /// transfers were dropped.
    pub fn abandon_all(&mut self) -> usize {
        let count = self.active.len();
        for (handle_id, state) in self.active.drain() {
            let progress = state.progress();
            info!(
                handle_id,
                file = %progress.file_name,
                received = progress.received_chunks,
                of = progress.chunk_count,
                "transfer abandoned"
            );
        }
        count
    }

    /// Fail transfers that have been idle longer than the stall timeout
    ///
    /// Returns how many transfers were failed. Does nothing when no stall
    /// timeout is configured.
    pub fn sweep_stalled(&mut self, now: Instant) -> usize {
        let Some(timeout) = self.settings.stall_timeout else {
            return 0;
        };

        let stalled: Vec<i32> = self
            .active
            .iter()
            .filter(|(_, state)| state.idle_for(now) >= timeout)
            .map(|(handle_id, _)| *handle_id)
            .collect();

        for handle_id in &stalled {
            if let Some(mut state) = self.active.remove(handle_id) {
                state.fail(TransferError::Stalled(timeout));
            }
        }
        stalled.len()
    }

    pub fn contains(&self, handle_id: i32) -> bool {
        self.active.contains_key(&handle_id)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Progress of an active transfer
    pub fn progress(&self, handle_id: i32) -> Option<TransferProgress> {
        self.active.get(&handle_id).map(ReceiveState::progress)
    }
}
