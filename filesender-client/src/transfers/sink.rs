//! Destinations for received chunks
//!
//! - `FileSink` writes into `<name>.part` and renames it once complete
//! - `QueuedSink` runs another sink on a worker task behind a bounded queue,
//!   so slow storage for one transfer does not hold up delivery for others
//! - `MemorySink` keeps everything in memory

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::constants::PART_SUFFIX;

/// Positional-write destination for one transfer's bytes
#[async_trait]
pub trait ChunkSink: Send {
    /// Write `data` starting at byte `offset`
    async fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()>;

    /// Make everything written so far durable and publish the result
    async fn finish(&mut self) -> io::Result<()>;

    /// Throw away whatever was written
    async fn discard(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// =============================================================================
// File Sink
// =============================================================================

/// Writes a transfer into a `.part` file next to its final path
pub struct FileSink {
    file: File,
    part_path: PathBuf,
    final_path: PathBuf,
}

impl FileSink {
    /// Create the `.part` file and size it to the announced length
    pub async fn create(final_path: &Path, size: u64) -> io::Result<Self> {
        let part_path = part_path_for(final_path);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&part_path)
            .await?;
        file.set_len(size).await?;

        Ok(Self {
            file,
            part_path,
            final_path: final_path.to_path_buf(),
        })
    }

    pub fn part_path(&self) -> &Path {
        &self.part_path
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }
}

#[async_trait]
impl ChunkSink for FileSink {
    async fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset)).await?;
        self.file.write_all(data).await
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        tokio::fs::rename(&self.part_path, &self.final_path).await?;
        debug!(path = %self.final_path.display(), "download published");
        Ok(())
    }

    async fn discard(&mut self) -> io::Result<()> {
        tokio::fs::remove_file(&self.part_path).await?;
        debug!(path = %self.part_path.display(), "partial download removed");
        Ok(())
    }
}

/// Path of the in-progress file for a download
pub fn part_path_for(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_owned();
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

// =============================================================================
// Queued Sink
// =============================================================================

enum SinkCommand {
    Write { offset: u64, data: Vec<u8> },
    Finish(oneshot::Sender<io::Result<()>>),
    Discard,
}

/// Runs a sink on its own task behind a bounded queue
///
/// `write_at` and `discard` return as soon as the command is queued; they only
/// wait when the queue is full. A write that fails on the worker is reported by the next
/// call. Dropping the sink stops the worker and drops the inner sink.
pub struct QueuedSink {
    tx: mpsc::Sender<SinkCommand>,
    failure: oneshot::Receiver<io::Error>,
}

impl QueuedSink {
    /// Spawn a worker that owns `inner`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S>(inner: S, depth: usize) -> Self
    where
        S: ChunkSink + 'static,
    {
        let (tx, rx) = mpsc::channel(depth.max(1));
        let (failure_tx, failure_rx) = oneshot::channel();
        tokio::spawn(run_sink_worker(inner, rx, failure_tx));

        Self {
            tx,
            failure: failure_rx,
        }
    }

    fn take_failure(&mut self) -> Option<io::Error> {
        self.failure.try_recv().ok()
    }
}

async fn run_sink_worker<S: ChunkSink>(
    mut inner: S,
    mut rx: mpsc::Receiver<SinkCommand>,
    failure_tx: oneshot::Sender<io::Error>,
) {
    let mut failure_tx = Some(failure_tx);
    let mut failed = false;

    while let Some(command) = rx.recv().await {
        match command {
            SinkCommand::Write { offset, data } => {
                if failed {
                    continue;
                }
                if let Err(e) = inner.write_at(offset, &data).await {
                    warn!(offset, error = %e, "queued write failed");
                    failed = true;
                    if let Some(tx) = failure_tx.take() {
                        let _ = tx.send(e);
                    }
                }
            }
            SinkCommand::Finish(reply) => {
                let result = if failed {
                    Err(io::Error::other("an earlier write failed"))
                } else {
                    inner.finish().await
                };
                let _ = reply.send(result);
                break;
            }
            SinkCommand::Discard => {
                if let Err(e) = inner.discard().await {
                    warn!(error = %e, "could not discard partial download");
                }
                break;
            }
        }
    }
}

fn worker_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "write worker stopped")
}

#[async_trait]
impl ChunkSink for QueuedSink {
    async fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        if let Some(e) = self.take_failure() {
            return Err(e);
        }

        self.tx
            .send(SinkCommand::Write {
                offset,
                data: data.to_vec(),
            })
            .await
            .map_err(|_| worker_gone())
    }

    async fn finish(&mut self) -> io::Result<()> {
        if let Some(e) = self.take_failure() {
            return Err(e);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SinkCommand::Finish(reply_tx))
            .await
            .map_err(|_| worker_gone())?;

        match reply_rx.await {
            Ok(result) => result.map_err(|e| self.take_failure().unwrap_or(e)),
            Err(_) => Err(worker_gone()),
        }
    }

    /// Queue the discard behind pending writes without waiting for it
    async fn discard(&mut self) -> io::Result<()> {
        self.tx
            .send(SinkCommand::Discard)
            .await
            .map_err(|_| worker_gone())
    }
}

// =============================================================================
// Memory Sink
// =============================================================================

/// In-memory destination
///
/// Clones share the same buffer, so a caller can keep one clone to inspect
/// what a transfer wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    data: Arc<Mutex<Vec<u8>>>,
    finished: Arc<Mutex<bool>>,
    discarded: Arc<Mutex<bool>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the bytes written so far
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.lock().map(|f| *f).unwrap_or(false)
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded.lock().map(|d| *d).unwrap_or(false)
    }
}

#[async_trait]
impl ChunkSink for MemorySink {
    async fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        let start = usize::try_from(offset).map_err(io::Error::other)?;
        let end = start + data.len();

        let mut buffer = self
            .data
            .lock()
            .map_err(|_| io::Error::other("memory sink poisoned"))?;
        if buffer.len() < end {
            buffer.resize(end, 0);
        }
        buffer[start..end].copy_from_slice(data);
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> {
        let mut finished = self
            .finished
            .lock()
            .map_err(|_| io::Error::other("memory sink poisoned"))?;
        *finished = true;
        Ok(())
    }

    async fn discard(&mut self) -> io::Result<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| io::Error::other("memory sink poisoned"))?;
        data.clear();
        drop(data);

        let mut discarded = self
            .discarded
            .lock()
            .map_err(|_| io::Error::other("memory sink poisoned"))?;
        *discarded = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink whose writes fail after a number of successes
    struct FailingSink {
        remaining: usize,
    }

    #[async_trait]
    impl ChunkSink for FailingSink {
        async fn write_at(&mut self, _offset: u64, _data: &[u8]) -> io::Result<()> {
            if self.remaining == 0 {
                return Err(io::Error::other("disk on fire"));
            }
            self.remaining -= 1;
            Ok(())
        }

        async fn finish(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_memory_sink_positional_writes() {
        let mut sink = MemorySink::new();
        sink.write_at(4, b"5678").await.unwrap();
        sink.write_at(0, b"1234").await.unwrap();
        assert_eq!(sink.contents(), b"12345678");
        assert!(!sink.is_finished());

        sink.finish().await.unwrap();
        assert!(sink.is_finished());
    }

    #[tokio::test]
    async fn test_memory_sink_clones_share_buffer() {
        let observer = MemorySink::new();
        let mut writer = observer.clone();
        writer.write_at(0, b"abc").await.unwrap();
        assert_eq!(observer.contents(), b"abc");
    }

    #[tokio::test]
    async fn test_file_sink_writes_part_then_renames() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("out.bin");

        let mut sink = FileSink::create(&final_path, 6).await.unwrap();
        assert!(sink.part_path().exists());
        assert!(!final_path.exists());

        sink.write_at(3, b"def").await.unwrap();
        sink.write_at(0, b"abc").await.unwrap();
        sink.finish().await.unwrap();

        assert!(!part_path_for(&final_path).exists());
        assert_eq!(tokio::fs::read(&final_path).await.unwrap(), b"abcdef");
    }

    #[tokio::test]
    async fn test_file_sink_presized() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("sparse.bin");

        let sink = FileSink::create(&final_path, 1024).await.unwrap();
        let metadata = tokio::fs::metadata(sink.part_path()).await.unwrap();
        assert_eq!(metadata.len(), 1024);
    }

    #[tokio::test]
    async fn test_file_sink_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("missing").join("out.bin");
        assert!(FileSink::create(&final_path, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_file_sink_discard_removes_part() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("gone.bin");

        let mut sink = FileSink::create(&final_path, 4).await.unwrap();
        sink.write_at(0, b"ab").await.unwrap();
        sink.discard().await.unwrap();

        assert!(!part_path_for(&final_path).exists());
        assert!(!final_path.exists());
    }

    #[tokio::test]
    async fn test_queued_sink_discard() {
        let observer = MemorySink::new();
        let mut sink = QueuedSink::spawn(observer.clone(), 4);

        sink.write_at(0, b"abc").await.unwrap();
        sink.discard().await.unwrap();

        for _ in 0..100 {
            if observer.is_discarded() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(observer.is_discarded());
        assert!(observer.contents().is_empty());
        assert!(!observer.is_finished());
    }

    #[test]
    fn test_part_path_for() {
        assert_eq!(
            part_path_for(Path::new("/tmp/file.txt")),
            PathBuf::from("/tmp/file.txt.part")
        );
    }

    #[tokio::test]
    async fn test_queued_sink_forwards_writes() {
        let observer = MemorySink::new();
        let mut sink = QueuedSink::spawn(observer.clone(), 2);

        for i in 0..10u8 {
            sink.write_at(u64::from(i), &[i]).await.unwrap();
        }
        sink.finish().await.unwrap();

        assert!(observer.is_finished());
        assert_eq!(observer.contents(), (0..10u8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_queued_sink_reports_worker_failure() {
        let mut sink = QueuedSink::spawn(FailingSink { remaining: 1 }, 4);

        sink.write_at(0, b"ok").await.unwrap();
        // Queued successfully; the worker fails it later
        sink.write_at(2, b"bad").await.unwrap();

        let err = sink.finish().await.unwrap_err();
        assert_eq!(err.to_string(), "disk on fire");
    }
}
