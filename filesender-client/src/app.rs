//! Command-line application
//!
//! [`CliHandler`] answers the client's callbacks for the `filesender` binary:
//! it prints the catalog, requests the downloads given on the command line and
//! decides which offers to accept. Transfer events are reported by a separate
//! task ([`report_progress`]) so printing never slows down delivery.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use filesender_common::protocol::{AuthAccepted, AuthDenied, FileShareRequest};

use crate::catalog::FileList;
use crate::client::ClientHandler;
use crate::config::Config;
use crate::error::ClientError;
use crate::network::{ClientCommand, CommandSender};
use crate::transfers::{AcceptedTransfer, ShareDecision, TransferEvent, TransferEvents};

/// Catalog ids the user asked for that have not finished yet
pub type PendingDownloads = Arc<Mutex<BTreeSet<i32>>>;

/// How the session ended, for the exit code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOutcome {
    pub logged_in: bool,
    pub denied: Option<AuthDenied>,
    pub error: Option<String>,
    pub closed_by_host: bool,
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        self.logged_in && self.denied.is_none() && self.error.is_none()
    }
}

/// Callbacks for the command-line client
pub struct CliHandler {
    commands: CommandSender,
    events: TransferEvents,
    download_dir: PathBuf,
    auto_accept: bool,
    list_only: bool,
    pending: PendingDownloads,
    downloads_requested: bool,
    outcome: SessionOutcome,
}

impl CliHandler {
    pub fn new(
        config: &Config,
        commands: CommandSender,
        events: TransferEvents,
        pending: PendingDownloads,
    ) -> Self {
        Self {
            commands,
            events,
            download_dir: config.download_dir.clone(),
            auto_accept: config.auto_accept,
            list_only: config.list_only,
            pending,
            downloads_requested: false,
            outcome: SessionOutcome::default(),
        }
    }

    pub fn outcome(&self) -> &SessionOutcome {
        &self.outcome
    }

    pub fn into_outcome(self) -> SessionOutcome {
        self.outcome
    }

    fn command(&self, command: ClientCommand) {
        if self.commands.send(command).is_err() {
            debug!(command = ?command, "session already finished");
        }
    }

    /// Request every wanted file that the catalog has
    ///
    /// Ids missing from the catalog are dropped with a warning.
    fn request_downloads(&mut self, files: &FileList) {
        self.downloads_requested = true;

        let wanted: Vec<i32> = match self.pending.lock() {
            Ok(mut pending) => {
                pending.retain(|id| {
                    let known = files.contains_key(id);
                    if !known {
                        warn!(file_id = id, "file is not in the host's catalog");
                    }
                    known
                });
                pending.iter().copied().collect()
            }
            Err(_) => Vec::new(),
        };

        for file_id in &wanted {
            info!(file_id, "requesting download");
            self.command(ClientCommand::Download(*file_id));
        }

        if wanted.is_empty() && !self.auto_accept {
            info!("nothing to download");
            self.command(ClientCommand::Close);
        }
    }

    fn is_pending(&self, file_id: i32) -> bool {
        self.pending
            .lock()
            .map(|pending| pending.contains(&file_id))
            .unwrap_or(false)
    }

    fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .map(|pending| !pending.is_empty())
            .unwrap_or(false)
    }
}

impl ClientHandler for CliHandler {
    fn review_file_request(&mut self, request: &FileShareRequest) -> ShareDecision {
        if self.auto_accept || self.is_pending(request.file_id) {
            return ShareDecision::Accept(AcceptedTransfer {
                directory: self.download_dir.clone(),
                events: self.events.clone(),
            });
        }

        info!(file = %request.file_name, "declining unrequested file");
        ShareDecision::deny()
    }

    fn on_login(&mut self, accepted: &AuthAccepted) {
        self.outcome.logged_in = true;
        println!(
            "Connected to {} as {} (id {})",
            accepted.server_info.server_name, accepted.client_name, accepted.received_client_id
        );
        self.command(ClientCommand::RequestFileList);
    }

    fn on_login_failed(&mut self, denied: &AuthDenied) {
        eprintln!("Login denied ({}): {}", denied.code, denied.message);
        self.outcome.denied = Some(denied.clone());
    }

    fn on_file_list_update(&mut self, files: &Arc<FileList>) {
        print!("{}", format_file_list(files));

        if self.list_only {
            self.command(ClientCommand::Close);
            return;
        }
        if !self.downloads_requested && (self.has_pending() || !self.auto_accept) {
            self.request_downloads(files);
        }
    }

    fn on_close(&mut self, code: u16, reason: &str, remote: bool) {
        self.outcome.closed_by_host = remote;
        if remote {
            println!("Host closed the connection ({code}) {reason}");
        }
    }

    fn on_error(&mut self, error: &ClientError) {
        eprintln!("Connection error: {error}");
        self.outcome.error = Some(error.to_string());
    }
}

/// Log transfer events until every sender is gone
///
/// Closes the session once the last pending download finishes, unless offers
/// are being auto-accepted. Returns the number of failed transfers.
pub async fn report_progress(
    mut events: mpsc::UnboundedReceiver<TransferEvent>,
    pending: PendingDownloads,
    commands: CommandSender,
    auto_accept: bool,
) -> usize {
    let mut failures = 0;

    while let Some(event) = events.recv().await {
        let progress = event.progress();
        match &event {
            TransferEvent::Started(p) => {
                info!(file = %p.file_name, size = %format_size(p.total_bytes), path = %p.path.display(), "download started");
            }
            TransferEvent::Progress(p) => {
                debug!(file = %p.file_name, percent = %format_percent(p.fraction()), "download progress");
            }
            TransferEvent::Completed(p) => {
                println!("Saved {} ({})", p.path.display(), format_size(p.bytes_received));
            }
            TransferEvent::Failed { progress, error } => {
                failures += 1;
                eprintln!("Download of {} failed: {}", progress.file_name, error);
            }
        }

        let terminal = matches!(
            event,
            TransferEvent::Completed(_) | TransferEvent::Failed { .. }
        );
        if terminal && finish_pending(&pending, progress.file_id) && !auto_accept {
            info!("all requested downloads finished");
            let _ = commands.send(ClientCommand::Close);
        }
    }

    failures
}

/// Remove `file_id` from the pending set
///
/// Returns true if this emptied the set.
fn finish_pending(pending: &PendingDownloads, file_id: i32) -> bool {
    match pending.lock() {
        Ok(mut pending) => pending.remove(&file_id) && pending.is_empty(),
        Err(_) => false,
    }
}

/// Render the catalog as a table
pub fn format_file_list(files: &FileList) -> String {
    if files.is_empty() {
        return "The host is not sharing any files\n".to_string();
    }

    let mut out = format!("{:>6}  {:>10}  {}\n", "ID", "SIZE", "NAME");
    for file in files.values() {
        out.push_str(&format!(
            "{:>6}  {:>10}  {}\n",
            file.id,
            format_size(file.file_size),
            file.file_name
        ));
    }
    out
}

/// Format a file size for display (human-readable)
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if size >= TB {
        format!("{:.1} TB", size as f64 / TB as f64)
    } else if size >= GB {
        format!("{:.1} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.1} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.1} KB", size as f64 / KB as f64)
    } else {
        format!("{size} B")
    }
}

fn format_percent(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}
