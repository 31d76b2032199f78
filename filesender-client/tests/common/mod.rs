//! Shared helpers for client integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use filesender_client::catalog::FileList;
use filesender_client::transfers::{AcceptedTransfer, ShareDecision, TransferEvent};
use filesender_client::{ClientError, ClientHandler, Transport, TransportError};
use filesender_common::io::{decode_outbound, encode_inbound};
use filesender_common::protocol::{
    AuthAccepted, AuthDenied, Envelope, FailReason, FileDescriptor, FileListUpdate,
    FileShareRequest, InboundMessage, OutboundMessage, ServerInfo,
};

// ============================================================================
// Recording Transport
// ============================================================================

/// Transport that keeps everything the client sends
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub texts: Vec<String>,
    pub binaries: Vec<Vec<u8>>,
    pub closed: bool,
    pub close_calls: usize,
    /// Make every text send fail as if the socket broke
    pub fail_sends: bool,
}

impl RecordingTransport {
    /// Decode every text message sent so far
    pub fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.texts
            .iter()
            .map(|text| {
                let envelope = Envelope::parse(text).expect("client sent a non-envelope");
                decode_outbound(&envelope)
                    .expect("client sent an undecodable payload")
                    .expect("client sent an unknown discriminator")
            })
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if self.fail_sends {
            return Err(TransportError::WebSocket("broken pipe".to_string()));
        }
        self.texts.push(text);
        Ok(())
    }

    fn send_binary(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.binaries.push(bytes);
        Ok(())
    }

    fn close(&mut self) {
        self.close_calls += 1;
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

// ============================================================================
// Recording Handler
// ============================================================================

/// What the handler answers to file offers
#[derive(Debug, Clone)]
pub enum Policy {
    Deny(FailReason),
    AcceptInto(PathBuf),
}

/// Handler that records every callback
pub struct RecordingHandler {
    pub policy: Policy,
    pub events: mpsc::UnboundedSender<TransferEvent>,
    pub logins: Vec<AuthAccepted>,
    pub login_failures: Vec<AuthDenied>,
    pub file_lists: Vec<Arc<FileList>>,
    pub reviewed: Vec<FileShareRequest>,
    pub closes: Vec<(u16, String, bool)>,
    pub errors: Vec<String>,
}

impl RecordingHandler {
    pub fn new(policy: Policy) -> (Self, mpsc::UnboundedReceiver<TransferEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let handler = Self {
            policy,
            events,
            logins: Vec::new(),
            login_failures: Vec::new(),
            file_lists: Vec::new(),
            reviewed: Vec::new(),
            closes: Vec::new(),
            errors: Vec::new(),
        };
        (handler, rx)
    }
}

impl ClientHandler for RecordingHandler {
    fn review_file_request(&mut self, request: &FileShareRequest) -> ShareDecision {
        self.reviewed.push(request.clone());
        match &self.policy {
            Policy::Deny(reason) => ShareDecision::Deny(*reason),
            Policy::AcceptInto(directory) => ShareDecision::Accept(AcceptedTransfer {
                directory: directory.clone(),
                events: self.events.clone(),
            }),
        }
    }

    fn on_login(&mut self, accepted: &AuthAccepted) {
        self.logins.push(accepted.clone());
    }

    fn on_login_failed(&mut self, denied: &AuthDenied) {
        self.login_failures.push(denied.clone());
    }

    fn on_file_list_update(&mut self, files: &Arc<FileList>) {
        self.file_lists.push(Arc::clone(files));
    }

    fn on_close(&mut self, code: u16, reason: &str, remote: bool) {
        self.closes.push((code, reason.to_string(), remote));
    }

    fn on_error(&mut self, error: &ClientError) {
        self.errors.push(error.to_string());
    }
}

// ============================================================================
// Server Messages
// ============================================================================

pub fn server_info() -> ServerInfo {
    ServerInfo {
        server_name: "test-host".to_string(),
        server_version: Some("1.0.0".to_string()),
    }
}

pub fn auth_accepted(client_id: i32) -> String {
    encode_inbound(&InboundMessage::AuthAccepted(AuthAccepted {
        client_name: "tester".to_string(),
        received_client_id: client_id,
        server_info: server_info(),
    }))
    .unwrap()
}

pub fn auth_denied(code: i32, message: &str) -> String {
    encode_inbound(&InboundMessage::AuthDenied(AuthDenied {
        code,
        message: message.to_string(),
        server_info: None,
    }))
    .unwrap()
}

pub fn descriptor(id: i32, name: &str, size: u64) -> FileDescriptor {
    FileDescriptor {
        id,
        file_name: name.to_string(),
        file_size: size,
        chunk_size: 100,
        chunk_count: size.div_ceil(100),
    }
}

pub fn file_list_update(files: &[FileDescriptor]) -> String {
    encode_inbound(&InboundMessage::FileListUpdate(FileListUpdate {
        files: files.iter().map(|f| (f.id, f.clone())).collect(),
    }))
    .unwrap()
}

pub fn share_request(
    file_handle_id: i32,
    file_id: i32,
    file_name: &str,
    file_size: u64,
    chunk_size: u32,
    chunk_count: u64,
) -> FileShareRequest {
    FileShareRequest {
        file_id,
        file_handle_id,
        file_name: file_name.to_string(),
        file_size,
        chunk_size,
        chunk_count,
    }
}

pub fn share_request_text(request: &FileShareRequest) -> String {
    encode_inbound(&InboundMessage::FileShareRequest(request.clone())).unwrap()
}

/// Deterministic contents for chunk `index`
pub fn chunk_bytes(index: u64, len: usize) -> Vec<u8> {
    (0..len).map(|i| (index as usize * 31 + i) as u8).collect()
}

/// Drain every event received so far
pub fn drain_events(rx: &mut mpsc::UnboundedReceiver<TransferEvent>) -> Vec<TransferEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Receive events until a transfer completes or fails
///
/// Destinations are finished on a task of their own, so `Completed` can
/// arrive after the last chunk was handed over.
pub async fn wait_for_terminal(rx: &mut mpsc::UnboundedReceiver<TransferEvent>) -> Vec<TransferEvent> {
    let mut events = Vec::new();
    loop {
        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("transfer never completed or failed")
            .expect("event channel closed");
        let done = matches!(
            event,
            TransferEvent::Completed(_) | TransferEvent::Failed { .. }
        );
        events.push(event);
        if done {
            return events;
        }
    }
}

/// Wait for a file removed by a background task
pub async fn wait_until_gone(path: &Path) -> bool {
    for _ in 0..100 {
        if !path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    !path.exists()
}
