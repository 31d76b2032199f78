//! Protocol definitions for FileSender
//!
//! Control messages are sent as WebSocket text messages. Each one is an
//! [`Envelope`] naming the payload type (the discriminator) and carrying the
//! payload as a JSON document. File content travels separately as binary
//! chunk frames (see [`crate::framing`]).
//!
//! Payload field names are camelCase on the wire.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Envelope
// =============================================================================

/// Generic wire wrapper: a type discriminator plus an opaque payload
///
/// The payload is normally a JSON document encoded as a string. An inline
/// JSON object is accepted on decode as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Discriminator naming the payload type (e.g. "auth-accepted")
    pub class_name: String,
    /// Payload blob, decoded according to the discriminator
    #[serde(default)]
    pub payload: serde_json::Value,
}

// =============================================================================
// Shared Types
// =============================================================================

/// Descriptor of the server the client is talking to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    /// Display name of the server
    pub server_name: String,
    /// Server software version, if advertised
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
}

/// A file advertised by the server in its catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    /// Server-assigned id, unique within a session
    pub id: i32,
    /// Display name
    pub file_name: String,
    /// Size in bytes
    pub file_size: u64,
    /// Size of every chunk except possibly the last
    pub chunk_size: u32,
    /// Number of chunks the file is split into
    pub chunk_count: u64,
}

/// Reason code attached to a denied file share
///
/// Hosts only understand `CLIENT_DENIED`. Local causes (bad destination,
/// storage errors) are logged by the client and never put on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailReason {
    /// The user or application declined the file
    #[default]
    ClientDenied,
}

// =============================================================================
// Client -> Server Payloads
// =============================================================================

/// Authentication request, sent as soon as the connection opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    /// Client display name
    pub name: String,
    /// Client software version
    pub client_version: String,
}

/// Acceptance of a file share request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileShareAccept {
    pub file_handle_id: i32,
}

/// Refusal of a file share request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileShareDenied {
    pub file_handle_id: i32,
    #[serde(default)]
    pub reason: FailReason,
}

/// Ask the server to start sharing a catalog entry with us
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFileDownload {
    pub file_id: i32,
}

/// Ask the server to resend its file list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFileListUpdate {}

// =============================================================================
// Server -> Client Payloads
// =============================================================================

/// Successful authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthAccepted {
    /// Name the server registered us under
    pub client_name: String,
    /// Id assigned to this client for the session
    pub received_client_id: i32,
    /// The server's descriptor
    #[serde(default)]
    pub server_info: ServerInfo,
}

/// Failed authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthDenied {
    /// Server-defined failure code
    pub code: i32,
    /// Human-readable reason
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_info: Option<ServerInfo>,
}

/// The server offers to send a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileShareRequest {
    /// Catalog id of the offered file
    #[serde(default)]
    pub file_id: i32,
    /// Id the chunk frames of this transfer will carry
    pub file_handle_id: i32,
    pub file_name: String,
    pub file_size: u64,
    pub chunk_size: u32,
    pub chunk_count: u64,
}

impl FileShareRequest {
    /// Returns true if the size, chunk size and chunk count describe the same file
    ///
    /// Every chunk but the last is exactly `chunk_size` bytes and the last is
    /// non-empty. An empty file may be sent as zero chunks or one empty chunk.
    #[must_use]
    pub fn layout_is_consistent(&self) -> bool {
        if self.file_size == 0 {
            return self.chunk_count <= 1;
        }
        if self.chunk_size == 0 || self.chunk_count == 0 {
            return false;
        }
        self.file_size.div_ceil(u64::from(self.chunk_size)) == self.chunk_count
    }
}

/// Complete replacement of the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListUpdate {
    /// Every available file, keyed by file id
    #[serde(default)]
    pub files: BTreeMap<i32, FileDescriptor>,
}

// =============================================================================
// Message Sum Types
// =============================================================================

/// Every control message the server may send that the client acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    AuthAccepted(AuthAccepted),
    AuthDenied(AuthDenied),
    FileShareRequest(FileShareRequest),
    FileListUpdate(FileListUpdate),
}

/// Every control message the client sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    AuthRequest(AuthRequest),
    FileShareAccept(FileShareAccept),
    FileShareDenied(FileShareDenied),
    RequestFileDownload(RequestFileDownload),
    RequestFileListUpdate(RequestFileListUpdate),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_reason_wire_names() {
        assert_eq!(
            serde_json::to_string(&FailReason::ClientDenied).unwrap(),
            "\"CLIENT_DENIED\""
        );
        assert_eq!(
            serde_json::from_str::<FailReason>("\"CLIENT_DENIED\"").unwrap(),
            FailReason::ClientDenied
        );
        assert_eq!(FailReason::default(), FailReason::ClientDenied);
    }

    #[test]
    fn test_share_request_camel_case() {
        let json = r#"{
            "fileId": 7,
            "fileHandleId": 42,
            "fileName": "report.pdf",
            "fileSize": 1000,
            "chunkSize": 100,
            "chunkCount": 10
        }"#;
        let request: FileShareRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.file_id, 7);
        assert_eq!(request.file_handle_id, 42);
        assert_eq!(request.file_name, "report.pdf");
        assert_eq!(request.chunk_count, 10);
    }

    fn share_request(file_size: u64, chunk_size: u32, chunk_count: u64) -> FileShareRequest {
        FileShareRequest {
            file_id: 1,
            file_handle_id: 1,
            file_name: "f".to_string(),
            file_size,
            chunk_size,
            chunk_count,
        }
    }

    #[test]
    fn test_layout_consistency() {
        assert!(share_request(1000, 100, 10).layout_is_consistent());
        assert!(share_request(1001, 100, 11).layout_is_consistent());
        assert!(share_request(1, 100, 1).layout_is_consistent());
        assert!(share_request(0, 100, 0).layout_is_consistent());
        assert!(share_request(0, 0, 1).layout_is_consistent());

        assert!(!share_request(1000, 100, 9).layout_is_consistent());
        assert!(!share_request(1000, 100, 11).layout_is_consistent());
        assert!(!share_request(1000, 0, 10).layout_is_consistent());
        assert!(!share_request(1000, 100, 0).layout_is_consistent());
        assert!(!share_request(0, 100, 2).layout_is_consistent());
    }

    #[test]
    fn test_file_list_integer_keys() {
        // JSON object keys are strings; they map back to integer ids
        let json = r#"{"files":{"3":{"id":3,"fileName":"a.txt","fileSize":5,"chunkSize":5,"chunkCount":1}}}"#;
        let update: FileListUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.files.len(), 1);
        assert_eq!(update.files[&3].file_name, "a.txt");
    }

    #[test]
    fn test_auth_accepted_missing_server_info() {
        let json = r#"{"clientName":"alice","receivedClientId":9}"#;
        let accepted: AuthAccepted = serde_json::from_str(json).unwrap();
        assert_eq!(accepted.received_client_id, 9);
        assert_eq!(accepted.server_info, ServerInfo::default());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        // Newer servers may add fields; older clients must still decode
        let json = r#"{"code":3,"message":"banned","retryAfter":60}"#;
        let denied: AuthDenied = serde_json::from_str(json).unwrap();
        assert_eq!(denied.code, 3);
        assert_eq!(denied.message, "banned");
    }

    #[test]
    fn test_request_file_list_update_is_empty_object() {
        assert_eq!(
            serde_json::to_string(&RequestFileListUpdate::default()).unwrap(),
            "{}"
        );
    }
}
