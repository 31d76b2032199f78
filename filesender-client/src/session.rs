//! Session state machine
//!
//! ```text
//! Connecting ──open──▶ Authenticating ──accepted──▶ Authenticated
//!                             │
//!                             └──────denied──────▶ Denied
//! ```
//!
//! Any phase moves to `Closed` when the connection goes away. Only the first
//! auth answer counts; later ones are ignored.

use tracing::warn;

use filesender_common::protocol::{AuthAccepted, AuthDenied, AuthRequest, ServerInfo};

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the transport to open
    Connecting,
    /// Auth request sent, waiting for the answer
    Authenticating,
    /// The server accepted us
    Authenticated,
    /// The server refused us; the connection is being torn down
    Denied,
    /// The connection is gone
    Closed,
}

/// Authentication state for one connection
#[derive(Debug, Clone)]
pub struct Session {
    client_name: String,
    client_version: String,
    phase: SessionPhase,
    client_id: Option<i32>,
    server_info: Option<ServerInfo>,
    denial: Option<AuthDenied>,
}

impl Session {
    /// Create a session for a connection that has not opened yet
    pub fn new(client_name: impl Into<String>, client_version: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            client_version: client_version.into(),
            phase: SessionPhase::Connecting,
            client_id: None,
            server_info: None,
            denial: None,
        }
    }

    /// The transport opened: build the auth request and start waiting for the answer
    pub fn begin_authentication(&mut self) -> AuthRequest {
        self.phase = SessionPhase::Authenticating;
        AuthRequest {
            name: self.client_name.clone(),
            client_version: self.client_version.clone(),
        }
    }

    /// Apply an auth-accepted message
    ///
    /// Returns true if the session moved to `Authenticated`.
    pub fn accept(&mut self, accepted: &AuthAccepted) -> bool {
        if self.phase != SessionPhase::Authenticating {
            warn!(phase = ?self.phase, "ignoring auth-accepted outside authentication");
            return false;
        }

        self.phase = SessionPhase::Authenticated;
        self.client_id = Some(accepted.received_client_id);
        self.server_info = Some(accepted.server_info.clone());
        true
    }

    /// Apply an auth-denied message
    ///
    /// Returns true if the session moved to `Denied`.
    pub fn deny(&mut self, denied: &AuthDenied) -> bool {
        if self.phase != SessionPhase::Authenticating {
            warn!(phase = ?self.phase, "ignoring auth-denied outside authentication");
            return false;
        }

        self.phase = SessionPhase::Denied;
        if denied.server_info.is_some() {
            self.server_info = denied.server_info.clone();
        }
        self.denial = Some(denied.clone());
        true
    }

    /// The connection closed
    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn client_version(&self) -> &str {
        &self.client_version
    }

    /// Id assigned by the server, available once authenticated
    pub fn client_id(&self) -> Option<i32> {
        self.client_id
    }

    /// Last server descriptor received
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    /// The denial, if the server refused us
    pub fn denial(&self) -> Option<&AuthDenied> {
        self.denial.as_ref()
    }
}
