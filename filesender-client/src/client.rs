//! Client core
//!
//! [`Client`] ties the session, the catalog and the transfer registry to one
//! connection. It never reads from the network itself: whoever owns the
//! connection calls the `on_*` methods as events arrive, one at a time, and
//! the client answers through its [`Transport`].

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use filesender_common::CLIENT_VERSION;
use filesender_common::framing;
use filesender_common::io::encode_outbound;
use filesender_common::protocol::{
    AuthAccepted, AuthDenied, FailReason, FileShareAccept, FileShareDenied, FileShareRequest,
    InboundMessage, OutboundMessage, RequestFileDownload, RequestFileListUpdate,
};

use crate::catalog::{Catalog, FileList};
use crate::constants::DEFAULT_CLIENT_NAME;
use crate::dispatch::dispatch;
use crate::error::ClientError;
use crate::session::Session;
use crate::transfers::{ShareDecision, TransferRegistry, TransferSettings};
use crate::transport::{Transport, TransportError};

/// Application callbacks
///
/// All callbacks run on the connection's delivery loop, so a slow callback
/// delays every later message on the connection.
pub trait ClientHandler {
    /// Decide whether to receive a file the host offers
    fn review_file_request(&mut self, request: &FileShareRequest) -> ShareDecision;

    /// The host accepted our auth request
    fn on_login(&mut self, accepted: &AuthAccepted);

    /// The host refused our auth request; the connection closes next
    fn on_login_failed(&mut self, denied: &AuthDenied);

    /// The catalog was replaced
    fn on_file_list_update(&mut self, files: &Arc<FileList>);

    /// The connection closed
    fn on_close(&mut self, _code: u16, _reason: &str, _remote: bool) {}

    /// The connection failed
    fn on_error(&mut self, _error: &ClientError) {}
}

/// Settings for one client connection
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Display name sent in the auth request
    pub client_name: String,
    /// Version sent in the auth request
    pub client_version: String,
    pub transfers: TransferSettings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            client_version: CLIENT_VERSION.to_string(),
            transfers: TransferSettings::default(),
        }
    }
}

/// Protocol state for one connection
pub struct Client<T: Transport, H: ClientHandler> {
    session: Session,
    catalog: Catalog,
    transfers: TransferRegistry,
    transport: T,
    handler: H,
}

impl<T: Transport, H: ClientHandler> Client<T, H> {
    pub fn new(settings: ClientSettings, transport: T, handler: H) -> Self {
        Self {
            session: Session::new(settings.client_name, settings.client_version),
            catalog: Catalog::new(),
            transfers: TransferRegistry::new(settings.transfers),
            transport,
            handler,
        }
    }

    // =========================================================================
    // Connection events
    // =========================================================================

    /// The transport opened: authenticate
    pub fn on_open(&mut self) {
        let request = self.session.begin_authentication();
        info!(name = %request.name, version = %request.client_version, "authenticating");

        if let Err(e) = self.send(OutboundMessage::AuthRequest(request)) {
            error!(error = %e, "could not send auth request");
            self.handler.on_error(&e);
        }
    }

    /// A text message arrived
    pub async fn on_text_message(&mut self, text: &str) {
        if let Some(message) = dispatch(text) {
            self.handle_message(message).await;
        }
    }

    /// A binary message arrived
    ///
    /// A frame too short to carry a header means the stream is corrupt: the
    /// error is reported, the connection is closed and active transfers are
    /// abandoned.
    pub async fn on_binary_message(&mut self, bytes: &[u8]) {
        match framing::decode(bytes) {
            Ok(frame) => {
                self.transfers.on_chunk(frame).await;
            }
            Err(e) => {
                error!(error = %e, "corrupt binary frame, closing connection");
                let err = ClientError::CorruptFrame(e);
                self.handler.on_error(&err);
                self.close();
                self.transfers.abandon_all();
            }
        }
    }

    /// The connection closed
    ///
    /// `remote` is true when the host closed it.
    pub fn on_close(&mut self, code: u16, reason: &str, remote: bool) {
        let abandoned = self.transfers.abandon_all();
        self.session.close();
        info!(code, reason, remote, abandoned, "connection closed");
        self.handler.on_close(code, reason, remote);
    }

    /// The transport failed
    pub fn on_error(&mut self, error: TransportError) {
        warn!(error = %error, "connection error");
        let abandoned = self.transfers.abandon_all();
        if abandoned > 0 {
            debug!(abandoned, "transfers abandoned after connection error");
        }
        self.handler.on_error(&ClientError::Transport(error));
    }

    // =========================================================================
    // Control messages
    // =========================================================================

    async fn handle_message(&mut self, message: InboundMessage) {
        match message {
            InboundMessage::AuthAccepted(accepted) => self.handle_auth_accepted(&accepted),
            InboundMessage::AuthDenied(denied) => self.handle_auth_denied(&denied),
            InboundMessage::FileShareRequest(request) => {
                self.handle_share_request(&request).await;
            }
            InboundMessage::FileListUpdate(update) => {
                let snapshot = self.catalog.apply_update(update.files);
                self.handler.on_file_list_update(&snapshot);
            }
        }
    }

    fn handle_auth_accepted(&mut self, accepted: &AuthAccepted) {
        if !self.session.accept(accepted) {
            return;
        }
        info!(
            client_id = accepted.received_client_id,
            server = %accepted.server_info.server_name,
            "logged in"
        );
        self.handler.on_login(accepted);
    }

    fn handle_auth_denied(&mut self, denied: &AuthDenied) {
        if !self.session.deny(denied) {
            return;
        }
        warn!(code = denied.code, message = %denied.message, "login denied");
        self.handler.on_login_failed(denied);
        self.close();
    }

    async fn handle_share_request(&mut self, request: &FileShareRequest) {
        let handle_id = request.file_handle_id;
        if self.transport.is_closed() {
            debug!(handle_id, "ignoring file offer on a closed connection");
            return;
        }
        info!(
            handle_id,
            file_id = request.file_id,
            file = %request.file_name,
            size = request.file_size,
            "file offered"
        );

        let reason = match self.handler.review_file_request(request) {
            ShareDecision::Accept(accepted) => match self.transfers.open(request, accepted).await {
                Ok(path) => {
                    debug!(handle_id, path = %path.display(), "receiving file");
                    let reply = OutboundMessage::FileShareAccept(FileShareAccept {
                        file_handle_id: handle_id,
                    });
                    if let Err(e) = self.send(reply) {
                        warn!(handle_id, error = %e, "could not accept file offer");
                        self.transfers.cancel(handle_id).await;
                    }
                    return;
                }
                Err(e) => {
                    warn!(handle_id, error = %e, "could not set up download");
                    FailReason::ClientDenied
                }
            },
            ShareDecision::Deny(reason) => reason,
        };

        info!(handle_id, reason = ?reason, "declining file");
        if let Err(e) = self.send(deny_message(handle_id, reason)) {
            warn!(handle_id, error = %e, "could not decline file offer");
        }
    }

    // =========================================================================
    // Application requests
    // =========================================================================

    /// Ask the host to send a file from the catalog
    ///
    /// The host answers with a file share request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be sent.
    pub fn download_file(&mut self, file_id: i32) -> Result<(), ClientError> {
        if !self.catalog.contains(file_id) {
            debug!(file_id, "requesting a file that is not in the catalog");
        }
        self.send(OutboundMessage::RequestFileDownload(RequestFileDownload {
            file_id,
        }))
    }

    /// Ask the host to resend its file list
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be sent.
    pub fn request_file_list_update(&mut self) -> Result<(), ClientError> {
        self.send(OutboundMessage::RequestFileListUpdate(
            RequestFileListUpdate {},
        ))
    }

    /// Close the connection
    ///
    /// Transfers are abandoned when the close completes (`on_close`).
    pub fn close(&mut self) {
        if !self.transport.is_closed() {
            debug!("closing connection");
            self.transport.close();
        }
    }

    /// Fail transfers that have gone quiet for longer than the stall timeout
    pub fn sweep_stalled_transfers(&mut self, now: Instant) -> usize {
        self.transfers.sweep_stalled(now)
    }

    fn send(&mut self, message: OutboundMessage) -> Result<(), ClientError> {
        let text = encode_outbound(&message)?;
        debug!(message = %text, "sending control message");
        self.transport.send_text(text)?;
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn transfers(&self) -> &TransferRegistry {
        &self.transfers
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Give back the handler once the connection is done
    pub fn into_handler(self) -> H {
        self.handler
    }
}

fn deny_message(file_handle_id: i32, reason: FailReason) -> OutboundMessage {
    OutboundMessage::FileShareDenied(FileShareDenied {
        file_handle_id,
        reason,
    })
}
