//! Conversion between control messages and their wire text
//!
//! Decoding happens in two stages. The text is first parsed into a generic
//! [`Envelope`], then the discriminator is looked up in a static table of
//! decoders that turn the payload into a concrete message. Discriminators that
//! are not in the table decode to `None` so that new server message types do
//! not break older clients.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::protocol::{Envelope, InboundMessage, OutboundMessage};

// =============================================================================
// Discriminators
// =============================================================================

pub const AUTH_REQUEST: &str = "auth-request";
pub const AUTH_ACCEPTED: &str = "auth-accepted";
pub const AUTH_DENIED: &str = "auth-denied";
pub const FILE_SHARE_REQUEST: &str = "file-share-request";
pub const FILE_SHARE_ACCEPT: &str = "file-share-accept";
pub const FILE_SHARE_DENIED: &str = "file-share-denied";
pub const FILE_LIST_UPDATE: &str = "file-list-update";
pub const REQUEST_FILE_DOWNLOAD: &str = "request-file-download";
pub const REQUEST_FILE_LIST_UPDATE: &str = "request-file-list-update";

// =============================================================================
// Errors
// =============================================================================

/// Errors converting control messages to or from wire text
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The text is not an envelope
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),

    /// The envelope names a known type but its payload does not match it
    #[error("invalid payload for '{discriminator}': {source}")]
    InvalidPayload {
        discriminator: String,
        #[source]
        source: serde_json::Error,
    },

    /// A message could not be serialized
    #[error("failed to encode '{discriminator}': {source}")]
    Encode {
        discriminator: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

// =============================================================================
// Envelope Helpers
// =============================================================================

impl Envelope {
    /// Wrap a payload under the given discriminator
    ///
    /// The payload is serialized to a JSON string and stored as a string value.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if the payload cannot be serialized.
    pub fn wrap<T: Serialize>(
        discriminator: &'static str,
        payload: &T,
    ) -> Result<Self, ProtocolError> {
        let text = serde_json::to_string(payload).map_err(|source| ProtocolError::Encode {
            discriminator,
            source,
        })?;

        Ok(Self {
            class_name: discriminator.to_string(),
            payload: serde_json::Value::String(text),
        })
    }

    /// Parse wire text into an envelope without looking at the payload
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidEnvelope`] if the text is not an envelope.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::InvalidEnvelope)
    }

    /// Decode the payload as `T`
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidPayload`] if the payload does not match `T`.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        let result = match &self.payload {
            serde_json::Value::String(text) => serde_json::from_str(text),
            other => serde_json::from_value(other.clone()),
        };

        result.map_err(|source| ProtocolError::InvalidPayload {
            discriminator: self.class_name.clone(),
            source,
        })
    }

    /// Serialize the envelope to wire text
    #[must_use]
    pub fn to_text(&self) -> String {
        // An envelope holds only a string and a JSON value, which always serialize
        serde_json::to_string(self).unwrap_or_default()
    }
}

// =============================================================================
// Decoder Registry
// =============================================================================

type Decoder<M> = fn(&Envelope) -> Result<M, ProtocolError>;

fn auth_accepted(e: &Envelope) -> Result<InboundMessage, ProtocolError> {
    e.decode_payload().map(InboundMessage::AuthAccepted)
}

fn auth_denied(e: &Envelope) -> Result<InboundMessage, ProtocolError> {
    e.decode_payload().map(InboundMessage::AuthDenied)
}

fn file_share_request(e: &Envelope) -> Result<InboundMessage, ProtocolError> {
    e.decode_payload().map(InboundMessage::FileShareRequest)
}

fn file_list_update(e: &Envelope) -> Result<InboundMessage, ProtocolError> {
    e.decode_payload().map(InboundMessage::FileListUpdate)
}

fn auth_request(e: &Envelope) -> Result<OutboundMessage, ProtocolError> {
    e.decode_payload().map(OutboundMessage::AuthRequest)
}

fn file_share_accept(e: &Envelope) -> Result<OutboundMessage, ProtocolError> {
    e.decode_payload().map(OutboundMessage::FileShareAccept)
}

fn file_share_denied(e: &Envelope) -> Result<OutboundMessage, ProtocolError> {
    e.decode_payload().map(OutboundMessage::FileShareDenied)
}

fn request_file_download(e: &Envelope) -> Result<OutboundMessage, ProtocolError> {
    e.decode_payload().map(OutboundMessage::RequestFileDownload)
}

fn request_file_list_update(e: &Envelope) -> Result<OutboundMessage, ProtocolError> {
    e.decode_payload().map(OutboundMessage::RequestFileListUpdate)
}

/// Known server message types and how to decode each one
const INBOUND_DECODERS: &[(&str, Decoder<InboundMessage>)] = &[
    (AUTH_ACCEPTED, auth_accepted),
    (AUTH_DENIED, auth_denied),
    (FILE_SHARE_REQUEST, file_share_request),
    (FILE_LIST_UPDATE, file_list_update),
];

/// Known client message types and how to decode each one
const OUTBOUND_DECODERS: &[(&str, Decoder<OutboundMessage>)] = &[
    (AUTH_REQUEST, auth_request),
    (FILE_SHARE_ACCEPT, file_share_accept),
    (FILE_SHARE_DENIED, file_share_denied),
    (REQUEST_FILE_DOWNLOAD, request_file_download),
    (REQUEST_FILE_LIST_UPDATE, request_file_list_update),
];

fn lookup<M>(table: &[(&str, Decoder<M>)], discriminator: &str) -> Option<Decoder<M>> {
    table
        .iter()
        .find(|(name, _)| *name == discriminator)
        .map(|(_, decoder)| *decoder)
}

/// Returns true if the discriminator names a server message this client understands
#[must_use]
pub fn is_known_inbound(discriminator: &str) -> bool {
    lookup(INBOUND_DECODERS, discriminator).is_some()
}

/// Decode an envelope into a server message
///
/// Returns `Ok(None)` for discriminators this client does not know.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidPayload`] if the type is known but the payload is malformed.
pub fn decode_inbound(envelope: &Envelope) -> Result<Option<InboundMessage>, ProtocolError> {
    match lookup(INBOUND_DECODERS, &envelope.class_name) {
        Some(decoder) => decoder(envelope).map(Some),
        None => Ok(None),
    }
}

/// Decode an envelope into a client message
///
/// Used by peers and tests that observe what a client sends.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidPayload`] if the type is known but the payload is malformed.
pub fn decode_outbound(envelope: &Envelope) -> Result<Option<OutboundMessage>, ProtocolError> {
    match lookup(OUTBOUND_DECODERS, &envelope.class_name) {
        Some(decoder) => decoder(envelope).map(Some),
        None => Ok(None),
    }
}

// =============================================================================
// Message Encoding
// =============================================================================

/// Get the discriminator for a server message
#[must_use]
pub fn inbound_message_type(message: &InboundMessage) -> &'static str {
    match message {
        InboundMessage::AuthAccepted(_) => AUTH_ACCEPTED,
        InboundMessage::AuthDenied(_) => AUTH_DENIED,
        InboundMessage::FileShareRequest(_) => FILE_SHARE_REQUEST,
        InboundMessage::FileListUpdate(_) => FILE_LIST_UPDATE,
    }
}

/// Get the discriminator for a client message
#[must_use]
pub fn outbound_message_type(message: &OutboundMessage) -> &'static str {
    match message {
        OutboundMessage::AuthRequest(_) => AUTH_REQUEST,
        OutboundMessage::FileShareAccept(_) => FILE_SHARE_ACCEPT,
        OutboundMessage::FileShareDenied(_) => FILE_SHARE_DENIED,
        OutboundMessage::RequestFileDownload(_) => REQUEST_FILE_DOWNLOAD,
        OutboundMessage::RequestFileListUpdate(_) => REQUEST_FILE_LIST_UPDATE,
    }
}

/// Encode a client message as wire text
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if the payload cannot be serialized.
pub fn encode_outbound(message: &OutboundMessage) -> Result<String, ProtocolError> {
    let discriminator = outbound_message_type(message);
    let envelope = match message {
        OutboundMessage::AuthRequest(p) => Envelope::wrap(discriminator, p),
        OutboundMessage::FileShareAccept(p) => Envelope::wrap(discriminator, p),
        OutboundMessage::FileShareDenied(p) => Envelope::wrap(discriminator, p),
        OutboundMessage::RequestFileDownload(p) => Envelope::wrap(discriminator, p),
        OutboundMessage::RequestFileListUpdate(p) => Envelope::wrap(discriminator, p),
    }?;
    Ok(envelope.to_text())
}

/// Encode a server message as wire text
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if the payload cannot be serialized.
pub fn encode_inbound(message: &InboundMessage) -> Result<String, ProtocolError> {
    let discriminator = inbound_message_type(message);
    let envelope = match message {
        InboundMessage::AuthAccepted(p) => Envelope::wrap(discriminator, p),
        InboundMessage::AuthDenied(p) => Envelope::wrap(discriminator, p),
        InboundMessage::FileShareRequest(p) => Envelope::wrap(discriminator, p),
        InboundMessage::FileListUpdate(p) => Envelope::wrap(discriminator, p),
    }?;
    Ok(envelope.to_text())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        AuthAccepted, AuthRequest, FailReason, FileShareDenied, FileShareRequest, ServerInfo,
    };

    #[test]
    fn test_envelope_wire_shape() {
        let text = encode_outbound(&OutboundMessage::AuthRequest(AuthRequest {
            name: "alice".to_string(),
            client_version: "0.3.2".to_string(),
        }))
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["className"], "auth-request");
        // Payload travels as a JSON document inside a string
        let payload = value["payload"].as_str().unwrap();
        let inner: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(inner["name"], "alice");
        assert_eq!(inner["clientVersion"], "0.3.2");
    }

    #[test]
    fn test_decode_inbound_string_payload() {
        let message = InboundMessage::AuthAccepted(AuthAccepted {
            client_name: "alice".to_string(),
            received_client_id: 12,
            server_info: ServerInfo {
                server_name: "home".to_string(),
                server_version: None,
            },
        });
        let text = encode_inbound(&message).unwrap();

        let envelope = Envelope::parse(&text).unwrap();
        assert_eq!(decode_inbound(&envelope).unwrap(), Some(message));
    }

    #[test]
    fn test_decode_inbound_object_payload() {
        let text = r#"{"className":"auth-denied","payload":{"code":2,"message":"full"}}"#;
        let envelope = Envelope::parse(text).unwrap();

        match decode_inbound(&envelope).unwrap() {
            Some(InboundMessage::AuthDenied(denied)) => {
                assert_eq!(denied.code, 2);
                assert_eq!(denied.message, "full");
                assert!(denied.server_info.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_discriminator_is_none() {
        let text = r#"{"className":"unknown.msg","payload":"{\"anything\":1}"}"#;
        let envelope = Envelope::parse(text).unwrap();
        assert!(decode_inbound(&envelope).unwrap().is_none());
        assert!(!is_known_inbound("unknown.msg"));
    }

    #[test]
    fn test_outbound_discriminator_not_inbound() {
        // A client message type arriving from the server is not acted on
        let text = encode_outbound(&OutboundMessage::FileShareDenied(FileShareDenied {
            file_handle_id: 1,
            reason: FailReason::ClientDenied,
        }))
        .unwrap();
        let envelope = Envelope::parse(&text).unwrap();
        assert!(decode_inbound(&envelope).unwrap().is_none());
    }

    #[test]
    fn test_invalid_payload() {
        let text = r#"{"className":"file-share-request","payload":"{\"fileHandleId\":\"nope\"}"}"#;
        let envelope = Envelope::parse(text).unwrap();
        let err = decode_inbound(&envelope).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidPayload { .. }));
        assert!(err.to_string().contains("file-share-request"));
    }

    #[test]
    fn test_payload_string_not_json() {
        let text = r#"{"className":"auth-accepted","payload":"not json"}"#;
        let envelope = Envelope::parse(text).unwrap();
        assert!(decode_inbound(&envelope).is_err());
    }

    #[test]
    fn test_invalid_envelope() {
        assert!(matches!(
            Envelope::parse("{not valid}"),
            Err(ProtocolError::InvalidEnvelope(_))
        ));
        assert!(matches!(
            Envelope::parse(r#"{"payload":"{}"}"#),
            Err(ProtocolError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_decode_outbound() {
        let text = encode_outbound(&OutboundMessage::FileShareDenied(FileShareDenied {
            file_handle_id: 42,
            reason: FailReason::ClientDenied,
        }))
        .unwrap();
        let envelope = Envelope::parse(&text).unwrap();

        assert_eq!(
            decode_outbound(&envelope).unwrap(),
            Some(OutboundMessage::FileShareDenied(FileShareDenied {
                file_handle_id: 42,
                reason: FailReason::ClientDenied,
            }))
        );
    }

    #[test]
    fn test_message_type_names() {
        assert_eq!(
            inbound_message_type(&InboundMessage::FileShareRequest(FileShareRequest {
                file_id: 1,
                file_handle_id: 2,
                file_name: "a".to_string(),
                file_size: 0,
                chunk_size: 1,
                chunk_count: 0,
            })),
            "file-share-request"
        );
        assert_eq!(
            outbound_message_type(&OutboundMessage::RequestFileListUpdate(Default::default())),
            "request-file-list-update"
        );
    }

    #[test]
    fn test_every_inbound_discriminator_registered() {
        for name in [AUTH_ACCEPTED, AUTH_DENIED, FILE_SHARE_REQUEST, FILE_LIST_UPDATE] {
            assert!(is_known_inbound(name), "{} not registered", name);
        }
    }
}
