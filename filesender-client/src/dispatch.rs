//! Inbound control message decoding
//!
//! Turns the text of a WebSocket message into a typed [`InboundMessage`].
//! Nothing that arrives here can fail the connection: text that is not an
//! envelope, unknown discriminators and malformed payloads are logged and
//! dropped.

use tracing::{debug, warn};

use filesender_common::io::decode_inbound;
use filesender_common::protocol::{Envelope, InboundMessage};

/// Decode a control message, or `None` if there is nothing to act on
pub fn dispatch(raw: &str) -> Option<InboundMessage> {
    let envelope = match Envelope::parse(raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "dropping control message that is not an envelope");
            return None;
        }
    };

    match decode_inbound(&envelope) {
        Ok(Some(message)) => {
            debug!(kind = %envelope.class_name, payload = %envelope.payload, "received control message");
            Some(message)
        }
        Ok(None) => {
            debug!(kind = %envelope.class_name, "ignoring unknown control message");
            None
        }
        Err(e) => {
            warn!(kind = %envelope.class_name, error = %e, "dropping undecodable control message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filesender_common::io::encode_inbound;
    use filesender_common::protocol::{FileListUpdate, ServerInfo};

    #[test]
    fn test_dispatch_known_message() {
        let message = InboundMessage::FileListUpdate(FileListUpdate::default());
        let text = encode_inbound(&message).unwrap();
        assert_eq!(dispatch(&text), Some(message));
    }

    #[test]
    fn test_dispatch_not_json() {
        assert!(dispatch("hello").is_none());
        assert!(dispatch("").is_none());
    }

    #[test]
    fn test_dispatch_unknown_discriminator() {
        assert!(dispatch(r#"{"className":"unknown.msg","payload":"{}"}"#).is_none());
    }

    #[test]
    fn test_dispatch_malformed_payload() {
        // Known type, wrong shape: dropped, never partially applied
        assert!(dispatch(r#"{"className":"auth-accepted","payload":"{\"clientName\":5}"}"#).is_none());
    }

    #[test]
    fn test_dispatch_inline_object_payload() {
        let text = r#"{"className":"auth-accepted","payload":{"clientName":"a","receivedClientId":1,"serverInfo":{"serverName":"s"}}}"#;
        match dispatch(text) {
            Some(InboundMessage::AuthAccepted(accepted)) => {
                assert_eq!(accepted.received_client_id, 1);
                assert_eq!(
                    accepted.server_info,
                    ServerInfo {
                        server_name: "s".to_string(),
                        server_version: None
                    }
                );
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
