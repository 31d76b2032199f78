//! Opening the WebSocket connection

use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tracing::{debug, info};

use super::constants::CONNECTION_TIMEOUT;
use super::types::WsStream;
use crate::transport::TransportError;

/// Connect to a host at `url` (`ws://` or `wss://`)
///
/// # Errors
///
/// Returns [`TransportError::Timeout`] if the handshake does not finish within
/// the connection timeout, or [`TransportError::WebSocket`] if it fails.
pub async fn connect_to_server(url: &str) -> Result<WsStream, TransportError> {
    debug!(url, "connecting");
    let (stream, response) = timeout(CONNECTION_TIMEOUT, connect_async(url))
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(|e| TransportError::WebSocket(e.to_string()))?;

    info!(url, status = %response.status(), "connected");
    Ok(stream)
}
