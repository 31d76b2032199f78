//! Connection tasks
//!
//! Each connection runs two tasks:
//! - a writer task that owns the sending half of the WebSocket and drains the
//!   outgoing queue
//! - the delivery loop, which owns the [`Client`] and feeds it inbound
//!   messages, application commands and stall sweeps one at a time
//!
//! Because only the delivery loop touches the client, nothing in it needs a
//! lock.

use std::time::Instant;

use futures_util::stream::SplitSink;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, trace, warn};

use crate::client::{Client, ClientHandler, ClientSettings};
use crate::constants::STALL_SWEEP_INTERVAL;
use crate::transport::{Transport, TransportError};

use super::connect::connect_to_server;
use super::constants::{ABNORMAL_CLOSE_CODE, NO_STATUS_CODE};
use super::types::{ClientCommand, CommandReceiver, ConnectionHandle, Outgoing};

/// Connect to `url` and run the session until the connection closes
///
/// Returns the handler once the connection is gone.
///
/// # Errors
///
/// Returns an error if the connection could not be established. Failures after
/// that are reported through the handler.
pub async fn run<H: ClientHandler>(
    url: &str,
    settings: ClientSettings,
    handler: H,
    commands: CommandReceiver,
) -> Result<H, TransportError> {
    let ws = connect_to_server(url).await?;
    Ok(run_session(ws, settings, handler, commands).await)
}

/// Run a session over an established WebSocket until it closes
pub async fn run_session<S, H>(
    ws: S,
    settings: ClientSettings,
    handler: H,
    mut commands: CommandReceiver,
) -> H
where
    S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin + Send + 'static,
    H: ClientHandler,
{
    let (sink, mut stream) = ws.split();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(run_writer(sink, out_rx));

    let mut client = Client::new(settings, ConnectionHandle::new(out_tx), handler);
    client.on_open();

    let mut sweep = tokio::time::interval(STALL_SWEEP_INTERVAL);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut commands_open = true;

    let (code, reason) = loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => client.on_text_message(text.as_str()).await,
                Some(Ok(Message::Binary(bytes))) => client.on_binary_message(&bytes).await,
                Some(Ok(Message::Close(frame))) => {
                    break frame
                        .map(|f| (u16::from(f.code), f.reason.as_str().to_string()))
                        .unwrap_or((NO_STATUS_CODE, String::new()));
                }
                Some(Ok(other)) => trace!(kind = ?other, "ignoring websocket control message"),
                Some(Err(e)) => {
                    let reason = e.to_string();
                    client.on_error(TransportError::WebSocket(reason.clone()));
                    break (ABNORMAL_CLOSE_CODE, reason);
                }
                None => break (ABNORMAL_CLOSE_CODE, String::new()),
            },
            command = commands.recv(), if commands_open => match command {
                Some(command) => handle_command(&mut client, command),
                None => {
                    debug!("command channel closed");
                    commands_open = false;
                }
            },
            _ = sweep.tick() => {
                client.sweep_stalled_transfers(Instant::now());
            }
        }
    };

    let remote = !client.transport().is_closed();
    client.on_close(code, &reason, remote);

    // Dropping the client drops the outgoing queue, which stops the writer
    let handler = client.into_handler();
    if let Err(e) = writer.await {
        warn!(error = %e, "writer task failed");
    }
    handler
}

fn handle_command<T: Transport, H: ClientHandler>(client: &mut Client<T, H>, command: ClientCommand) {
    let result = match command {
        ClientCommand::RequestFileList => client.request_file_list_update(),
        ClientCommand::Download(file_id) => client.download_file(file_id),
        ClientCommand::Close => {
            client.close();
            Ok(())
        }
    };

    if let Err(e) = result {
        warn!(command = ?command, error = %e, "command failed");
    }
}

/// Writer task - sends queued messages to the host
///
/// Stops after sending a close, when a send fails, or when the queue's sender
/// is dropped. The sink is closed on the way out so a pending close reply is
/// flushed.
async fn run_writer<S>(mut sink: SplitSink<S, Message>, mut rx: mpsc::UnboundedReceiver<Outgoing>)
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    while let Some(outgoing) = rx.recv().await {
        let message = match outgoing {
            Outgoing::Text(text) => Message::Text(text.into()),
            Outgoing::Binary(bytes) => Message::Binary(bytes.into()),
            Outgoing::Close => break,
        };

        if let Err(e) = sink.send(message).await {
            warn!(error = %e, "send failed");
            return;
        }
    }

    if let Err(e) = sink.close().await {
        debug!(error = %e, "close failed");
    }
}
