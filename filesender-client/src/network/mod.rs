//! WebSocket connection to a host

mod connect;
mod constants;
mod stream;
mod types;

pub use connect::connect_to_server;
pub use stream::{run, run_session};
pub use types::{ClientCommand, CommandReceiver, CommandSender, ConnectionHandle, Outgoing, WsStream};
