//! FileSender Common Library
//!
//! Wire types shared by everything that speaks the FileSender protocol.

pub mod framing;
pub mod io;
pub mod protocol;
pub mod validators;
pub mod version;

/// Version reported to servers in the authentication request
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default port for FileSender hosts
pub const DEFAULT_PORT: u16 = 8765;
