//! Binary chunk-frame format
//!
//! File content travels as binary WebSocket messages, one chunk per message:
//!
//! ```text
//! bytes 0..4    transfer handle id   (i32, little-endian)
//! bytes 4..12   chunk index          (i64, little-endian)
//! bytes 12..    chunk payload
//! ```
//!
//! Any input of at least the 12-byte header decodes, so a header-only frame is
//! an empty chunk. Hosts only send one for an empty file; the receiving side
//! fails a transfer that gets an empty chunk where it expects data.
//!
//! The client only ever decodes these frames; encoding exists for peers and tests.

mod chunk;
mod error;

pub use chunk::{ChunkFrame, decode, encode};
pub use error::FrameError;

/// Size of the transfer handle id field
pub const TRANSFER_ID_LENGTH: usize = 4;

/// Size of the chunk index field
pub const CHUNK_INDEX_LENGTH: usize = 8;

/// Total header size preceding the payload
pub const HEADER_LENGTH: usize = TRANSFER_ID_LENGTH + CHUNK_INDEX_LENGTH;
