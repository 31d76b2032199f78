//! Chunk frame encoding and decoding

use super::error::FrameError;
use super::{CHUNK_INDEX_LENGTH, HEADER_LENGTH, TRANSFER_ID_LENGTH};

/// A decoded chunk frame
///
/// The payload borrows from the buffer that was decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkFrame<'a> {
    /// Transfer handle id the chunk belongs to
    pub transfer_id: i32,
    /// Position of the chunk within the file, in chunk-size units
    pub chunk_index: i64,
    /// Chunk bytes
    pub payload: &'a [u8],
}

/// Decode a binary chunk frame
///
/// # Errors
///
/// Returns [`FrameError::TooShort`] if `bytes` is shorter than the 12-byte header.
pub fn decode(bytes: &[u8]) -> Result<ChunkFrame<'_>, FrameError> {
    if bytes.len() < HEADER_LENGTH {
        return Err(FrameError::TooShort {
            actual: bytes.len(),
            required: HEADER_LENGTH,
        });
    }

    let (id_bytes, rest) = bytes.split_at(TRANSFER_ID_LENGTH);
    let (index_bytes, payload) = rest.split_at(CHUNK_INDEX_LENGTH);

    let mut id = [0u8; TRANSFER_ID_LENGTH];
    id.copy_from_slice(id_bytes);
    let mut index = [0u8; CHUNK_INDEX_LENGTH];
    index.copy_from_slice(index_bytes);

    Ok(ChunkFrame {
        transfer_id: i32::from_le_bytes(id),
        chunk_index: i64::from_le_bytes(index),
        payload,
    })
}

/// Encode a binary chunk frame
#[must_use]
pub fn encode(transfer_id: i32, chunk_index: i64, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LENGTH + payload.len());
    bytes.extend_from_slice(&transfer_id.to_le_bytes());
    bytes.extend_from_slice(&chunk_index.to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_header_fields() {
        let mut bytes = vec![0x2A, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&[0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(b"hello");

        let frame = decode(&bytes).unwrap();
        assert_eq!(frame.transfer_id, 42);
        assert_eq!(frame.chunk_index, 7);
        assert_eq!(frame.payload, b"hello");
    }

    #[test]
    fn test_decode_is_little_endian() {
        let mut bytes = vec![0x01, 0x02, 0x03, 0x04];
        bytes.extend_from_slice(&[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        bytes.push(0xFF);

        let frame = decode(&bytes).unwrap();
        assert_eq!(frame.transfer_id, 0x0403_0201);
        assert_eq!(frame.chunk_index, 0x0102_0304_0506_0708);
        assert_eq!(frame.payload, &[0xFF]);
    }

    #[test]
    fn test_decode_negative_values() {
        let bytes = encode(-1, -2, b"x");
        let frame = decode(&bytes).unwrap();
        assert_eq!(frame.transfer_id, -1);
        assert_eq!(frame.chunk_index, -2);
    }

    #[test]
    fn test_decode_too_short() {
        for len in 0..HEADER_LENGTH {
            let bytes = vec![0u8; len];
            assert_eq!(
                decode(&bytes),
                Err(FrameError::TooShort {
                    actual: len,
                    required: HEADER_LENGTH
                })
            );
        }
    }

    #[test]
    fn test_decode_header_only() {
        // Exactly the header: valid frame with an empty payload
        let bytes = encode(5, 0, &[]);
        assert_eq!(bytes.len(), HEADER_LENGTH);

        let frame = decode(&bytes).unwrap();
        assert_eq!(frame.transfer_id, 5);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_encode_layout() {
        let bytes = encode(1, 2, b"ab");
        assert_eq!(
            bytes,
            vec![1, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, b'a', b'b']
        );
    }

    #[test]
    fn test_too_short_error_message() {
        let err = decode(&[0u8; 3]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "binary frame too short: 3 bytes (need at least 12)"
        );
    }
}
