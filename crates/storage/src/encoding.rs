//! Shard log frame encoding and decoding
//!
//! A shard log is an 8-byte magic header followed by frames:
//!
//! ```text
//! [length: u32][tag: u8][payload: bytes][crc32: u32]
//! ```
//!
//! - **length**: size of tag + payload + crc (NOT including length itself)
//! - **tag**: 0x01 = Append (full VectorRecord row), 0x02 = Delete (logical-delete marker)
//! - **payload**: bincode-serialized row or marker
//! - **crc32**: CRC32 over \[tag\]\[payload\]
//!
//! A frame whose declared length runs past the end of the buffer is reported
//! as [`Frame::Incomplete`]. Only the caller knows whether that is a torn tail
//! write: it must check with [`next_valid_frame`] that nothing decodable
//! follows before cutting the log there. A declared length above
//! [`MAX_FRAME_BYTES`] is always corruption.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use shardvec_core::{StoreError, StoreResult, VectorRecord};

/// Magic bytes at the start of every shard log
pub const SHARD_LOG_MAGIC: &[u8; 8] = b"SVSHARD1";

/// Append frame tag
pub const TAG_APPEND: u8 = 0x01;
/// Logical-delete frame tag
pub const TAG_DELETE: u8 = 0x02;

/// Size of the length prefix
const LENGTH_BYTES: usize = 4;
/// Minimum frame body: tag(1) + crc(4)
const MIN_BODY: usize = 5;

/// Largest frame body accepted by the codec
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Logical-delete marker: flags the newest live row with `id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteMarker {
    /// Id whose newest live row is flagged
    pub id: String,
    /// Deletion time (microseconds since epoch)
    pub deleted_at: u64,
}

/// One entry of a shard log
#[derive(Debug, Clone, PartialEq)]
pub enum ShardEntry {
    /// A new physical row
    Append(VectorRecord),
    /// A logical delete
    Delete(DeleteMarker),
}

/// Result of decoding at a buffer position
#[derive(Debug)]
pub enum Frame {
    /// A complete, checksummed entry and the bytes it consumed
    Entry(ShardEntry, usize),
    /// The buffer ends before the frame does
    Incomplete,
}

/// Encode an entry to a frame ready for appending to the log
pub fn encode_entry(entry: &ShardEntry) -> StoreResult<Vec<u8>> {
    let (tag, payload) = match entry {
        ShardEntry::Append(record) => (TAG_APPEND, bincode::serialize(record)?),
        ShardEntry::Delete(marker) => (TAG_DELETE, bincode::serialize(marker)?),
    };

    let body_len = 1 + payload.len() + 4;
    if body_len > MAX_FRAME_BYTES {
        return Err(StoreError::Serialization(format!(
            "frame of {} bytes exceeds the {} byte limit",
            body_len, MAX_FRAME_BYTES
        )));
    }
    let mut buf = Vec::with_capacity(LENGTH_BYTES + body_len);
    buf.extend_from_slice(&(body_len as u32).to_le_bytes());
    buf.push(tag);
    buf.extend_from_slice(&payload);

    let mut hasher = Hasher::new();
    hasher.update(&[tag]);
    hasher.update(&payload);
    buf.extend_from_slice(&hasher.finalize().to_le_bytes());

    Ok(buf)
}

/// Decode one frame from the start of `buf`.
///
/// `shard` and `offset` are only used for error reporting.
///
/// # Errors
///
/// `StoreError::Corruption` when the length is impossible, the CRC does not
/// match, the tag is unknown or the payload does not deserialize.
pub fn decode_entry(buf: &[u8], shard: u32, offset: u64) -> StoreResult<Frame> {
    let corruption = |reason: String| StoreError::Corruption {
        shard,
        offset,
        reason,
    };

    let Some(len_bytes) = buf.get(..LENGTH_BYTES) else {
        return Ok(Frame::Incomplete);
    };
    let mut len_arr = [0u8; LENGTH_BYTES];
    len_arr.copy_from_slice(len_bytes);
    let body_len = u32::from_le_bytes(len_arr) as usize;

    if body_len < MIN_BODY {
        return Err(corruption(format!(
            "invalid frame length {} (minimum is {})",
            body_len, MIN_BODY
        )));
    }
    if body_len > MAX_FRAME_BYTES {
        return Err(corruption(format!(
            "invalid frame length {} (maximum is {})",
            body_len, MAX_FRAME_BYTES
        )));
    }

    let Some(body) = buf.get(LENGTH_BYTES..LENGTH_BYTES + body_len) else {
        return Ok(Frame::Incomplete);
    };

    let tag = body[0];
    let payload = &body[1..body_len - 4];
    let mut crc_arr = [0u8; 4];
    crc_arr.copy_from_slice(&body[body_len - 4..]);
    let expected_crc = u32::from_le_bytes(crc_arr);

    let mut hasher = Hasher::new();
    hasher.update(&[tag]);
    hasher.update(payload);
    let actual_crc = hasher.finalize();
    if actual_crc != expected_crc {
        return Err(corruption(format!(
            "CRC mismatch: expected {:08x}, got {:08x}",
            expected_crc, actual_crc
        )));
    }

    let entry = match tag {
        TAG_APPEND => ShardEntry::Append(
            bincode::deserialize(payload)
                .map_err(|e| corruption(format!("bad append payload: {}", e)))?,
        ),
        TAG_DELETE => ShardEntry::Delete(
            bincode::deserialize(payload)
                .map_err(|e| corruption(format!("bad delete payload: {}", e)))?,
        ),
        other => return Err(corruption(format!("unknown frame tag 0x{:02x}", other))),
    };

    Ok(Frame::Entry(entry, LENGTH_BYTES + body_len))
}

/// Offset of the first position after `buf[0]` where a complete,
/// checksummed frame decodes.
///
/// Used to tell a torn tail (nothing valid after it) from a damaged length
/// prefix in the middle of the log.
pub fn next_valid_frame(buf: &[u8]) -> Option<usize> {
    (1..buf.len()).find(|&start| {
        matches!(
            decode_entry(&buf[start..], 0, 0),
            Ok(Frame::Entry(..))
        )
    })
}
