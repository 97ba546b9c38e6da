//! Shard log corruption utilities
//!
//! Simulates the on-disk damage a shard must survive or report:
//!
//! - Truncation: removes bytes from the log tail (crash during a write)
//! - Garbage / partial frame: appends bytes that do not form a full frame
//! - Bit rot: flips a byte inside an existing frame
//! - Bad header: overwrites the magic header
//!
//! # Example
//!
//! ```ignore
//! use shardvec_storage::testing::ShardLogTester;
//!
//! let tester = ShardLogTester::new(layout.shard_log(&address));
//! tester.flip_byte(20)?;
//! // Opening the shard now fails with StoreError::Corruption
//! ```

use crate::encoding::SHARD_LOG_MAGIC;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Corruption helper bound to one shard log file
#[derive(Debug, Clone)]
pub struct ShardLogTester {
    path: PathBuf,
}

/// Result of a truncation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncationResult {
    /// Size before truncation
    pub original_size: u64,
    /// Size after truncation
    pub new_size: u64,
}

impl ShardLogTester {
    /// Tester for the shard log at `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        ShardLogTester {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Shard log path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current log size in bytes
    pub fn len(&self) -> std::io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    /// Whether the log holds nothing but its header
    pub fn is_empty(&self) -> std::io::Result<bool> {
        Ok(self.len()? <= SHARD_LOG_MAGIC.len() as u64)
    }

    /// Remove `bytes` from the end of the log, never cutting into the header
    pub fn truncate_tail(&self, bytes: u64) -> std::io::Result<TruncationResult> {
        let original_size = self.len()?;
        let floor = SHARD_LOG_MAGIC.len() as u64;
        let new_size = original_size.saturating_sub(bytes).max(floor);

        let file = OpenOptions::new().write(true).open(&self.path)?;
        file.set_len(new_size)?;

        Ok(TruncationResult {
            original_size,
            new_size,
        })
    }

    /// Append raw bytes to the log tail
    pub fn append_garbage(&self, garbage: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(garbage)
    }

    /// Append the first bytes of a frame whose declared length runs past EOF
    pub fn create_partial_frame(&self) -> std::io::Result<()> {
        let partial = [
            0x40, 0x00, 0x00, 0x00, // length: 64 bytes
            0x01, // append tag
            0x00, 0x00, 0x00, // first payload bytes, rest missing
        ];
        self.append_garbage(&partial)
    }

    /// XOR the byte at `offset` with 0xFF
    pub fn flip_byte(&self, offset: usize) -> std::io::Result<()> {
        let mut data = fs::read(&self.path)?;
        let Some(byte) = data.get_mut(offset) else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("offset {} beyond log of {} bytes", offset, data.len()),
            ));
        };
        *byte ^= 0xFF;
        fs::write(&self.path, data)
    }

    /// Flip a byte inside the first frame's payload
    pub fn corrupt_first_frame(&self) -> std::io::Result<()> {
        // header + length prefix + tag, then into the payload
        self.flip_byte(SHARD_LOG_MAGIC.len() + 4 + 1 + 2)
    }

    /// Overwrite the magic header
    pub fn corrupt_header(&self) -> std::io::Result<()> {
        self.flip_byte(0)
    }
}
