//! One physical partition of a collection
//!
//! A `ShardStore` keeps its rows in memory and persists every mutation to an
//! append-only log (`vectors.log`, see [`crate::encoding`]). Opening a shard
//! replays the log to rebuild the row table.
//!
//! # Rows
//!
//! Rows are never removed. `append` pushes a new row even when the id already
//! exists; `logical_delete` flips the deletion flag of the newest live row for
//! the id. Lookups return the newest live row.
//!
//! # Concurrency
//!
//! - Writes take the writer mutex for their whole duration, so they are
//!   linearized in the order the shard applies them.
//! - Reads take the row table's read lock only. A scan re-acquires the lock per
//!   batch of rows, so writes interleave with long scans and a scan may or may
//!   not observe a concurrent write.

use crate::durability::DurabilityMode;
use crate::encoding::{
    decode_entry, encode_entry, next_valid_frame, DeleteMarker, Frame, ShardEntry, SHARD_LOG_MAGIC,
};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use shardvec_core::{
    now_micros, ShardAddress, ShardStats, StoreError, StoreResult, UpsertOutcome, VectorRecord,
};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rows examined per read-lock acquisition during a scan
pub const SCAN_BATCH: usize = 256;

/// In-memory row table
#[derive(Debug, Default)]
struct ShardState {
    /// Physical rows in log order
    rows: Vec<VectorRecord>,
    /// id -> row indices, ascending (newest last)
    index: FxHashMap<String, SmallVec<[usize; 1]>>,
    /// Rows with `deleted == false`
    live: usize,
}

impl ShardState {
    fn newest_live(&self, id: &str) -> Option<usize> {
        self.index
            .get(id)?
            .iter()
            .rev()
            .copied()
            .find(|&pos| self.rows[pos].is_live())
    }

    fn push(&mut self, record: VectorRecord) {
        let pos = self.rows.len();
        if record.is_live() {
            self.live += 1;
        }
        self.index.entry(record.id.clone()).or_default().push(pos);
        self.rows.push(record);
    }

    fn mark_deleted(&mut self, pos: usize, at: u64) {
        let row = &mut self.rows[pos];
        if row.is_live() {
            row.deleted = true;
            row.updated_at = at;
            self.live -= 1;
        }
    }
}

/// Append handle on the shard log
#[derive(Debug)]
struct LogWriter {
    file: File,
    /// End of the last complete frame
    offset: u64,
}

/// Durable storage for one shard's vector records
#[derive(Debug)]
pub struct ShardStore {
    address: ShardAddress,
    dimension: usize,
    path: PathBuf,
    durability: DurabilityMode,
    state: RwLock<ShardState>,
    writer: Mutex<LogWriter>,
}

impl ShardStore {
    /// Create an empty shard log at `path` if none exists
    pub fn create_empty(path: &Path) -> StoreResult<()> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(SHARD_LOG_MAGIC)?;
        file.sync_all()?;
        Ok(())
    }

    /// Open a shard, creating its log if missing, and replay it.
    ///
    /// A torn final frame is truncated away. Any other bad frame, including a
    /// damaged length prefix with intact frames after it, fails the open with
    /// `StoreError::Corruption` and leaves the log untouched.
    pub fn open(
        address: ShardAddress,
        path: impl Into<PathBuf>,
        dimension: usize,
        durability: DurabilityMode,
    ) -> StoreResult<Self> {
        let path = path.into();
        Self::create_empty(&path)?;

        let bytes = fs::read(&path)?;
        let shard = address.shard;
        let mut state = ShardState::default();
        let mut valid_len = bytes.len() as u64;

        if bytes.len() < SHARD_LOG_MAGIC.len() {
            if !SHARD_LOG_MAGIC.starts_with(&bytes) {
                return Err(StoreError::Corruption {
                    shard,
                    offset: 0,
                    reason: "bad shard log header".to_string(),
                });
            }
            warn!(
                target: "shardvec::storage",
                shard = %address,
                "Torn shard log header, rewriting"
            );
            fs::write(&path, SHARD_LOG_MAGIC)?;
            valid_len = SHARD_LOG_MAGIC.len() as u64;
        } else {
            if &bytes[..SHARD_LOG_MAGIC.len()] != SHARD_LOG_MAGIC {
                return Err(StoreError::Corruption {
                    shard,
                    offset: 0,
                    reason: "bad shard log header".to_string(),
                });
            }

            let mut pos = SHARD_LOG_MAGIC.len();
            while pos < bytes.len() {
                match decode_entry(&bytes[pos..], shard, pos as u64)? {
                    Frame::Entry(entry, used) => {
                        Self::apply(&mut state, entry, dimension, shard, pos as u64)?;
                        pos += used;
                    }
                    Frame::Incomplete => {
                        if let Some(skip) = next_valid_frame(&bytes[pos..]) {
                            return Err(StoreError::Corruption {
                                shard,
                                offset: pos as u64,
                                reason: format!(
                                    "frame length runs past a valid frame at offset {}",
                                    pos + skip
                                ),
                            });
                        }
                        warn!(
                            target: "shardvec::storage",
                            shard = %address,
                            offset = pos,
                            dropped = bytes.len() - pos,
                            "Truncating torn frame at shard log tail"
                        );
                        valid_len = pos as u64;
                        break;
                    }
                }
            }
        }

        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        if valid_len < bytes.len() as u64 {
            file.set_len(valid_len)?;
            file.sync_all()?;
        }
        file.seek(SeekFrom::Start(valid_len))?;

        info!(
            target: "shardvec::storage",
            shard = %address,
            rows = state.rows.len(),
            live = state.live,
            "Opened shard"
        );

        Ok(ShardStore {
            address,
            dimension,
            path,
            durability,
            state: RwLock::new(state),
            writer: Mutex::new(LogWriter {
                file,
                offset: valid_len,
            }),
        })
    }

    fn apply(
        state: &mut ShardState,
        entry: ShardEntry,
        dimension: usize,
        shard: u32,
        offset: u64,
    ) -> StoreResult<()> {
        match entry {
            ShardEntry::Append(record) => {
                if record.vector.len() != dimension {
                    return Err(StoreError::Corruption {
                        shard,
                        offset,
                        reason: format!(
                            "row '{}' has dimension {}, shard expects {}",
                            record.id,
                            record.vector.len(),
                            dimension
                        ),
                    });
                }
                state.push(record);
            }
            ShardEntry::Delete(marker) => {
                if let Some(pos) = state.newest_live(&marker.id) {
                    state.mark_deleted(pos, marker.deleted_at);
                }
            }
        }
        Ok(())
    }

    /// Append a frame to the log, rolling the file back on failure so a
    /// failed write never leaves a partial frame in front of later ones.
    fn persist(&self, writer: &mut LogWriter, entry: &ShardEntry) -> StoreResult<()> {
        let frame = encode_entry(entry)?;
        let result = writer.file.write_all(&frame).and_then(|()| {
            if self.durability.requires_immediate_fsync() {
                writer.file.sync_data()
            } else {
                writer.file.flush()
            }
        });
        match result {
            Ok(()) => {
                writer.offset += frame.len() as u64;
                Ok(())
            }
            Err(e) => {
                let _ = writer.file.set_len(writer.offset);
                let _ = writer.file.seek(SeekFrom::Start(writer.offset));
                Err(StoreError::Io(e))
            }
        }
    }

    /// Insert a new physical row. Never overwrites an existing row.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if the record length differs from the shard dimension
    /// - `Io` if the log write fails (the row is not added)
    pub fn append(&self, record: VectorRecord) -> StoreResult<()> {
        if record.vector.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                got: record.vector.len(),
            });
        }

        let mut writer = self.writer.lock();
        let entry = ShardEntry::Append(record);
        self.persist(&mut writer, &entry)?;
        if let ShardEntry::Append(record) = entry {
            debug!(target: "shardvec::storage", shard = %self.address, id = %record.id, "append");
            self.state.write().push(record);
        }
        Ok(())
    }

    /// Flag the newest live row for `id` as deleted.
    ///
    /// Returns whether a live row was found. Deleting an absent or already
    /// deleted id returns `false` and writes nothing.
    pub fn logical_delete(&self, id: &str) -> StoreResult<bool> {
        let mut writer = self.writer.lock();
        let Some(pos) = self.state.read().newest_live(id) else {
            return Ok(false);
        };

        let marker = DeleteMarker {
            id: id.to_string(),
            deleted_at: now_micros(),
        };
        let deleted_at = marker.deleted_at;
        self.persist(&mut writer, &ShardEntry::Delete(marker))?;
        self.state.write().mark_deleted(pos, deleted_at);
        debug!(target: "shardvec::storage", shard = %self.address, id, "logical delete");
        Ok(true)
    }

    /// Replace the newest live row for `record.id`, or insert it if none.
    ///
    /// The lookup, the delete marker and the append all happen under the
    /// writer lock, so concurrent replaces of one id leave exactly one live
    /// row. The two frames are still separate: a crash between them leaves
    /// the id absent, and readers may briefly see no live row. A replacement
    /// keeps the original `created_at`.
    pub fn replace(&self, mut record: VectorRecord) -> StoreResult<UpsertOutcome> {
        if record.vector.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                got: record.vector.len(),
            });
        }

        let mut writer = self.writer.lock();
        let existing = {
            let state = self.state.read();
            state
                .newest_live(&record.id)
                .map(|pos| (pos, state.rows[pos].created_at))
        };

        let outcome = match existing {
            Some((pos, created_at)) => {
                let marker = DeleteMarker {
                    id: record.id.clone(),
                    deleted_at: now_micros(),
                };
                let deleted_at = marker.deleted_at;
                self.persist(&mut writer, &ShardEntry::Delete(marker))?;
                self.state.write().mark_deleted(pos, deleted_at);
                record.created_at = created_at;
                record.updated_at = deleted_at;
                UpsertOutcome::Updated
            }
            None => UpsertOutcome::Inserted,
        };

        let entry = ShardEntry::Append(record);
        self.persist(&mut writer, &entry)?;
        if let ShardEntry::Append(record) = entry {
            debug!(target: "shardvec::storage", shard = %self.address, id = %record.id, ?outcome, "replace");
            self.state.write().push(record);
        }
        Ok(outcome)
    }

    /// Newest live row for `id`
    pub fn get(&self, id: &str) -> StoreResult<Option<VectorRecord>> {
        let state = self.state.read();
        Ok(state.newest_live(id).map(|pos| state.rows[pos].clone()))
    }

    /// Lazy sequence of live rows.
    ///
    /// Each call starts from the first row and reflects the rows present as
    /// it advances; it is not a snapshot.
    pub fn scan_candidates(&self) -> ScanCandidates<'_> {
        ScanCandidates {
            store: self,
            cursor: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Call `visit` on every live row without cloning it.
    ///
    /// Takes the read lock once per [`SCAN_BATCH`] rows. Returns the number of
    /// live rows visited.
    pub fn visit_candidates<F>(&self, mut visit: F) -> usize
    where
        F: FnMut(&VectorRecord),
    {
        let mut cursor = 0;
        let mut visited = 0;
        loop {
            let state = self.state.read();
            let end = (cursor + SCAN_BATCH).min(state.rows.len());
            for row in &state.rows[cursor..end] {
                if row.is_live() {
                    visit(row);
                    visited += 1;
                }
            }
            if end >= state.rows.len() {
                return visited;
            }
            cursor = end;
        }
    }

    /// Live and physical row counts plus log location
    pub fn stats(&self) -> ShardStats {
        let state = self.state.read();
        ShardStats {
            shard: self.address.shard,
            vector_count: state.live,
            row_count: state.rows.len(),
            path: self.path.clone(),
        }
    }

    /// Live row count
    pub fn len(&self) -> usize {
        self.state.read().live
    }

    /// Whether the shard has no live rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shard address
    pub fn address(&self) -> &ShardAddress {
        &self.address
    }

    /// Vector dimension enforced by this shard
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Shard log path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Iterator returned by [`ShardStore::scan_candidates`]
#[derive(Debug)]
pub struct ScanCandidates<'a> {
    store: &'a ShardStore,
    cursor: usize,
    buffer: VecDeque<VectorRecord>,
    exhausted: bool,
}

impl ScanCandidates<'_> {
    fn refill(&mut self) {
        let state = self.store.state.read();
        let end = (self.cursor + SCAN_BATCH).min(state.rows.len());
        self.buffer.extend(
            state.rows[self.cursor..end]
                .iter()
                .filter(|row| row.is_live())
                .cloned(),
        );
        self.cursor = end;
        self.exhausted = end >= state.rows.len();
    }
}

impl Iterator for ScanCandidates<'_> {
    type Item = VectorRecord;

    fn next(&mut self) -> Option<VectorRecord> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Some(record);
            }
            if self.exhausted {
                return None;
            }
            self.refill();
        }
    }
}
