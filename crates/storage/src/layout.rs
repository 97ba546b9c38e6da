//! On-disk layout
//!
//! ```text
//! <root>/
//!   <project>/
//!     _project.json
//!     collections/
//!       <collection>/
//!         _config.json
//!         shard_0/vectors.log
//!         shard_1/vectors.log
//!         ...
//! ```
//!
//! Every path is derived from (project id, collection name, shard index) alone.
//! Descriptors are pretty-printed JSON written through a temp file and a rename.

use serde::de::DeserializeOwned;
use serde::Serialize;
use shardvec_core::{CollectionName, ProjectId, ShardAddress, StoreError, StoreResult};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Project descriptor file name
pub const PROJECT_FILE: &str = "_project.json";
/// Collection descriptor file name
pub const COLLECTION_FILE: &str = "_config.json";
/// Directory holding a project's collections
pub const COLLECTIONS_DIR: &str = "collections";
/// Shard log file name
pub const SHARD_LOG_FILE: &str = "vectors.log";

/// Path arithmetic for a data root
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    /// Layout rooted at `root` (not created until something is written)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StorageLayout { root: root.into() }
    }

    /// Data root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<project>`
    pub fn project_dir(&self, project: &ProjectId) -> PathBuf {
        self.root.join(project.as_str())
    }

    /// `<root>/<project>/_project.json`
    pub fn project_file(&self, project: &ProjectId) -> PathBuf {
        self.project_dir(project).join(PROJECT_FILE)
    }

    /// `<root>/<project>/collections`
    pub fn collections_dir(&self, project: &ProjectId) -> PathBuf {
        self.project_dir(project).join(COLLECTIONS_DIR)
    }

    /// `<root>/<project>/collections/<collection>`
    pub fn collection_dir(&self, project: &ProjectId, collection: &CollectionName) -> PathBuf {
        self.collections_dir(project).join(collection.as_str())
    }

    /// `<root>/<project>/collections/<collection>/_config.json`
    pub fn collection_file(&self, project: &ProjectId, collection: &CollectionName) -> PathBuf {
        self.collection_dir(project, collection).join(COLLECTION_FILE)
    }

    /// `.../<collection>/shard_<i>`
    pub fn shard_dir(&self, address: &ShardAddress) -> PathBuf {
        self.collection_dir(&address.project, &address.collection)
            .join(format!("shard_{}", address.shard))
    }

    /// `.../<collection>/shard_<i>/vectors.log`
    pub fn shard_log(&self, address: &ShardAddress) -> PathBuf {
        self.shard_dir(address).join(SHARD_LOG_FILE)
    }

    /// Names of the immediate subdirectories of `dir` that contain `marker`,
    /// sorted. A missing `dir` yields an empty list.
    pub fn list_marked_dirs(dir: &Path, marker: &str) -> StoreResult<Vec<String>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if !entry.path().join(marker).is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
///
/// The parent directory is created if needed. The data is fsynced before the
/// rename, so readers see either the old file or the complete new one.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    let tmp = path.with_extension("json.tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read and deserialize a JSON descriptor
pub fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        StoreError::Serialization(format!("{}: {}", path.display(), e))
    })
}
