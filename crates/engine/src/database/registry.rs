//! Process-wide registry of open databases
//!
//! Opening the same data directory twice returns the same [`VectorDatabase`],
//! so two instances never append to the same shard logs. Entries are weak and
//! disappear when the last handle is dropped.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Weak;

use super::VectorDatabase;

/// Canonical data directory -> open database
pub static OPEN_DATABASES: Lazy<Mutex<HashMap<PathBuf, Weak<VectorDatabase>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
