use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::info;

use crate::fs::FileSystem;

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs
        .read(path)
        .with_context(|| format!("reading file for hashing: {:?}", path))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Compute aggregate hash from a list of file hashes.
///
/// `hashes` must be sorted by the corresponding file path to ensure stability.
pub fn compute_aggregate_hash(hashes: &[String]) -> String {
    let mut hasher = Hasher::new();
    for h in hashes {
        hasher.update(h.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Abstract storage for task hashes.
pub trait HashStore: Send + Sync {
    fn load(&self, task: &str) -> Result<Option<String>>;
    fn save(&mut self, task: &str, hash: &str) -> Result<()>;
}

/// Stores hashes in memory only; a restarted watcher treats every task as
/// changed.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: HashMap<String, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, task: &str) -> Result<Option<String>> {
        Ok(self.map.get(task).cloned())
    }

    fn save(&mut self, task: &str, hash: &str) -> Result<()> {
        self.map.insert(task.to_string(), hash.to_string());
        info!(task = %task, hash = %hash, "stored task hash");
        Ok(())
    }
}
