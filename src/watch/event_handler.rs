// src/watch/event_handler.rs

//! Event processing logic for file system changes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::fs::FileSystem;
use crate::watch::cache::FileCache;
use crate::watch::hash::{compute_aggregate_hash, HashStore};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{collect_matching_files, TaskWatchProfile};

/// Shared state for `use_hash` change detection.
#[derive(Clone)]
pub struct HashState {
    pub store: Arc<Mutex<Box<dyn HashStore>>>,
    pub cache: Arc<Mutex<FileCache>>,
}

impl HashState {
    pub fn new(store: Box<dyn HashStore>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            cache: Arc::new(Mutex::new(FileCache::new())),
        }
    }
}

/// Process a single file change event and trigger the tasks reading it.
///
/// Returns `false` once the runtime channel is closed, signalling the
/// watcher loop to stop.
pub async fn process_file_change(
    fs: Arc<dyn FileSystem>,
    root: &Path,
    path: &Path,
    profiles: &Arc<Vec<TaskWatchProfile>>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    hashes: &HashState,
) -> bool {
    let Some(rel_str) = relative_str(root, path) else {
        warn!("could not relativize path {:?} against root {:?}", path, root);
        return true;
    };

    debug!(?path, rel = %rel_str, "normalized event path");

    let matching: Vec<&TaskWatchProfile> =
        profiles.iter().filter(|p| p.matches(&rel_str)).collect();

    for profile in matching {
        if !should_trigger_task(fs.clone(), root, path, &rel_str, profile, hashes.clone()).await {
            continue;
        }

        let task_name = profile.name().to_string();
        debug!(task = %task_name, path = %rel_str, "watch match -> triggering task");
        if let Err(err) = runtime_tx
            .send(RuntimeEvent::TaskTriggered {
                task: task_name,
                reason: TriggerReason::FileWatch,
            })
            .await
        {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }

    true
}

/// Check if a task should be triggered based on hash comparison.
///
/// Any failure while hashing falls back to triggering.
async fn should_trigger_task(
    fs: Arc<dyn FileSystem>,
    root: &Path,
    abs_path: &Path,
    rel_path: &str,
    profile: &TaskWatchProfile,
    hashes: HashState,
) -> bool {
    if !profile.use_hash() {
        return true;
    }

    let root: PathBuf = root.to_path_buf();
    let abs_path: PathBuf = abs_path.to_path_buf();
    let profile = profile.clone();
    let rel_path = rel_path.to_string();

    tokio::task::spawn_blocking(move || {
        let task_name = profile.name();

        let files = match collect_matching_files(fs.as_ref(), &root, &profile) {
            Ok(f) => f,
            Err(err) => {
                warn!(task = %task_name, error = %err, "failed to collect watched files; triggering anyway");
                return true;
            }
        };

        let mut file_hashes = Vec::with_capacity(files.len());
        {
            let Ok(mut cache) = hashes.cache.lock() else {
                warn!("file cache mutex poisoned; triggering anyway");
                return true;
            };
            cache.invalidate(&abs_path);

            for file_path in files {
                match cache.get_or_compute(fs.as_ref(), &file_path) {
                    Ok(h) => file_hashes.push(h),
                    Err(err) => {
                        warn!(
                            task = %task_name,
                            file = ?file_path,
                            error = %err,
                            "failed to compute file hash; triggering anyway"
                        );
                        return true;
                    }
                }
            }
        }

        let new_hash = compute_aggregate_hash(&file_hashes);

        let Ok(mut store) = hashes.store.lock() else {
            warn!(task = %task_name, "hash store mutex poisoned; triggering anyway");
            return true;
        };

        match store.load(task_name) {
            Ok(Some(old_hash)) if old_hash == new_hash => {
                info!(task = %task_name, path = %rel_path, "inputs unchanged; skipping trigger");
                false
            }
            Ok(_) => {
                if let Err(err) = store.save(task_name, &new_hash) {
                    warn!(task = %task_name, error = %err, "failed to save task hash");
                }
                true
            }
            Err(err) => {
                warn!(task = %task_name, error = %err, "failed to load task hash; triggering anyway");
                true
            }
        }
    })
    .await
    .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::tasks::watch_bindings;
    use crate::watch::hash::MemoryHashStore;
    use crate::watch::patterns::build_profiles;

    fn setup(use_hash: bool) -> (MockFileSystem, Arc<Vec<TaskWatchProfile>>, HashState) {
        let fs = MockFileSystem::new();
        fs.add_file("site/src/css/a.css", ".a{}");
        let profiles = Arc::new(build_profiles(&watch_bindings(), use_hash).unwrap());
        (fs, profiles, HashState::new(Box::new(MemoryHashStore::new())))
    }

    async fn change(
        fs: &MockFileSystem,
        profiles: &Arc<Vec<TaskWatchProfile>>,
        hashes: &HashState,
        path: &str,
    ) -> Vec<String> {
        let (tx, mut rx) = mpsc::channel(8);
        let alive = process_file_change(
            Arc::new(fs.clone()),
            Path::new("site/src"),
            Path::new(path),
            profiles,
            &tx,
            hashes,
        )
        .await;
        assert!(alive);
        drop(tx);

        let mut triggered = Vec::new();
        while let Some(event) = rx.recv().await {
            if let RuntimeEvent::TaskTriggered { task, reason } = event {
                assert_eq!(reason, TriggerReason::FileWatch);
                triggered.push(task);
            }
        }
        triggered
    }

    #[tokio::test]
    async fn change_triggers_owning_task_only() {
        let (fs, profiles, hashes) = setup(false);
        assert_eq!(change(&fs, &profiles, &hashes, "site/src/css/a.css").await, vec!["css"]);
        assert_eq!(change(&fs, &profiles, &hashes, "site/src/css/a.css").await, vec!["css"]);
        assert!(change(&fs, &profiles, &hashes, "elsewhere/a.css").await.is_empty());
    }

    #[tokio::test]
    async fn unchanged_content_is_skipped_with_hashing() {
        let (fs, profiles, hashes) = setup(true);
        assert_eq!(change(&fs, &profiles, &hashes, "site/src/css/a.css").await, vec!["css"]);
        assert!(change(&fs, &profiles, &hashes, "site/src/css/a.css").await.is_empty());

        fs.add_file("site/src/css/a.css", ".a{color:red}");
        assert_eq!(change(&fs, &profiles, &hashes, "site/src/css/a.css").await, vec!["css"]);
    }

    #[tokio::test]
    async fn closed_runtime_stops_processing() {
        let (fs, profiles, hashes) = setup(false);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let alive = process_file_change(
            Arc::new(fs),
            Path::new("site/src"),
            Path::new("site/src/css/a.css"),
            &profiles,
            &tx,
            &hashes,
        )
        .await;
        assert!(!alive);
    }
}
