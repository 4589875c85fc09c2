// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::engine::TaskName;
use crate::fs::{walk_files, FileSystem};
use crate::tasks::inputs::InputMatcher;
use crate::tasks::WatchBinding;

/// Compiled input patterns for a single watched task.
///
/// The patterns are relative to the source root; the watcher passes
/// relative paths (e.g. `"css/site.css"`) into `matches`.
#[derive(Clone)]
pub struct TaskWatchProfile {
    name: TaskName,
    matcher: InputMatcher,
    use_hash: bool,
}

impl fmt::Debug for TaskWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskWatchProfile")
            .field("name", &self.name)
            .field("use_hash", &self.use_hash)
            .finish_non_exhaustive()
    }
}

impl TaskWatchProfile {
    /// Name of the task this profile belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a change only triggers once the inputs' content changed.
    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    /// Returns true if this task reads the given path (relative to the
    /// source root).
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.matches(rel_path)
    }
}

/// Compile one profile per watch binding.
pub fn build_profiles(bindings: &[WatchBinding], use_hash: bool) -> Result<Vec<TaskWatchProfile>> {
    bindings
        .iter()
        .map(|binding| {
            let matcher = binding
                .patterns
                .compile()
                .with_context(|| format!("building watch patterns for task {}", binding.task))?;
            Ok(TaskWatchProfile {
                name: binding.task.name().to_string(),
                matcher,
                use_hash,
            })
        })
        .collect()
}

/// All files under `root` this profile matches, sorted by relative path.
///
/// Used when computing aggregated hashes for `use_hash` profiles.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    profile: &TaskWatchProfile,
) -> Result<Vec<PathBuf>> {
    Ok(walk_files(fs, root)?
        .into_iter()
        .filter(|file| profile.matches(&file.rel))
        .map(|file| file.path)
        .collect())
}
