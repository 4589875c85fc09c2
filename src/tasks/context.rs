// src/tasks/context.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ConfigFile;
use crate::fs::FileSystem;
use crate::server::ReloadHub;
use crate::types::BuildMode;

/// Everything a task needs, fixed for the lifetime of the process.
///
/// Cloning is cheap; the executor hands one clone to every task it runs.
#[derive(Debug, Clone)]
pub struct BuildContext {
    fs: Arc<dyn FileSystem>,
    mode: BuildMode,
    root: PathBuf,
    config: Arc<ConfigFile>,
    reload: Option<ReloadHub>,
}

impl BuildContext {
    /// `root` is the project directory the configured paths are relative to.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        mode: BuildMode,
        root: impl Into<PathBuf>,
        config: ConfigFile,
    ) -> Self {
        Self {
            fs,
            mode,
            root: root.into(),
            config: Arc::new(config),
            reload: None,
        }
    }

    /// Send reload notifications through `hub` after each asset task.
    pub fn with_reload(mut self, hub: ReloadHub) -> Self {
        self.reload = Some(hub);
        self
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn src_dir(&self) -> PathBuf {
        self.resolve(&self.config.paths.src)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.resolve(&self.config.paths.build)
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.resolve(&self.config.paths.dist)
    }

    /// Join onto the root, leaving the path untouched for a `.` root so
    /// relative paths stay in the form the user wrote them.
    fn resolve(&self, path: &Path) -> PathBuf {
        if self.root.as_os_str().is_empty() || self.root == Path::new(".") {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn notify_reload(&self, paths: Vec<String>) {
        if let Some(hub) = &self.reload {
            hub.notify(paths);
        }
    }
}
