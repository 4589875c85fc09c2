use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use assetdag::config::{ConfigFile, RawConfigFile};
use assetdag::errors::Result;
use assetdag::fs::{walk_files, RealFileSystem};
use assetdag::tasks::BuildContext;
use assetdag::types::{BuildMode, TriggerWhileRunningBehaviour};

/// Builder for `ConfigFile` to simplify test setup.
#[derive(Debug, Default)]
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn style_entry(mut self, entry: &str) -> Self {
        self.config.styles.entry = entry.to_string();
        self
    }

    pub fn purge_content(mut self, globs: &[&str]) -> Self {
        self.config.styles.purge_content = globs.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn script_output(mut self, output: &str) -> Self {
        self.config.scripts.output = output.to_string();
        self
    }

    pub fn paths(mut self, src: &str, build: &str, dist: &str) -> Self {
        self.config.paths.src = PathBuf::from(src);
        self.config.paths.build = PathBuf::from(build);
        self.config.paths.dist = PathBuf::from(dist);
        self
    }

    pub fn ports(mut self, livereload: u16, http: u16) -> Self {
        self.config.server.livereload_port = livereload;
        self.config.server.http_port = http;
        self
    }

    pub fn queue(mut self, behaviour: TriggerWhileRunningBehaviour, length: usize) -> Self {
        self.config.watch.triggered_while_running_behaviour = behaviour;
        self.config.watch.queue_length = length;
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.config.watch.use_hash = val;
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

/// A project laid out in a temporary directory.
///
/// Files are added relative to the project root, so source files go under
/// `src/`.
#[derive(Debug)]
pub struct ProjectBuilder {
    dir: TempDir,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("creating temp project dir"),
        }
    }

    pub fn file(self, rel: &str, contents: &str) -> Self {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("creating parent dirs");
        }
        std::fs::write(&path, contents).expect("writing project file");
        self
    }

    pub fn build(self) -> Project {
        Project { dir: self.dir }
    }
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A materialised test project; the directory is removed on drop.
#[derive(Debug)]
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Context over the real filesystem rooted at this project.
    pub fn context(&self, mode: BuildMode, config: ConfigFile) -> BuildContext {
        BuildContext::new(Arc::new(RealFileSystem), mode, self.root(), config)
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.root().join(rel))
            .unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn read_bytes(&self, rel: &str) -> Vec<u8> {
        std::fs::read(self.root().join(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    /// Relative paths of every file below `dir`, sorted.
    pub fn files_under(&self, dir: &str) -> Vec<String> {
        walk_files(&RealFileSystem, &self.root().join(dir))
            .expect("walking project dir")
            .into_iter()
            .map(|f| f.rel)
            .collect()
    }
}
