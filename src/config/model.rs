// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::TriggerWhileRunningBehaviour;

/// Top-level project configuration as read from `Assetdag.toml`.
///
/// Every section and every key is optional; the defaults reproduce the fixed
/// layout the tool was designed around:
///
/// ```toml
/// [paths]
/// src = "src"
/// build = "build"
/// dist = "dist"
///
/// [styles]
/// entry = "css/tailwindcss.css"
/// output = "css/main.css"
/// purge_content = ["**/*.html", "**/*.js", "**/*.ts"]
///
/// [scripts]
/// output = "js/main.js"
///
/// [server]
/// host = "127.0.0.1"
/// livereload_port = 5000
/// http_port = 8080
///
/// [watch]
/// triggered_while_running_behaviour = "queue"
/// queue_length = 1
/// use_hash = false
/// ```
///
/// This is the *unvalidated* form; use [`ConfigFile::try_from`] (or
/// [`crate::config::load_and_validate`]) to obtain a checked [`ConfigFile`].
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub styles: StylesSection,

    #[serde(default)]
    pub scripts: ScriptsSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// Validated configuration.
///
/// Only obtainable through validation, so holders can rely on paths being
/// distinct, ports being usable, and globs compiling.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub styles: StylesSection,
    pub scripts: ScriptsSection,
    pub server: ServerSection,
    pub watch: WatchSection,
}

impl ConfigFile {
    /// Construct without running validation. Used by `TryFrom` once the
    /// checks have passed.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            paths: raw.paths,
            styles: raw.styles,
            scripts: raw.scripts,
            server: raw.server,
            watch: raw.watch,
        }
    }

    /// Configuration with every built-in default; always valid.
    pub fn defaults() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

/// `[paths]` section. Relative paths are resolved against the project root.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    #[serde(default = "default_src")]
    pub src: PathBuf,

    #[serde(default = "default_build")]
    pub build: PathBuf,

    #[serde(default = "default_dist")]
    pub dist: PathBuf,
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_build() -> PathBuf {
    PathBuf::from("build")
}

fn default_dist() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            src: default_src(),
            build: default_build(),
            dist: default_dist(),
        }
    }
}

/// `[styles]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StylesSection {
    /// Entry stylesheet (relative to `paths.src`) run through utility
    /// expansion. Emitted first in the concatenated output.
    #[serde(default = "default_style_entry")]
    pub entry: String,

    /// Concatenated output file, relative to `paths.build`.
    #[serde(default = "default_style_output")]
    pub output: String,

    /// Globs (relative to `paths.src`) scanned for used class names when
    /// purging in production.
    #[serde(default = "default_purge_content")]
    pub purge_content: Vec<String>,
}

fn default_style_entry() -> String {
    "css/tailwindcss.css".to_string()
}

fn default_style_output() -> String {
    "css/main.css".to_string()
}

fn default_purge_content() -> Vec<String> {
    vec![
        "**/*.html".to_string(),
        "**/*.js".to_string(),
        "**/*.ts".to_string(),
    ]
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            entry: default_style_entry(),
            output: default_style_output(),
            purge_content: default_purge_content(),
        }
    }
}

/// `[scripts]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptsSection {
    /// Concatenated output file, relative to `paths.build`.
    #[serde(default = "default_script_output")]
    pub output: String,
}

fn default_script_output() -> String {
    "js/main.js".to_string()
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            output: default_script_output(),
        }
    }
}

/// `[server]` section (used by `watch`).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the live-reload notification listener.
    #[serde(default = "default_livereload_port")]
    pub livereload_port: u16,

    /// Port of the static file server that injects the reload client.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_livereload_port() -> u16 {
    5000
}

fn default_http_port() -> u16 {
    8080
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            livereload_port: default_livereload_port(),
            http_port: default_http_port(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// `"queue"` (default) or `"cancel"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued runs to remember.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Only re-run a task when the content of its inputs actually changed.
    #[serde(default)]
    pub use_hash: bool,
}

fn default_queue_length() -> usize {
    1
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
            use_hash: false,
        }
    }
}
