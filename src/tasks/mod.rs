// src/tasks/mod.rs

//! The asset tasks and the groups that compose them.
//!
//! Each task reads its inputs through the [`BuildContext`] filesystem, runs
//! them through the transform steps its build mode selects, writes the result
//! below the build (or distribution) root, and tells live-reload listeners
//! what changed. Tasks hold no state between invocations.

pub mod compress;
pub mod context;
pub mod copy;
pub mod group;
pub mod inputs;
pub mod scripts;
pub mod styles;

use std::fmt;

use tracing::{info, warn};

use crate::errors::{AssetdagError, Result};

pub use context::BuildContext;
pub use group::{watch_bindings, TaskGroup, WatchBinding};
pub use inputs::InputPatterns;

/// The six tasks the orchestrator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    Css,
    Js,
    Html,
    Svg,
    Static,
    Compress,
}

impl TaskKind {
    /// Tasks that turn the source tree into the build tree.
    pub const ASSETS: [TaskKind; 5] = [
        TaskKind::Css,
        TaskKind::Js,
        TaskKind::Html,
        TaskKind::Svg,
        TaskKind::Static,
    ];

    pub const ALL: [TaskKind; 6] = [
        TaskKind::Css,
        TaskKind::Js,
        TaskKind::Html,
        TaskKind::Svg,
        TaskKind::Static,
        TaskKind::Compress,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Css => "css",
            TaskKind::Js => "js",
            TaskKind::Html => "html",
            TaskKind::Svg => "svg",
            TaskKind::Static => "static",
            TaskKind::Compress => "compress",
        }
    }

    /// Whether a successful run notifies live-reload listeners.
    pub fn notifies_reload(self) -> bool {
        self != TaskKind::Compress
    }

    /// Describe what this task would do under `ctx`, without touching disk.
    pub fn plan(self, ctx: &BuildContext) -> AssetTask {
        match self {
            TaskKind::Css => styles::plan(ctx),
            TaskKind::Js => scripts::plan(ctx),
            TaskKind::Html | TaskKind::Svg | TaskKind::Static => copy::plan(self, ctx),
            TaskKind::Compress => compress::plan(ctx),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static description of a task: inputs, steps, destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTask {
    pub kind: TaskKind,
    /// Input globs; exclusions are prefixed with `!`.
    pub inputs: Vec<String>,
    /// Transform step names in application order.
    pub steps: Vec<String>,
    /// Output file or directory, relative to the project root.
    pub output: String,
    pub reload: bool,
}

/// Run one task to completion.
///
/// Returns the written paths relative to the output root. Any failure
/// aborts the task's remaining steps; files already written are left in
/// place.
pub fn run_task(kind: TaskKind, ctx: &BuildContext) -> Result<Vec<String>> {
    info!(task = %kind, mode = %ctx.mode(), "running task");

    let result = match kind {
        TaskKind::Css => styles::run(ctx),
        TaskKind::Js => scripts::run(ctx),
        TaskKind::Html | TaskKind::Svg | TaskKind::Static => copy::run(kind, ctx),
        TaskKind::Compress => compress::run(ctx),
    };

    match result {
        Ok(written) => {
            info!(task = %kind, files = written.len(), "task finished");
            if kind.notifies_reload() {
                ctx.notify_reload(written.clone());
            }
            Ok(written)
        }
        Err(err) => {
            warn!(task = %kind, error = %format!("{err:#}"), "task failed");
            Err(AssetdagError::Transform {
                task: kind.name().to_string(),
                message: format!("{err:#}"),
            })
        }
    }
}
