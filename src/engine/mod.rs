// src/engine/mod.rs

//! Event-driven build engine.
//!
//! [`core`] decides, without any IO, which tasks start when a trigger or
//! completion arrives and when a one-shot build is over. [`runtime`] moves
//! events from the channel into the core and tasks from the core into the
//! executor. [`queue`] holds re-triggers that arrive while their task is
//! still part of the active run.

/// Task names are the `TaskKind` names (`css`, `js`, ...).
pub type TaskName = String;

/// Outcome of a task for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The task stopped at its first failing step; carries the error text.
    Failed(String),
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Manual trigger (e.g. group roots at startup).
    Manual,
    /// Triggered due to a filesystem event.
    FileWatch,
}

/// How long the runtime lives.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once the DAG is idle and there are no
    /// queued triggers (one-shot `default` / `distribute` builds).
    pub exit_when_idle: bool,
}

/// Everything the runtime reacts to.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Build this task (and whatever depends on it).
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// A task finished with a concrete outcome.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use self::core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use crate::types::TriggerWhileRunningBehaviour;
pub use runtime::Runtime;
