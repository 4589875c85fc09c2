// src/dag/task_info.rs

//! Per-task bookkeeping kept by the scheduler.

use crate::engine::TaskName;
use crate::tasks::TaskKind;

/// Where a task stands in the active run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting for upstream tasks.
    Pending,
    /// Handed to the executor.
    Running,
    DoneSuccess,
    /// Failed, or blocked by a failed upstream task.
    DoneFailed,
}

/// [`RunState`] as seen from outside the scheduler, with an explicit
/// variant for tasks the active run does not include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
        }
    }
}

/// One graph node with its run history.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    pub kind: TaskKind,
    pub deps: Vec<TaskName>,

    /// `None` while the task is outside the active run.
    pub run_state: Option<RunState>,

    pub last_successful_run: Option<u64>,

    pub last_failed_run: Option<u64>,
}

impl TaskInfo {
    pub fn new(name: TaskName, kind: TaskKind, deps: Vec<TaskName>) -> Self {
        Self {
            name,
            kind,
            deps,
            run_state: None,
            last_successful_run: None,
            last_failed_run: None,
        }
    }
}

/// A task the executor should run now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub kind: TaskKind,
    /// Run the task was scheduled in; ids increase with every run.
    pub run_id: u64,
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo, run_id: u64) -> Self {
        Self {
            name: info.name.clone(),
            kind: info.kind,
            run_id,
        }
    }
}
