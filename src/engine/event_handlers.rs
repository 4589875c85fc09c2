// src/engine/event_handlers.rs

//! How the core reacts to triggers and completions.

use std::collections::BTreeSet;

use tracing::debug;

use crate::dag::{ScheduledTask, Scheduler, TaskRunState};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeOptions, TaskName, TaskOutcome, TriggerReason};

/// Work the async shell performs on behalf of the core.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Hand these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// The one-shot build is over.
    RequestExit,
}

/// Result of feeding one event into the core.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// `false` once the event loop should stop.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    pub(crate) fn stop() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: false,
        }
    }
}

fn dispatch(commands: &mut Vec<CoreCommand>, tasks: Vec<ScheduledTask>) {
    if !tasks.is_empty() {
        commands.push(CoreCommand::DispatchTasks(tasks));
    }
}

/// A task was asked to run.
///
/// While idle, the trigger opens a run together with whatever was queued.
/// During a run, a task that is not part of it yet joins immediately (a
/// stylesheet edit does not wait for a running script build); a task that
/// already takes part is queued for the next run.
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    debug!(task = %task, ?reason, "trigger");

    if scheduler.is_idle() {
        let mut triggers: BTreeSet<TaskName> = queue.drain_pending().into_iter().collect();
        triggers.insert(task);
        return CoreStep::running(start_run(scheduler, triggers.into_iter().collect()));
    }

    let mut commands = Vec::new();
    match scheduler.run_state_of(&task) {
        None => debug!(task = %task, "trigger for unknown task ignored"),
        Some(TaskRunState::NotInRun) => dispatch(&mut commands, scheduler.handle_trigger(&task)),
        Some(_) => queue.record_trigger(&task),
    }
    CoreStep::running(commands)
}

/// A task finished.
///
/// The failed task and every downstream task it blocked are appended to
/// `failed`.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    failed: &mut Vec<TaskName>,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let step = scheduler.step_completion(&task, outcome);
    failed.extend(step.newly_failed);

    let mut commands = Vec::new();
    dispatch(&mut commands, step.newly_scheduled);

    if scheduler.is_idle() {
        let queued = queue.drain_pending();
        commands.extend(start_run(scheduler, queued));
    }

    if options.exit_when_idle && scheduler.is_idle() && queue.is_empty() {
        commands.push(CoreCommand::RequestExit);
        return CoreStep {
            commands,
            keep_running: false,
        };
    }
    CoreStep::running(commands)
}

/// Open a run seeded with `triggers`. Nothing happens for an empty list.
pub fn start_run(scheduler: &mut Scheduler, triggers: Vec<TaskName>) -> Vec<CoreCommand> {
    let mut commands = Vec::new();
    if triggers.is_empty() {
        return commands;
    }

    scheduler.start_new_run();
    let ready: Vec<ScheduledTask> = triggers
        .iter()
        .flat_map(|task| scheduler.handle_trigger(task))
        .collect();
    dispatch(&mut commands, ready);
    commands
}
