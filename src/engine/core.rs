// src/engine/core.rs

//! Synchronous decision core of the build engine.
//!
//! [`CoreRuntime::step`] takes one [`RuntimeEvent`] and returns the
//! commands the async shell has to carry out. No channels, clocks or files
//! are involved, so the tests below drive it event by event.

use tracing::warn;

use crate::dag::Scheduler;
use crate::engine::event_handlers::{
    handle_task_completion, handle_task_trigger, CoreStep,
};
use crate::engine::queue::TriggerQueue;
use crate::types::TriggerWhileRunningBehaviour;
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskName};

/// Scheduler, re-trigger queue and the running list of failed tasks.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
    failed: Vec<TaskName>,
    /// Set when a one-shot build is stopped before it finished; holds the
    /// tasks that never completed.
    interrupted: Option<Vec<TaskName>>,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        let queue = TriggerQueue::new(behaviour, queue_length);
        Self {
            scheduler,
            queue,
            options,
            failed: Vec::new(),
            interrupted: None,
        }
    }

    #[cfg(test)]
    fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Hand out the tasks that failed (directly or through a failed
    /// dependency) in the order they were observed, leaving the list empty.
    pub fn take_failed(&mut self) -> Vec<TaskName> {
        std::mem::take(&mut self.failed)
    }

    /// `Some` with the unfinished tasks if a one-shot build was stopped
    /// early.
    pub fn take_interrupted(&mut self) -> Option<Vec<TaskName>> {
        self.interrupted.take()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => {
                handle_task_trigger(&mut self.scheduler, &mut self.queue, task, reason)
            }
            RuntimeEvent::TaskCompleted { task, outcome } => {
                handle_task_completion(
                    &mut self.scheduler,
                    &mut self.queue,
                    &self.options,
                    &mut self.failed,
                    task,
                    outcome,
                )
            }
            RuntimeEvent::ShutdownRequested => {
                // A one-shot build leaves the loop on its own once settled,
                // so a shutdown seen here always cuts it short.
                if self.options.exit_when_idle {
                    let unfinished = self.scheduler.unfinished_tasks();
                    warn!(?unfinished, "build interrupted");
                    self.interrupted = Some(unfinished);
                }
                CoreStep::stop()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::ScheduledTask;
    use crate::engine::event_handlers::CoreCommand;
    use crate::engine::{TaskOutcome, TriggerReason};
    use crate::tasks::TaskGroup;

    fn core(group: TaskGroup, exit_when_idle: bool) -> CoreRuntime {
        CoreRuntime::new(
            Scheduler::from_group(&group).unwrap(),
            TriggerWhileRunningBehaviour::Queue,
            1,
            RuntimeOptions { exit_when_idle },
        )
    }

    fn trigger(task: &str) -> RuntimeEvent {
        RuntimeEvent::TaskTriggered {
            task: task.to_string(),
            reason: TriggerReason::Manual,
        }
    }

    fn completed(task: &str, outcome: TaskOutcome) -> RuntimeEvent {
        RuntimeEvent::TaskCompleted {
            task: task.to_string(),
            outcome,
        }
    }

    fn dispatched(step: &CoreStep) -> Vec<String> {
        let mut names: Vec<String> = step
            .commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => Some(tasks.clone()),
                CoreCommand::RequestExit => None,
            })
            .flatten()
            .map(|t: ScheduledTask| t.name)
            .collect();
        names.sort();
        names
    }

    #[test]
    fn one_shot_build_exits_after_last_completion() {
        let mut core = core(TaskGroup::distribute(), true);
        for task in ["css", "js", "html", "svg", "static"] {
            let step = core.step(trigger(task));
            assert_eq!(dispatched(&step), vec![task.to_string()]);
        }

        for task in ["css", "js", "html", "svg"] {
            let step = core.step(completed(task, TaskOutcome::Success));
            assert!(dispatched(&step).is_empty());
            assert!(step.keep_running);
        }
        let step = core.step(completed("static", TaskOutcome::Success));
        assert_eq!(dispatched(&step), vec!["compress".to_string()]);

        let step = core.step(completed("compress", TaskOutcome::Success));
        assert!(!step.keep_running);
        assert!(matches!(step.commands.last(), Some(CoreCommand::RequestExit)));
        assert!(core.take_failed().is_empty());
        assert!(core.take_interrupted().is_none());
    }

    #[test]
    fn failures_are_collected_with_blocked_dependents() {
        let mut core = core(TaskGroup::distribute(), true);
        for task in ["css", "js", "html", "svg", "static"] {
            core.step(trigger(task));
        }
        core.step(completed("css", TaskOutcome::Failed("bad selector".into())));
        for task in ["js", "html", "svg"] {
            core.step(completed(task, TaskOutcome::Success));
        }
        let step = core.step(completed("static", TaskOutcome::Success));

        assert!(dispatched(&step).is_empty());
        assert!(!step.keep_running);
        assert_eq!(core.take_failed(), vec!["css".to_string(), "compress".to_string()]);
        assert!(core.take_failed().is_empty());
    }

    #[test]
    fn retrigger_while_running_is_queued_for_next_run() {
        let mut core = core(TaskGroup::default_group(), false);
        core.step(trigger("css"));
        let step = core.step(trigger("css"));
        assert!(dispatched(&step).is_empty());
        assert!(!core.queue_is_empty());

        let step = core.step(completed("css", TaskOutcome::Success));
        assert_eq!(dispatched(&step), vec!["css".to_string()]);
        assert!(step.keep_running);
        assert!(core.queue_is_empty());
    }

    #[test]
    fn unrelated_trigger_joins_the_active_run() {
        let mut core = core(TaskGroup::default_group(), false);
        core.step(trigger("css"));
        let step = core.step(trigger("js"));
        assert_eq!(dispatched(&step), vec!["js".to_string()]);
        assert!(core.queue_is_empty());
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let mut core = core(TaskGroup::default_group(), false);
        core.step(trigger("css"));
        let step = core.step(RuntimeEvent::ShutdownRequested);
        assert!(!step.keep_running);
        assert!(step.commands.is_empty());
        assert!(core.take_interrupted().is_none());
    }

    #[test]
    fn shutdown_during_one_shot_build_reports_unfinished_tasks() {
        let mut core = core(TaskGroup::distribute(), true);
        for task in ["css", "js", "html", "svg", "static"] {
            core.step(trigger(task));
        }
        core.step(completed("css", TaskOutcome::Success));

        let step = core.step(RuntimeEvent::ShutdownRequested);
        assert!(!step.keep_running);
        assert_eq!(
            core.take_interrupted(),
            Some(vec![
                "compress".to_string(),
                "html".to_string(),
                "js".to_string(),
                "static".to_string(),
                "svg".to_string(),
            ])
        );
    }
}
