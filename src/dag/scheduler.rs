// src/dag/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::state_manager::StateManager;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::Result;
use crate::tasks::TaskGroup;

/// What one trigger or completion changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks to hand to the executor now.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// The failed task first, then every downstream task it blocked.
    pub newly_failed: Vec<TaskName>,
    /// The run settled with this step and the scheduler is idle again.
    pub run_just_finished: bool,
}

/// The compiled task graph plus the state of the active run.
///
/// Runs are numbered. Each task remembers the last run it succeeded or
/// failed in, which lets a partial run (one file changed while watching)
/// treat untouched upstream tasks as already built.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    run_counter: u64,
    active_run: Option<u64>,
}

impl Scheduler {
    pub fn new(graph: DagGraph) -> Self {
        let tasks = graph
            .tasks()
            .filter_map(|name| {
                let kind = graph.kind_of(name)?;
                let deps = graph.dependencies_of(name).to_vec();
                Some((name.to_string(), TaskInfo::new(name.to_string(), kind, deps)))
            })
            .collect();

        Self {
            graph,
            tasks,
            run_counter: 0,
            active_run: None,
        }
    }

    /// Compile `group` and schedule over it.
    pub fn from_group(group: &TaskGroup) -> Result<Self> {
        Ok(Self::new(DagGraph::from_group(group)?))
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// No run is active.
    pub fn is_idle(&self) -> bool {
        self.active_run.is_none()
    }

    /// State of `task` in the active (or most recently finished) run.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        self.tasks.get(task).map(|info| info.run_state.into())
    }

    /// Tasks of the active run that are still waiting or running, sorted by
    /// name.
    pub fn unfinished_tasks(&self) -> Vec<TaskName> {
        let mut names: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| matches!(info.run_state, Some(RunState::Pending | RunState::Running)))
            .map(|info| info.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Open a new run. Per-run states are cleared; success history is kept.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.active_run = Some(self.run_counter);
        for info in self.tasks.values_mut() {
            info.run_state = None;
        }
        debug!(run_id = self.run_counter, "run started");
    }

    /// Add `task` and its downstream tasks to the active run (opening one if
    /// needed) and return whatever can start now.
    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledTask> {
        if self.active_run.is_none() {
            debug!(task = %task, "trigger while idle; opening a run");
            self.start_new_run();
        }
        let run_id = self.run_counter;

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, run_id);
        if self.graph.kind_of(task).is_some() {
            manager.join_run(task);
        } else {
            warn!(task = %task, "trigger for unknown task ignored");
        }
        let ready = manager.take_ready();
        self.settle();
        ready
    }

    /// Record a finished task: the tasks it unblocked, the tasks that failed
    /// with it, and whether the run settled.
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.active_run else {
            warn!(task = %task, "completion while idle ignored");
            return SchedulerStep::default();
        };
        let Some(info) = self.tasks.get_mut(task) else {
            warn!(task = %task, "completion for unknown task ignored");
            return SchedulerStep::default();
        };

        let mut step = SchedulerStep::default();
        match outcome {
            TaskOutcome::Success => {
                info.run_state = Some(RunState::DoneSuccess);
                info.last_successful_run = Some(run_id);
                debug!(task = %task, run_id, "task succeeded");
                step.newly_scheduled =
                    StateManager::new(&self.graph, &mut self.tasks, run_id).take_ready();
            }
            TaskOutcome::Failed(message) => {
                info.run_state = Some(RunState::DoneFailed);
                info.last_failed_run = Some(run_id);
                warn!(task = %task, run_id, error = %message, "task failed");
                step.newly_failed.push(task.to_string());
                step.newly_failed.extend(
                    StateManager::new(&self.graph, &mut self.tasks, run_id).fail_downstream(task),
                );
            }
        }

        step.run_just_finished = self.settle();
        step
    }

    /// Close the active run once nothing is waiting or running. Returns
    /// `true` if this call closed it.
    fn settle(&mut self) -> bool {
        let Some(run_id) = self.active_run else {
            return false;
        };
        let settled = StateManager::new(&self.graph, &mut self.tasks, run_id).run_settled();
        if settled {
            info!(run_id, "run finished");
            self.active_run = None;
        }
        settled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tasks: &[ScheduledTask]) -> Vec<&str> {
        let mut names: Vec<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
        names.sort();
        names
    }

    fn distribute() -> Scheduler {
        Scheduler::from_group(&TaskGroup::distribute()).unwrap()
    }

    fn trigger_roots(scheduler: &mut Scheduler) -> Vec<ScheduledTask> {
        scheduler.start_new_run();
        let mut ready = Vec::new();
        for root in scheduler.graph().roots() {
            ready.extend(scheduler.handle_trigger(&root));
        }
        ready
    }

    #[test]
    fn compress_waits_for_every_asset_task() {
        let mut scheduler = distribute();
        let ready = trigger_roots(&mut scheduler);
        assert_eq!(names(&ready), vec!["css", "html", "js", "static", "svg"]);
        assert_eq!(scheduler.run_state_of("compress"), Some(TaskRunState::Pending));

        for task in ["css", "js", "html", "svg"] {
            let step = scheduler.step_completion(task, TaskOutcome::Success);
            assert!(step.newly_scheduled.is_empty());
        }
        let step = scheduler.step_completion("static", TaskOutcome::Success);
        assert_eq!(names(&step.newly_scheduled), vec!["compress"]);
        assert!(!step.run_just_finished);

        assert_eq!(scheduler.unfinished_tasks(), vec!["compress".to_string()]);
        let step = scheduler.step_completion("compress", TaskOutcome::Success);
        assert!(step.run_just_finished);
        assert!(scheduler.unfinished_tasks().is_empty());
        assert!(scheduler.is_idle());
    }

    #[test]
    fn failed_asset_task_blocks_compress() {
        let mut scheduler = distribute();
        trigger_roots(&mut scheduler);

        let step = scheduler.step_completion("js", TaskOutcome::Failed("syntax error".into()));
        assert_eq!(step.newly_failed, vec!["js".to_string(), "compress".to_string()]);
        assert_eq!(scheduler.run_state_of("compress"), Some(TaskRunState::DoneFailed));

        for task in ["css", "html", "svg"] {
            scheduler.step_completion(task, TaskOutcome::Success);
        }
        let step = scheduler.step_completion("static", TaskOutcome::Success);
        assert!(step.newly_scheduled.is_empty());
        assert!(step.run_just_finished);
    }

    #[test]
    fn scheduled_tasks_carry_kind_and_run_id() {
        let mut scheduler = Scheduler::from_group(&TaskGroup::default_group()).unwrap();
        let ready = trigger_roots(&mut scheduler);
        let css = ready.iter().find(|t| t.name == "css").unwrap();
        assert_eq!(css.kind, crate::tasks::TaskKind::Css);
        assert_eq!(css.run_id, 1);
    }
}
