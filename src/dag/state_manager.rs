// src/dag/state_manager.rs

//! Run-state transitions over the task table of one scheduler.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::dag::DagGraph;
use crate::engine::TaskName;

/// Whether every dependency of `info` allows it to start in the active run.
///
/// A dependency taking part in the run must have finished successfully. One
/// left out of the run counts if it ever succeeded before, so rebuilding a
/// single asset in watch mode does not wait on siblings nobody touched.
pub fn deps_satisfied(tasks: &HashMap<TaskName, TaskInfo>, info: &TaskInfo) -> bool {
    info.deps.iter().all(|dep_name| {
        let Some(dep) = tasks.get(dep_name) else {
            warn!(task = %info.name, dep = %dep_name, "dependency missing from task table");
            return false;
        };
        match dep.run_state {
            Some(RunState::DoneSuccess) => true,
            Some(RunState::Pending | RunState::Running | RunState::DoneFailed) => false,
            None => dep.last_successful_run.is_some(),
        }
    })
}

/// Mutable view of the task table for the duration of one scheduler step.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    run_id: u64,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a DagGraph, tasks: &'a mut HashMap<TaskName, TaskInfo>, run_id: u64) -> Self {
        Self { graph, tasks, run_id }
    }

    /// Pull `root` and everything downstream of it into the run.
    ///
    /// Tasks already in the run keep their state; a finished asset task is
    /// not rebuilt because a sibling was triggered.
    pub fn join_run(&mut self, root: &str) {
        let mut stack = vec![root.to_string()];
        let mut seen: HashSet<TaskName> = HashSet::new();

        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(info) = self.tasks.get_mut(&name) else {
                warn!(task = %name, "graph node missing from task table");
                continue;
            };
            if info.run_state.is_none() {
                info.run_state = Some(RunState::Pending);
                debug!(task = %name, run_id = self.run_id, "joined run");
            }
            stack.extend(self.graph.dependents_of(&name).iter().cloned());
        }
    }

    /// Fail every downstream task of `failed_task` that is still waiting or
    /// running in this run. Returns them in the order they were failed.
    pub fn fail_downstream(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut blocked = Vec::new();

        while let Some(name) = stack.pop() {
            let Some(info) = self.tasks.get_mut(&name) else {
                continue;
            };
            if matches!(info.run_state, Some(RunState::Pending | RunState::Running)) {
                info.run_state = Some(RunState::DoneFailed);
                debug!(task = %name, upstream = %failed_task, "blocked by failed upstream task");
                blocked.push(name.clone());
                stack.extend(self.graph.dependents_of(&name).iter().cloned());
            }
        }

        blocked
    }

    /// Move every pending task whose dependencies are met to `Running` and
    /// hand it back for dispatch.
    pub fn take_ready(&mut self) -> Vec<ScheduledTask> {
        let ready: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| info.run_state == Some(RunState::Pending))
            .filter(|info| deps_satisfied(self.tasks, info))
            .map(|info| info.name.clone())
            .collect();

        let mut scheduled = Vec::with_capacity(ready.len());
        for name in ready {
            let Some(info) = self.tasks.get_mut(&name) else {
                continue;
            };
            let built_before = info.last_successful_run.is_some() || info.last_failed_run.is_some();
            info!(
                task = %name,
                kind = %info.kind,
                run_id = self.run_id,
                rebuild = built_before,
                "scheduling task"
            );
            info.run_state = Some(RunState::Running);
            scheduled.push(ScheduledTask::from_task_info(info, self.run_id));
        }

        scheduled
    }

    /// No task of this run is waiting or running any more.
    pub fn run_settled(&self) -> bool {
        self.tasks
            .values()
            .all(|info| !matches!(info.run_state, Some(RunState::Pending | RunState::Running)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{TaskGroup, TaskKind};

    fn table(graph: &DagGraph) -> HashMap<TaskName, TaskInfo> {
        graph
            .tasks()
            .filter_map(|name| {
                let kind = graph.kind_of(name)?;
                let deps = graph.dependencies_of(name).to_vec();
                Some((name.to_string(), TaskInfo::new(name.to_string(), kind, deps)))
            })
            .collect()
    }

    #[test]
    fn untouched_dependency_counts_once_it_has_succeeded() {
        let graph = DagGraph::from_group(&TaskGroup::distribute()).unwrap();
        let mut tasks = table(&graph);
        let compress = tasks["compress"].clone();
        assert!(!deps_satisfied(&tasks, &compress));

        for kind in TaskKind::ASSETS {
            tasks.get_mut(kind.name()).unwrap().last_successful_run = Some(1);
        }
        assert!(deps_satisfied(&tasks, &compress));
    }

    #[test]
    fn joining_pulls_in_downstream_tasks_only() {
        let graph = DagGraph::from_group(&TaskGroup::distribute()).unwrap();
        let mut tasks = table(&graph);
        let mut manager = StateManager::new(&graph, &mut tasks, 1);

        manager.join_run("svg");
        let ready = manager.take_ready();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].kind, TaskKind::Svg);
        assert!(!manager.run_settled());

        assert_eq!(tasks["compress"].run_state, Some(RunState::Pending));
        assert_eq!(tasks["css"].run_state, None);
    }
}
