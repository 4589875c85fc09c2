// src/engine/queue.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::engine::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Re-runs owed to tasks that were triggered while already part of the
/// active run.
///
/// Each task name appears at most once and carries how many more runs it
/// is owed, capped at `queue_length`. Every run opened from the queue takes
/// one re-run from each waiting task, so with the default length of 1 any
/// number of saves during a `css` build re-run `css` exactly once.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    limit: usize,
    owed: BTreeMap<TaskName, usize>,
}

impl TriggerQueue {
    /// `queue_length` below 1 is treated as 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, queue_length: usize) -> Self {
        Self {
            behaviour,
            limit: queue_length.max(1),
            owed: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.owed.is_empty()
    }

    /// `task` was triggered while it is pending or running.
    ///
    /// In `queue` mode the task is owed one more run unless it already owes
    /// `queue_length`. In `cancel` mode everything waiting is dropped and
    /// only this task is re-run.
    pub fn record_trigger(&mut self, task: &str) {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                let owed = self.owed.entry(task.to_string()).or_insert(0);
                if *owed < self.limit {
                    *owed += 1;
                    debug!(task, owed = *owed, "re-run queued");
                } else {
                    debug!(task, limit = self.limit, "re-run coalesced");
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                let dropped: Vec<&TaskName> = self.owed.keys().filter(|t| *t != task).collect();
                if !dropped.is_empty() {
                    debug!(task, ?dropped, "queued re-runs replaced");
                }
                self.owed.clear();
                self.owed.insert(task.to_string(), 1);
            }
        }
    }

    /// Triggers for the next run, sorted by name. Each waiting task gives up
    /// one owed re-run; tasks owing more stay queued for the run after.
    pub fn drain_pending(&mut self) -> Vec<TaskName> {
        let next: Vec<TaskName> = self.owed.keys().cloned().collect();
        self.owed.retain(|_, owed| {
            *owed -= 1;
            *owed > 0
        });
        if !next.is_empty() {
            debug!(tasks = ?next, still_queued = self.owed.len(), "re-runs released");
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_triggers_coalesce_per_task() {
        let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 1);
        queue.record_trigger("js");
        queue.record_trigger("css");
        queue.record_trigger("css");
        assert_eq!(queue.drain_pending(), vec!["css", "js"]);
        assert!(queue.is_empty());
        assert!(queue.drain_pending().is_empty());
    }

    #[test]
    fn longer_queue_owes_several_runs() {
        let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 2);
        for _ in 0..5 {
            queue.record_trigger("css");
        }
        queue.record_trigger("svg");

        assert_eq!(queue.drain_pending(), vec!["css", "svg"]);
        assert_eq!(queue.drain_pending(), vec!["css"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_keeps_only_the_latest_task() {
        let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Cancel, 3);
        queue.record_trigger("css");
        queue.record_trigger("css");
        queue.record_trigger("html");
        assert_eq!(queue.drain_pending(), vec!["html"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn zero_length_still_queues_one_run() {
        let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 0);
        queue.record_trigger("svg");
        queue.record_trigger("svg");
        assert_eq!(queue.drain_pending(), vec!["svg"]);
        assert!(queue.is_empty());
    }
}
