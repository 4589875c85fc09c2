// src/tasks/group.rs

use std::fmt;

use crate::tasks::inputs::InputPatterns;
use crate::tasks::TaskKind;

/// Composition of tasks.
///
/// `Series` elements run one after another; `Parallel` members have no
/// ordering between them. Groups compile to a task graph with
/// [`crate::dag::DagGraph::from_group`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskGroup {
    Series(Vec<TaskGroup>),
    Parallel(Vec<TaskGroup>),
    Task(TaskKind),
}

impl TaskGroup {
    /// Every asset task, concurrently.
    pub fn default_group() -> Self {
        TaskGroup::Parallel(TaskKind::ASSETS.into_iter().map(TaskGroup::Task).collect())
    }

    /// A full build, then compression of the build tree.
    pub fn distribute() -> Self {
        TaskGroup::Series(vec![
            Self::default_group(),
            TaskGroup::Task(TaskKind::Compress),
        ])
    }

    /// Task references in declaration order.
    pub fn tasks(&self) -> Vec<TaskKind> {
        let mut out = Vec::new();
        self.collect_tasks(&mut out);
        out
    }

    fn collect_tasks(&self, out: &mut Vec<TaskKind>) {
        match self {
            TaskGroup::Task(kind) => out.push(*kind),
            TaskGroup::Series(items) | TaskGroup::Parallel(items) => {
                for item in items {
                    item.collect_tasks(out);
                }
            }
        }
    }
}

impl fmt::Display for TaskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, items) = match self {
            TaskGroup::Task(kind) => return write!(f, "{kind}"),
            TaskGroup::Series(items) => ("series", items),
            TaskGroup::Parallel(items) => ("parallel", items),
        };
        write!(f, "{label}(")?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str(")")
    }
}

/// File patterns (relative to the source root) that re-run a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchBinding {
    pub task: TaskKind,
    pub patterns: InputPatterns,
}

/// One binding per asset task, watching exactly that task's inputs.
pub fn watch_bindings() -> Vec<WatchBinding> {
    TaskKind::ASSETS
        .into_iter()
        .map(|task| WatchBinding {
            task,
            patterns: InputPatterns::for_task(task),
        })
        .collect()
}
