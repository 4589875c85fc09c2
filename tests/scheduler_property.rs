use std::collections::HashSet;

use proptest::prelude::*;

use assetdag::dag::{DagGraph, Scheduler, TaskRunState};
use assetdag::engine::TaskOutcome;
use assetdag::tasks::{TaskGroup, TaskKind};

/// Arbitrary series/parallel nesting over a shuffled subset of the tasks,
/// each task used at most once.
fn group_strategy() -> impl Strategy<Value = TaskGroup> {
    (
        Just(TaskKind::ALL.to_vec()).prop_shuffle(),
        1..=TaskKind::ALL.len(),
        proptest::collection::vec(any::<bool>(), 6),
        proptest::collection::vec(1..=3usize, 6),
    )
        .prop_map(|(tasks, count, series_flags, chunk_sizes)| {
            nest(&tasks[..count], &series_flags, &chunk_sizes, 0)
        })
}

fn nest(tasks: &[TaskKind], series: &[bool], sizes: &[usize], depth: usize) -> TaskGroup {
    if tasks.len() == 1 {
        return TaskGroup::Task(tasks[0]);
    }
    // At least two chunks, so every level shrinks.
    let size = sizes[depth % sizes.len()].min(tasks.len() - 1);
    let children = tasks
        .chunks(size)
        .map(|chunk| nest(chunk, series, sizes, depth + 1))
        .collect();
    if series[depth % series.len()] {
        TaskGroup::Series(children)
    } else {
        TaskGroup::Parallel(children)
    }
}

proptest! {
    #[test]
    fn every_run_terminates_and_respects_dependencies(
        group in group_strategy(),
        failing in proptest::collection::hash_set(0..TaskKind::ALL.len(), 0..3),
    ) {
        let graph = DagGraph::from_group(&group).unwrap();
        let failing: HashSet<String> = failing
            .into_iter()
            .map(|i| TaskKind::ALL[i].name().to_string())
            .collect();

        let mut scheduler = Scheduler::new(graph.clone());
        scheduler.start_new_run();

        let mut ready = Vec::new();
        for root in graph.roots() {
            ready.extend(scheduler.handle_trigger(&root));
        }

        let mut finished: HashSet<String> = HashSet::new();
        let mut steps = 0;
        while let Some(task) = ready.pop() {
            steps += 1;
            prop_assert!(steps <= TaskKind::ALL.len(), "a task was scheduled twice");

            for dep in graph.dependencies_of(&task.name) {
                prop_assert!(finished.contains(dep), "{} ran before {}", task.name, dep);
            }

            let outcome = if failing.contains(&task.name) {
                TaskOutcome::Failed("boom".to_string())
            } else {
                finished.insert(task.name.clone());
                TaskOutcome::Success
            };
            ready.extend(scheduler.step_completion(&task.name, outcome).newly_scheduled);
        }

        prop_assert!(scheduler.is_idle());
        for name in graph.tasks() {
            let state = scheduler.run_state_of(name).unwrap();
            prop_assert!(
                matches!(state, TaskRunState::DoneSuccess | TaskRunState::DoneFailed),
                "{name} left in {state:?}"
            );
            if graph.dependencies_of(name).iter().any(|d| !finished.contains(d)) {
                prop_assert_eq!(state, TaskRunState::DoneFailed);
            }
        }
    }
}
