// src/exec/task_runner.rs

//! Individual task runner.

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::tasks::{run_task as run_asset_task, BuildContext};

/// Run a single task on the blocking pool and emit its `TaskCompleted`
/// event.
///
/// A task that panics is reported as failed like any other error.
pub async fn run_task(
    task: ScheduledTask,
    ctx: BuildContext,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    info!(task = %task.name, run_id = task.run_id, "starting task");

    let kind = task.kind;
    let joined = tokio::task::spawn_blocking(move || run_asset_task(kind, &ctx)).await;

    let outcome = match joined {
        Ok(Ok(written)) => {
            info!(
                task = %task.name,
                run_id = task.run_id,
                files = written.len(),
                "task finished"
            );
            TaskOutcome::Success
        }
        Ok(Err(err)) => TaskOutcome::Failed(err.to_string()),
        Err(join_err) => {
            error!(task = %task.name, run_id = task.run_id, error = %join_err, "task aborted");
            TaskOutcome::Failed(format!("task '{}' aborted: {join_err}", task.name))
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        error!(task = %task.name, "runtime stopped before task completion was delivered");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ConfigFile;
    use crate::fs::mock::MockFileSystem;
    use crate::tasks::TaskKind;
    use crate::types::BuildMode;

    fn ctx(fs: &MockFileSystem) -> BuildContext {
        BuildContext::new(
            Arc::new(fs.clone()),
            BuildMode::Development,
            "site",
            ConfigFile::defaults(),
        )
    }

    fn scheduled(kind: TaskKind) -> ScheduledTask {
        ScheduledTask {
            name: kind.name().to_string(),
            kind,
            run_id: 1,
        }
    }

    #[tokio::test]
    async fn success_is_reported() {
        let fs = MockFileSystem::new();
        fs.add_file("site/src/index.html", "<p>hi</p>");
        let (tx, mut rx) = mpsc::channel(4);

        run_task(scheduled(TaskKind::Html), ctx(&fs), tx).await;

        match rx.recv().await {
            Some(RuntimeEvent::TaskCompleted { task, outcome }) => {
                assert_eq!(task, "html");
                assert_eq!(outcome, TaskOutcome::Success);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(fs.contents("site/build/index.html").is_some());
    }

    #[tokio::test]
    async fn transform_error_is_reported_as_failure() {
        let fs = MockFileSystem::new();
        fs.add_file("site/src/js/broken.ts", "let x: = ;");
        let (tx, mut rx) = mpsc::channel(4);

        run_task(scheduled(TaskKind::Js), ctx(&fs), tx).await;

        match rx.recv().await {
            Some(RuntimeEvent::TaskCompleted { outcome: TaskOutcome::Failed(message), .. }) => {
                assert!(message.contains("broken.ts"), "{message}");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
