// src/exec/executor_loop.rs

//! Main executor loop that manages running tasks.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskName};
use crate::exec::task_runner::run_task;
use crate::tasks::BuildContext;

/// Spawn the background executor loop.
///
/// The returned `mpsc::Sender<ScheduledTask>` is what `RealExecutorBackend`
/// forwards scheduled tasks into. Different tasks run concurrently, but
/// **per task name there is never more than one instance running at the
/// same time**: a task scheduled again while its previous instance is still
/// writing output starts only once that instance has finished.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    ctx: BuildContext,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<TaskName, JoinHandle<()>> = HashMap::new();

        while let Some(task) = rx.recv().await {
            handle_scheduled_task(task, &mut active, &runtime_tx, &ctx);
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}

fn handle_scheduled_task(
    task: ScheduledTask,
    active: &mut HashMap<TaskName, JoinHandle<()>>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    ctx: &BuildContext,
) {
    let name = task.name.clone();
    let previous = active.remove(&name).filter(|handle| !handle.is_finished());

    if previous.is_some() {
        debug!(
            task = %name,
            run_id = task.run_id,
            "previous instance still running; new instance will wait for it"
        );
    }

    let rt_tx = runtime_tx.clone();
    let ctx = ctx.clone();
    let spawn_name = name.clone();

    let handle = tokio::spawn(async move {
        if let Some(previous) = previous {
            // Its outcome was already reported by its own runner.
            let _ = previous.await;
        }
        run_task(task, ctx, rt_tx).await;
        debug!(task = %spawn_name, "task runner future finished");
    });

    active.insert(name, handle);
}
