// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::{AssetdagError, Result};
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent, TaskName};

/// Async shell around [`CoreRuntime`].
///
/// Pulls events off the channel (triggers from the watcher or the startup
/// code, completions from the executor, Ctrl-C), feeds them to the core and
/// carries out the commands it returns. All decisions live in the core.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Process events until the core asks to stop or every sender is gone.
    ///
    /// Returns the tasks that failed (or were blocked by a failure) while
    /// the loop ran, in the order the core saw them. A one-shot build
    /// stopped by a shutdown request is an [`AssetdagError::Interrupted`].
    pub async fn run(mut self) -> Result<Vec<TaskName>> {
        info!("runtime started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "event");
            let step = self.core.step(event);

            for command in step.commands {
                match command {
                    CoreCommand::DispatchTasks(tasks) => {
                        debug!(
                            tasks = ?tasks.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
                            run_id = tasks.first().map(|t| t.run_id),
                            "dispatching"
                        );
                        self.executor.spawn_ready_tasks(tasks).await?;
                    }
                    CoreCommand::RequestExit => debug!("build complete"),
                }
            }

            if !step.keep_running {
                break;
            }
        }

        if let Some(unfinished) = self.core.take_interrupted() {
            return Err(AssetdagError::Interrupted(unfinished));
        }

        let failed = self.core.take_failed();
        info!(failed = failed.len(), "runtime stopped");
        Ok(failed)
    }
}
