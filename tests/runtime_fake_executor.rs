// tests/runtime_fake_executor.rs

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use assetdag::dag::Scheduler;
use assetdag::engine::{
    CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use assetdag::errors::AssetdagError;
use assetdag::tasks::TaskGroup;
use assetdag_test_utils::fake_executor::FakeExecutor;
use assetdag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

struct Outcome {
    executed: Vec<String>,
    failed: Vec<String>,
}

/// Run `group` once with every root triggered, like `assetdag default`.
async fn run_group(group: TaskGroup, failing: &[&str]) -> Result<Outcome, Box<dyn Error>> {
    let scheduler = Scheduler::from_group(&group)?;
    let roots = scheduler.graph().roots();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone()).failing(failing);

    for task in roots {
        rt_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::Manual,
            })
            .await?;
    }

    let core = CoreRuntime::new(
        scheduler,
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    let failed = with_timeout(Runtime::new(core, rt_rx, executor).run()).await?;

    let executed = executed.lock().unwrap().clone();
    Ok(Outcome { executed, failed })
}

#[tokio::test]
async fn default_group_runs_each_asset_task_once() -> TestResult {
    init_tracing();

    let outcome = run_group(TaskGroup::default_group(), &[]).await?;

    let mut executed = outcome.executed.clone();
    executed.sort();
    assert_eq!(executed, vec!["css", "html", "js", "static", "svg"]);
    assert!(outcome.failed.is_empty());
    Ok(())
}

#[tokio::test]
async fn distribute_compresses_after_every_asset_task() -> TestResult {
    init_tracing();

    let outcome = run_group(TaskGroup::distribute(), &[]).await?;

    assert_eq!(outcome.executed.len(), 6);
    assert_eq!(outcome.executed.last().map(String::as_str), Some("compress"));
    Ok(())
}

#[tokio::test]
async fn failed_asset_task_skips_compress() -> TestResult {
    init_tracing();

    let outcome = run_group(TaskGroup::distribute(), &["svg"]).await?;

    assert!(!outcome.executed.contains(&"compress".to_string()));
    assert_eq!(outcome.executed.len(), 5);
    assert_eq!(outcome.failed, vec!["svg".to_string(), "compress".to_string()]);
    Ok(())
}

#[tokio::test]
async fn sibling_failure_does_not_stop_the_others() -> TestResult {
    init_tracing();

    let outcome = run_group(TaskGroup::default_group(), &["css", "js"]).await?;

    assert_eq!(outcome.executed.len(), 5);
    let mut failed = outcome.failed;
    failed.sort();
    assert_eq!(failed, vec!["css", "js"]);
    Ok(())
}

#[tokio::test]
async fn shutdown_before_the_build_settles_is_an_error() -> TestResult {
    init_tracing();

    let scheduler = Scheduler::from_group(&TaskGroup::distribute())?;
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone());

    for task in scheduler.graph().roots() {
        rt_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::Manual,
            })
            .await?;
    }
    // Completions land behind this in the channel.
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;

    let core = CoreRuntime::new(
        scheduler,
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    let result = with_timeout(Runtime::new(core, rt_rx, executor).run()).await;

    match result {
        Err(AssetdagError::Interrupted(unfinished)) => {
            assert_eq!(unfinished, vec!["compress", "css", "html", "js", "static", "svg"]);
        }
        other => panic!("expected an interrupted build, got {other:?}"),
    }
    Ok(())
}
