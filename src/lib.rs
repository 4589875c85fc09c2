// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod server;
pub mod tasks;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, EntryPoint};
use crate::config::load_or_default;
use crate::dag::{DagGraph, Scheduler};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TaskName, TriggerReason};
use crate::errors::AssetdagError;
use crate::exec::RealExecutorBackend;
use crate::fs::RealFileSystem;
use crate::server::{livereload, static_server, ReloadHub};
use crate::tasks::{watch_bindings, BuildContext, TaskGroup};
use crate::types::BuildMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the build mode
/// - scheduler / queue / runtime for the selected group
/// - executor
/// - (watch only) file watcher, live-reload and static servers
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)?;
    let mode = BuildMode::from_env();
    let entry = args.entry_point();
    let group = group_for(&entry);

    let ctx = BuildContext::new(Arc::new(RealFileSystem), mode, config_root_dir(&config_path), cfg);
    info!(entry = ?entry, mode = %mode, root = ?ctx.root(), "assetdag starting");

    if args.dry_run {
        print_dry_run(&entry, &group, &ctx)?;
        return Ok(());
    }

    match entry {
        EntryPoint::Default | EntryPoint::Distribute => run_once(&group, ctx).await,
        EntryPoint::Watch { no_initial_build } => run_watch(ctx, !no_initial_build).await,
    }
}

/// Task group behind an entry point. `watch` rebuilds with the default group.
pub fn group_for(entry: &EntryPoint) -> TaskGroup {
    match entry {
        EntryPoint::Default | EntryPoint::Watch { .. } => TaskGroup::default_group(),
        EntryPoint::Distribute => TaskGroup::distribute(),
    }
}

/// Run every task of `group` once and fail if any of them failed.
async fn run_once(group: &TaskGroup, ctx: BuildContext) -> Result<()> {
    let scheduler = Scheduler::from_group(group)?;
    let roots = scheduler.graph().roots();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = RealExecutorBackend::new(rt_tx.clone(), ctx.clone());
    spawn_ctrl_c(rt_tx.clone());
    trigger_all(&rt_tx, roots).await?;

    let watch = &ctx.config().watch;
    let core = CoreRuntime::new(
        scheduler,
        watch.triggered_while_running_behaviour,
        watch.queue_length,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );

    let failed = Runtime::new(core, rt_rx, executor).run().await?;
    if !failed.is_empty() {
        return Err(AssetdagError::TasksFailed(failed).into());
    }

    info!(group = %group, "build finished");
    Ok(())
}

/// Watch the source tree, serve the build tree and push reload
/// notifications until Ctrl-C.
///
/// Task failures are logged and do not stop watching.
async fn run_watch(ctx: BuildContext, initial_build: bool) -> Result<()> {
    let hub = ReloadHub::new();
    let ctx = ctx.with_reload(hub.clone());
    let server_cfg = ctx.config().server.clone();

    // Bind both ports up front so a port conflict fails before any work.
    let livereload_listener = server::bind(&server_cfg.host, server_cfg.livereload_port).await?;
    let http_listener = server::bind(&server_cfg.host, server_cfg.http_port).await?;

    let mut livereload_server = tokio::spawn(server::serve(
        "livereload",
        livereload_listener,
        livereload::router(hub),
    ));
    let mut http_server = tokio::spawn(server::serve(
        "static",
        http_listener,
        static_server::router(
            ctx.build_dir(),
            static_server::reload_snippet(&server_cfg.host, server_cfg.livereload_port),
        ),
    ));

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    spawn_ctrl_c(rt_tx.clone());

    tokio::select! {
        result = watch_loop(ctx, initial_build, rt_tx, rt_rx) => result,
        result = &mut livereload_server => server_stopped("livereload", result),
        result = &mut http_server => server_stopped("static", result),
    }
}

/// Rebuild the default group whenever a source file changes, until a
/// `ShutdownRequested` arrives on the runtime channel.
///
/// `rt_tx` must feed `rt_rx`. Reload notifications go to whatever hub
/// `ctx` carries. Failed tasks are logged and watching continues.
pub async fn watch_loop(
    ctx: BuildContext,
    initial_build: bool,
    rt_tx: mpsc::Sender<RuntimeEvent>,
    rt_rx: mpsc::Receiver<RuntimeEvent>,
) -> Result<()> {
    let watch_cfg = ctx.config().watch.clone();
    let scheduler = Scheduler::from_group(&TaskGroup::default_group())?;
    let roots = scheduler.graph().roots();
    let executor = RealExecutorBackend::new(rt_tx.clone(), ctx.clone());

    let profiles = watch::build_profiles(&watch_bindings(), watch_cfg.use_hash)?;
    let _watcher = watch::spawn_watcher(ctx.src_dir(), profiles, rt_tx.clone(), Arc::new(RealFileSystem))
        .with_context(|| format!("watching {:?}", ctx.src_dir()))?;

    if initial_build {
        trigger_all(&rt_tx, roots).await?;
    } else {
        debug!("initial build skipped");
    }

    let core = CoreRuntime::new(
        scheduler,
        watch_cfg.triggered_while_running_behaviour,
        watch_cfg.queue_length,
        RuntimeOptions {
            exit_when_idle: false,
        },
    );
    let failed = Runtime::new(core, rt_rx, executor).run().await?;
    if !failed.is_empty() {
        warn!(?failed, "some tasks failed while watching");
    }
    info!("watch stopped");
    Ok(())
}

fn server_stopped(
    name: &str,
    result: std::result::Result<errors::Result<()>, tokio::task::JoinError>,
) -> Result<()> {
    match result {
        Ok(Ok(())) => Err(anyhow::anyhow!("{name} server stopped unexpectedly")),
        Ok(Err(err)) => Err(err.into()),
        Err(join_err) => Err(anyhow::Error::new(join_err).context(format!("{name} server crashed"))),
    }
}

async fn trigger_all(rt_tx: &mpsc::Sender<RuntimeEvent>, tasks: Vec<TaskName>) -> Result<()> {
    info!(?tasks, "triggering group roots");
    for task in tasks {
        rt_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::Manual,
            })
            .await?;
    }
    Ok(())
}

/// Ctrl-C -> graceful shutdown.
fn spawn_ctrl_c(tx: mpsc::Sender<RuntimeEvent>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
    });
}

/// Project root: the directory holding the config file, or `.` for a bare
/// file name like `Assetdag.toml`.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Print the group's task graph and what each task would do.
fn print_dry_run(entry: &EntryPoint, group: &TaskGroup, ctx: &BuildContext) -> Result<()> {
    let graph = DagGraph::from_group(group)?;

    println!("assetdag dry-run");
    println!("  entry point = {entry:?}");
    println!("  mode = {}", ctx.mode());
    println!("  group = {group}");
    println!();

    println!("tasks ({}):", graph.topological_order().len());
    for name in graph.topological_order() {
        let Some(kind) = graph.kind_of(name) else {
            continue;
        };
        let plan = kind.plan(ctx);
        println!("  - {name}");
        println!("      inputs: {}", plan.inputs.join(" "));
        if !plan.steps.is_empty() {
            println!("      steps: {}", plan.steps.join(" -> "));
        }
        println!("      output: {}", plan.output);
        let after = graph.dependencies_of(name);
        if !after.is_empty() {
            println!("      after: {after:?}");
        }
        if plan.reload {
            println!("      reload: true");
        }
    }

    if let EntryPoint::Watch { no_initial_build } = entry {
        let server = &ctx.config().server;
        println!();
        println!("watch ({}):", ctx.src_dir().display());
        for binding in watch_bindings() {
            println!("  {} <- {}", binding.task, binding.patterns.describe().join(" "));
        }
        println!("  initial build: {}", !no_initial_build);
        println!("  livereload: {}:{}", server.host, server.livereload_port);
        println!("  static server: {}:{} serving {}", server.host, server.http_port, ctx.build_dir().display());
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
