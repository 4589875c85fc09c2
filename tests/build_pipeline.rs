// tests/build_pipeline.rs

use std::io::Read;

use tokio::sync::mpsc;

use assetdag::config::ConfigFile;
use assetdag::dag::Scheduler;
use assetdag::engine::{
    CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use assetdag::exec::RealExecutorBackend;
use assetdag::fs::{walk_files, RealFileSystem};
use assetdag::server::ReloadHub;
use assetdag::tasks::inputs::classify;
use assetdag::tasks::{run_task, BuildContext, TaskGroup, TaskKind};
use assetdag::types::BuildMode;
use assetdag_test_utils::builders::{Project, ProjectBuilder};
use assetdag_test_utils::{init_tracing, with_timeout};

const ENTRY: &str = "@tailwind utilities;\n\nh1 {\n  @apply p-4;\n}\n";
const EXTRA: &str = ".foo{color:red}\n.no-select{user-select:none}\n";

fn styles_project() -> Project {
    ProjectBuilder::new()
        .file("src/css/tailwindcss.css", ENTRY)
        .file("src/css/extra.css", EXTRA)
        .file("src/index.html", "<html><body><h1>Hello</h1></body></html>")
        .build()
}

fn site_project() -> Project {
    ProjectBuilder::new()
        .file("src/css/tailwindcss.css", ENTRY)
        .file("src/css/extra.css", EXTRA)
        .file("src/js/a.ts", "function greet(name: string): string {\n  return \"hi \" + name;\n}\n")
        .file("src/js/b.js", "function twice(x) {\n  // double it\n  return x * 2;\n}\n")
        .file("src/index.html", "<html>\n  <body>\n    <h1 class=\"foo\">Hi</h1>\n  </body>\n</html>\n")
        .file("src/img/logo.svg", "<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\">\n  <circle r=\"4\"/>\n</svg>\n")
        .file("src/img/photo.png", "\u{89}PNG fake")
        .file("src/robots.txt", "User-agent: *\n")
        .build()
}

fn run_all(ctx: &BuildContext, kinds: &[TaskKind]) {
    for kind in kinds {
        run_task(*kind, ctx).unwrap_or_else(|e| panic!("{kind} failed: {e}"));
    }
}

#[test]
fn development_styles_keep_utilities_and_plain_rules() {
    init_tracing();
    let project = styles_project();
    let ctx = project.context(BuildMode::Development, ConfigFile::defaults());

    run_task(TaskKind::Css, &ctx).unwrap();
    let css = project.read("build/css/main.css");

    assert!(css.contains(".p-4"), "{css}");
    assert!(css.contains("padding: 1rem"), "{css}");
    assert!(css.contains(".foo{color:red}"), "{css}");
    assert!(css.contains("-webkit-user-select: none"), "{css}");
    // Not minified.
    assert!(css.contains('\n'));
    // Entry first.
    assert!(css.find(".p-4").unwrap() < css.find(".foo").unwrap());
}

#[test]
fn production_styles_are_purged_and_minified() {
    init_tracing();
    let project = styles_project();
    let ctx = project.context(BuildMode::Production, ConfigFile::defaults());

    run_task(TaskKind::Css, &ctx).unwrap();
    let css = project.read("build/css/main.css");

    assert!(!css.contains(".p-4"), "{css}");
    assert!(!css.contains('\n'), "{css}");
    assert!(!css.contains("} "), "{css}");
    // `@apply` on an element selector still inlines the utility.
    assert!(css.contains("h1{padding:1rem}"), "{css}");
}

#[test]
fn typed_scripts_are_stripped_and_concatenated_after_plain_ones() {
    init_tracing();
    let project = site_project();
    let ctx = project.context(BuildMode::Development, ConfigFile::defaults());

    run_task(TaskKind::Js, &ctx).unwrap();
    let js = project.read("build/js/main.js");

    assert!(js.contains("function twice(x)"), "{js}");
    assert!(js.contains("function greet(name) {"), "{js}");
    assert!(!js.contains(": string"), "{js}");
    assert!(js.find("twice").unwrap() < js.find("greet").unwrap());
}

#[test]
fn script_size_matches_concatenation_in_development_and_shrinks_in_production() {
    init_tracing();
    let project = ProjectBuilder::new()
        .file("src/js/a.js", "const a = 1; // one\n")
        .file("src/js/b.js", "function add(x, y) {\n  return x + y;\n}\n")
        .build();
    let concatenated = format!("{}\n{}", project.read("src/js/a.js"), project.read("src/js/b.js"));

    let dev = project.context(BuildMode::Development, ConfigFile::defaults());
    run_task(TaskKind::Js, &dev).unwrap();
    assert_eq!(project.read("build/js/main.js"), concatenated);

    let prod = project.context(BuildMode::Production, ConfigFile::defaults());
    run_task(TaskKind::Js, &prod).unwrap();
    assert!(project.read("build/js/main.js").len() <= concatenated.len());
}

#[test]
fn asset_tasks_partition_the_source_tree() {
    init_tracing();
    let project = site_project();

    let mut owners: Vec<(String, TaskKind)> = walk_files(&RealFileSystem, &project.root().join("src"))
        .unwrap()
        .into_iter()
        .map(|f| {
            let kind = classify(&f.rel).unwrap();
            (f.rel, kind)
        })
        .collect();
    owners.sort();

    let ctx = project.context(BuildMode::Development, ConfigFile::defaults());
    run_all(&ctx, &[TaskKind::Html, TaskKind::Svg, TaskKind::Static]);

    // Copying tasks mirror their files one-to-one.
    for (rel, kind) in owners.iter() {
        if matches!(kind, TaskKind::Html | TaskKind::Svg | TaskKind::Static) {
            assert_eq!(project.read_bytes(&format!("build/{rel}")), project.read_bytes(&format!("src/{rel}")));
        }
    }
    let static_files: Vec<&str> = owners
        .iter()
        .filter(|(_, k)| *k == TaskKind::Static)
        .map(|(rel, _)| rel.as_str())
        .collect();
    assert_eq!(static_files, vec!["img/photo.png", "robots.txt"]);
}

#[test]
fn compress_writes_two_artifacts_per_build_file() {
    init_tracing();
    let project = site_project();
    let ctx = project.context(BuildMode::Production, ConfigFile::defaults());

    run_all(&ctx, &TaskKind::ASSETS);
    let build_files = project.files_under("build");
    run_task(TaskKind::Compress, &ctx).unwrap();

    let dist_files = project.files_under("dist");
    assert_eq!(dist_files.len(), 2 * build_files.len());

    let mut gz = Vec::new();
    flate2::read::GzDecoder::new(&project.read_bytes("dist/index.html.gz")[..])
        .read_to_end(&mut gz)
        .unwrap();
    assert_eq!(gz, project.read_bytes("build/index.html"));

    let mut br = Vec::new();
    brotli::Decompressor::new(&project.read_bytes("dist/css/main.css.br")[..], 4096)
        .read_to_end(&mut br)
        .unwrap();
    assert_eq!(br, project.read_bytes("build/css/main.css"));
}

#[test]
fn asset_tasks_announce_their_outputs() {
    init_tracing();
    let project = site_project();
    let hub = ReloadHub::new();
    let mut rx = hub.subscribe();
    let ctx = project
        .context(BuildMode::Development, ConfigFile::defaults())
        .with_reload(hub);

    run_task(TaskKind::Css, &ctx).unwrap();
    run_task(TaskKind::Compress, &ctx).unwrap();

    assert_eq!(rx.try_recv().unwrap().paths, vec!["css/main.css"]);
    assert!(rx.try_recv().is_err(), "compress must not notify");
}

async fn build_default_group(ctx: BuildContext) -> Vec<String> {
    let scheduler = Scheduler::from_group(&TaskGroup::default_group()).unwrap();
    let roots = scheduler.graph().roots();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executor = RealExecutorBackend::new(rt_tx.clone(), ctx);
    for task in roots {
        rt_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::Manual,
            })
            .await
            .unwrap();
    }

    let core = CoreRuntime::new(
        scheduler,
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    with_timeout(Runtime::new(core, rt_rx, executor).run()).await.unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn default_group_is_idempotent() {
    init_tracing();
    for mode in [BuildMode::Development, BuildMode::Production] {
        let project = site_project();
        let ctx = project.context(mode, ConfigFile::defaults());

        assert!(build_default_group(ctx.clone()).await.is_empty());
        let first: Vec<(String, Vec<u8>)> = project
            .files_under("build")
            .into_iter()
            .map(|rel| {
                let bytes = project.read_bytes(&format!("build/{rel}"));
                (rel, bytes)
            })
            .collect();

        assert!(build_default_group(ctx).await.is_empty());
        let second: Vec<(String, Vec<u8>)> = project
            .files_under("build")
            .into_iter()
            .map(|rel| {
                let bytes = project.read_bytes(&format!("build/{rel}"));
                (rel, bytes)
            })
            .collect();

        assert_eq!(first, second, "{mode}");
        assert_eq!(first.len(), 6, "{mode}");
    }
}

#[tokio::test]
async fn broken_source_fails_only_its_task() {
    init_tracing();
    let project = ProjectBuilder::new()
        .file("src/js/bad.ts", "let x: = ;")
        .file("src/index.html", "<p>ok</p>")
        .build();
    let ctx = project.context(BuildMode::Development, ConfigFile::defaults());

    let failed = build_default_group(ctx).await;
    assert_eq!(failed, vec!["js".to_string()]);
    assert_eq!(project.read("build/index.html"), "<p>ok</p>");
}
