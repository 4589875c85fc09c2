// src/tasks/copy.rs

//! Per-file tasks (`html`, `svg`, `static`): every input lands at the same
//! relative path under the build root, minified in production where a
//! minifier applies.

use anyhow::{Context, Result};
use tracing::debug;

use crate::tasks::inputs::{collect_matching, InputPatterns};
use crate::tasks::{AssetTask, BuildContext, TaskKind};
use crate::transform::markup::MarkupMinifier;
use crate::transform::{apply_all, Transform};

fn steps(kind: TaskKind, ctx: &BuildContext) -> Vec<Box<dyn Transform>> {
    if !ctx.mode().is_production() {
        return Vec::new();
    }
    match kind {
        TaskKind::Html => vec![Box::new(MarkupMinifier::html())],
        TaskKind::Svg => vec![Box::new(MarkupMinifier::svg())],
        _ => Vec::new(),
    }
}

pub fn plan(kind: TaskKind, ctx: &BuildContext) -> AssetTask {
    AssetTask {
        kind,
        inputs: InputPatterns::for_task(kind).describe(),
        steps: steps(kind, ctx).iter().map(|s| s.name().to_string()).collect(),
        output: ctx.build_dir().display().to_string(),
        reload: true,
    }
}

pub fn run(kind: TaskKind, ctx: &BuildContext) -> Result<Vec<String>> {
    let steps = steps(kind, ctx);
    let build = ctx.build_dir();
    let files = collect_matching(ctx.fs(), &ctx.src_dir(), &InputPatterns::for_task(kind))?;

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let target = build.join(&file.rel);
        if steps.is_empty() {
            // Byte copy: static inputs need not be text.
            let bytes = ctx.fs().read(&file.path)?;
            ctx.fs().write(&target, &bytes)?;
        } else {
            let source = ctx.fs().read_to_string(&file.path)?;
            let output =
                apply_all(&steps, source).with_context(|| format!("minifying {}", file.rel))?;
            ctx.fs().write(&target, output.as_bytes())?;
        }
        debug!(task = %kind, file = %file.rel, "wrote");
        written.push(file.rel);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ConfigFile;
    use crate::fs::mock::MockFileSystem;
    use crate::types::BuildMode;

    fn context(fs: &MockFileSystem, mode: BuildMode) -> BuildContext {
        BuildContext::new(Arc::new(fs.clone()), mode, "site", ConfigFile::defaults())
    }

    #[test]
    fn markup_keeps_its_relative_path() {
        let fs = MockFileSystem::new();
        let page = "<html>\n  <body>\n    <p>hi</p>\n  </body>\n</html>\n";
        fs.add_file("site/src/index.html", page);
        fs.add_file("site/src/about/team.html", "<p>team</p>");

        let written = run(TaskKind::Html, &context(&fs, BuildMode::Development)).unwrap();
        assert_eq!(written, vec!["about/team.html", "index.html"]);
        assert_eq!(fs.contents("site/build/index.html").unwrap(), page);
    }

    #[test]
    fn production_minifies_markup_and_graphics() {
        let fs = MockFileSystem::new();
        fs.add_file("site/src/index.html", "<p>\n  hi\n</p>\n");
        fs.add_file("site/src/img/dot.svg", "<?xml version=\"1.0\"?>\n<svg>\n  <circle r=\"1\"/>\n</svg>\n");

        let ctx = context(&fs, BuildMode::Production);
        run(TaskKind::Html, &ctx).unwrap();
        run(TaskKind::Svg, &ctx).unwrap();

        assert_eq!(fs.contents("site/build/index.html").unwrap(), "<p>hi</p>");
        assert_eq!(
            fs.contents("site/build/img/dot.svg").unwrap(),
            "<svg><circle r=\"1\"/></svg>"
        );
    }

    #[test]
    fn static_files_are_copied_byte_for_byte() {
        let fs = MockFileSystem::new();
        let png: Vec<u8> = vec![0x89, b'P', b'N', b'G', 0xff, 0x00];
        fs.add_file("site/src/img/a.png", png.clone());
        fs.add_file("site/src/css/ignored.css", ".a{}");

        let written = run(TaskKind::Static, &context(&fs, BuildMode::Production)).unwrap();
        assert_eq!(written, vec!["img/a.png"]);
        assert!(fs.contents("site/build/css/ignored.css").is_none());

        let copied = fs.files_under("site/build");
        assert_eq!(copied, vec![std::path::PathBuf::from("site/build/img/a.png")]);
    }

    #[test]
    fn plan_shows_minifier_only_in_production() {
        let fs = MockFileSystem::new();
        assert!(plan(TaskKind::Svg, &context(&fs, BuildMode::Development)).steps.is_empty());
        assert_eq!(
            plan(TaskKind::Svg, &context(&fs, BuildMode::Production)).steps,
            vec!["svg-minify"]
        );
        assert!(plan(TaskKind::Static, &context(&fs, BuildMode::Production)).steps.is_empty());
    }
}
