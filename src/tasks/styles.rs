// src/tasks/styles.rs

//! The `css` task.
//!
//! The entry stylesheet goes through utility expansion and prefixing; every
//! other stylesheet is prefixed (and purged in production). The results are
//! concatenated entry-first into a single file, which production minifies.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::fs::TreeFile;
use crate::tasks::inputs::{collect_matching, InputPatterns};
use crate::tasks::{AssetTask, BuildContext, TaskKind};
use crate::transform::css::{
    extract_tokens, CssProcessor, Minify, Prefixer, Purge, TailwindDirectives,
};
use crate::transform::{apply_all, Transform};

/// Class names and other tokens used by the purge content files.
pub fn content_tokens(ctx: &BuildContext) -> Result<HashSet<String>> {
    let patterns = InputPatterns {
        include: ctx.config().styles.purge_content.clone(),
        exclude: Vec::new(),
    };
    let mut tokens = HashSet::new();
    for file in collect_matching(ctx.fs(), &ctx.src_dir(), &patterns)? {
        let content = ctx.fs().read_to_string(&file.path)?;
        extract_tokens(&content, &mut tokens);
    }
    debug!(tokens = tokens.len(), "collected purge content tokens");
    Ok(tokens)
}

/// Chain applied to the entry stylesheet. `used` restricts generated
/// utilities to those referenced by content.
fn entry_chain(used: Option<Arc<HashSet<String>>>) -> CssProcessor {
    let directives = match used {
        Some(used) => TailwindDirectives::only_used(used),
        None => TailwindDirectives::full(),
    };
    CssProcessor::new().with(directives).with(Prefixer)
}

/// Chain applied to every other stylesheet.
fn other_chain(used: Option<Arc<HashSet<String>>>) -> CssProcessor {
    match used {
        Some(used) => CssProcessor::new().with(Purge::new(used)).with(Prefixer),
        None => CssProcessor::new().with(Prefixer),
    }
}

/// Steps run over the concatenated output.
fn output_steps(ctx: &BuildContext) -> Vec<Box<dyn Transform>> {
    if ctx.mode().is_production() {
        vec![Box::new(CssProcessor::new().with(Minify))]
    } else {
        Vec::new()
    }
}

pub fn plan(ctx: &BuildContext) -> AssetTask {
    let used = ctx
        .mode()
        .is_production()
        .then(|| Arc::new(HashSet::new()));
    let entry = entry_chain(used.clone()).plugin_names().join("+");
    let others = other_chain(used).plugin_names().join("+");

    let mut steps = vec![format!("entry: {entry}"), format!("others: {others}"), "concat".to_string()];
    if ctx.mode().is_production() {
        steps.push("minify".to_string());
    }

    AssetTask {
        kind: TaskKind::Css,
        inputs: InputPatterns::for_task(TaskKind::Css).describe(),
        steps,
        output: ctx
            .build_dir()
            .join(&ctx.config().styles.output)
            .display()
            .to_string(),
        reload: true,
    }
}

pub fn run(ctx: &BuildContext) -> Result<Vec<String>> {
    let src = ctx.src_dir();
    let entry_rel = ctx.config().styles.entry.replace('\\', "/");
    let (entry, others): (Vec<TreeFile>, Vec<TreeFile>) =
        collect_matching(ctx.fs(), &src, &InputPatterns::for_task(TaskKind::Css))?
            .into_iter()
            .partition(|file| file.rel == entry_rel);

    if entry.is_empty() {
        debug!(entry = %entry_rel, "entry stylesheet not present; skipping utility expansion");
    }

    let used = if ctx.mode().is_production() {
        Some(Arc::new(content_tokens(ctx).context("reading purge content")?))
    } else {
        None
    };
    let entry_chain = entry_chain(used.clone());
    let other_chain = other_chain(used);

    let mut parts = Vec::with_capacity(entry.len() + others.len());
    for file in entry.iter() {
        parts.push(process(ctx, &entry_chain, file)?);
    }
    for file in others.iter() {
        parts.push(process(ctx, &other_chain, file)?);
    }

    let output = apply_all(&output_steps(ctx), parts.join("\n")).context("minifying styles")?;

    let out_rel = ctx.config().styles.output.replace('\\', "/");
    ctx.fs().write(&ctx.build_dir().join(&out_rel), output.as_bytes())?;
    Ok(vec![out_rel])
}

fn process(ctx: &BuildContext, chain: &CssProcessor, file: &TreeFile) -> Result<String> {
    let source = ctx.fs().read_to_string(&file.path)?;
    chain
        .apply(&source)
        .with_context(|| format!("processing {}", file.rel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use crate::fs::mock::MockFileSystem;
    use crate::types::BuildMode;

    fn context(fs: &MockFileSystem, mode: BuildMode) -> BuildContext {
        BuildContext::new(Arc::new(fs.clone()), mode, "site", ConfigFile::defaults())
    }

    #[test]
    fn entry_comes_first_then_others_sorted() {
        let fs = MockFileSystem::new();
        fs.add_file("site/src/css/z.css", ".z{color:red}");
        fs.add_file("site/src/css/a.css", ".a{color:blue}");
        fs.add_file("site/src/css/tailwindcss.css", ".entry{margin:0}");

        let written = run(&context(&fs, BuildMode::Development)).unwrap();
        assert_eq!(written, vec!["css/main.css"]);
        assert_eq!(
            fs.contents("site/build/css/main.css").unwrap(),
            ".entry{margin:0}\n.a{color:blue}\n.z{color:red}"
        );
    }

    #[test]
    fn missing_entry_and_no_styles_yield_empty_output() {
        let fs = MockFileSystem::new();
        fs.add_file("site/src/index.html", "<p></p>");

        run(&context(&fs, BuildMode::Development)).unwrap();
        assert_eq!(fs.contents("site/build/css/main.css").unwrap(), "");
    }

    #[test]
    fn production_purges_other_files_against_content() {
        let fs = MockFileSystem::new();
        fs.add_file("site/src/css/extra.css", ".kept { color: red }\n.gone { color: blue }\n");
        fs.add_file("site/src/index.html", "<p class=\"kept\">hi</p>");

        run(&context(&fs, BuildMode::Production)).unwrap();
        assert_eq!(fs.contents("site/build/css/main.css").unwrap(), ".kept{color:red}");
    }

    #[test]
    fn malformed_stylesheet_fails_with_file_name() {
        let fs = MockFileSystem::new();
        fs.add_file("site/src/css/broken.css", ".a { color: red");

        let err = run(&context(&fs, BuildMode::Development)).unwrap_err();
        assert!(format!("{err:#}").contains("css/broken.css"));
    }

    #[test]
    fn plan_lists_mode_specific_chains() {
        let fs = MockFileSystem::new();
        let dev = plan(&context(&fs, BuildMode::Development));
        assert_eq!(dev.steps, vec!["entry: tailwind+prefix", "others: prefix", "concat"]);

        let prod = plan(&context(&fs, BuildMode::Production));
        assert_eq!(
            prod.steps,
            vec!["entry: tailwind+prefix", "others: purge+prefix", "concat", "minify"]
        );
        assert_eq!(prod.output, "site/build/css/main.css");
    }
}
