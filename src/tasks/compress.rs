// src/tasks/compress.rs

//! The `compress` task: every file of the build tree gets one sibling per
//! encoding under the distribution root (`<rel>.gz`, `<rel>.br`).

use anyhow::{Context, Result};
use tracing::debug;

use crate::fs::walk_files;
use crate::tasks::inputs::InputPatterns;
use crate::tasks::{AssetTask, BuildContext, TaskKind};
use crate::transform::compress::Encoding;

/// Distribution path of `rel` under `encoding`.
pub fn compressed_name(rel: &str, encoding: Encoding) -> String {
    format!("{rel}.{}", encoding.extension())
}

pub fn plan(ctx: &BuildContext) -> AssetTask {
    AssetTask {
        kind: TaskKind::Compress,
        inputs: InputPatterns::for_task(TaskKind::Compress)
            .describe()
            .into_iter()
            .map(|p| format!("{}/{p}", ctx.build_dir().display()))
            .collect(),
        steps: Encoding::ALL
            .iter()
            .map(|e| format!("{e:?}").to_lowercase())
            .collect(),
        output: ctx.dist_dir().display().to_string(),
        reload: false,
    }
}

pub fn run(ctx: &BuildContext) -> Result<Vec<String>> {
    let dist = ctx.dist_dir();
    let files = walk_files(ctx.fs(), &ctx.build_dir())?;

    let mut written = Vec::with_capacity(files.len() * Encoding::ALL.len());
    for file in files {
        let bytes = ctx.fs().read(&file.path)?;
        for encoding in Encoding::ALL {
            let encoded = encoding
                .encode(&bytes)
                .with_context(|| format!("compressing {}", file.rel))?;
            let name = compressed_name(&file.rel, encoding);
            ctx.fs().write(&dist.join(&name), &encoded)?;
            debug!(file = %file.rel, ?encoding, size = encoded.len(), "compressed");
            written.push(name);
        }
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

    #[test]
    fn two_artifacts_per_build_file() {
        let fs = MockFileSystem::new();
        fs.add_file("site/build/index.html", "<p>hi</p>");
        fs.add_file("site/build/css/main.css", ".a{color:red}");
        fs.add_file("site/src/ignored.txt", "not compressed");

        let ctx = BuildContext::new(
            Arc::new(fs.clone()),
            BuildMode::Production,
            "site",
            ConfigFile::defaults(),
        );
        let written = run(&ctx).unwrap();

        assert_eq!(
            written,
            vec!["css/main.css.gz", "css/main.css.br", "index.html.gz", "index.html.br"]
        );
        assert_eq!(fs.files_under("site/dist").len(), 4);
    }

    #[test]
    fn empty_build_tree_is_not_an_error() {
        let fs = MockFileSystem::new();
        let ctx = BuildContext::new(
            Arc::new(fs.clone()),
            BuildMode::Development,
            "site",
            ConfigFile::defaults(),
        );
        assert!(run(&ctx).unwrap().is_empty());
    }

    #[test]
    fn names_append_the_encoding_suffix() {
        assert_eq!(compressed_name("a/b.js", Encoding::Gzip), "a/b.js.gz");
        assert_eq!(compressed_name("a/b.js", Encoding::Brotli), "a/b.js.br");
    }
}
