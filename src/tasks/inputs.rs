// src/tasks/inputs.rs

//! Input pattern sets for the asset tasks.
//!
//! The four extension-based sets are disjoint and `static` takes everything
//! they leave over, so together the five sets partition the source tree.

use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::fs::{walk_files, FileSystem, TreeFile};
use crate::tasks::TaskKind;

const STYLE_GLOBS: &[&str] = &["**/*.css"];
const SCRIPT_GLOBS: &[&str] = &["**/*.js", "**/*.ts"];
const MARKUP_GLOBS: &[&str] = &["**/*.html"];
const GRAPHIC_GLOBS: &[&str] = &["**/*.svg"];
const EVERYTHING: &[&str] = &["**/*"];

/// Include and exclude globs, relative to the tree they are matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPatterns {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl InputPatterns {
    fn new(include: &[&str], exclude: &[&str]) -> Self {
        Self {
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Source-tree patterns of an asset task. `compress` reads the build
    /// tree instead, where it takes every file.
    pub fn for_task(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Css => Self::new(STYLE_GLOBS, &[]),
            TaskKind::Js => Self::new(SCRIPT_GLOBS, &[]),
            TaskKind::Html => Self::new(MARKUP_GLOBS, &[]),
            TaskKind::Svg => Self::new(GRAPHIC_GLOBS, &[]),
            TaskKind::Static => {
                let claimed: Vec<&str> = [STYLE_GLOBS, SCRIPT_GLOBS, MARKUP_GLOBS, GRAPHIC_GLOBS]
                    .concat();
                Self::new(EVERYTHING, &claimed)
            }
            TaskKind::Compress => Self::new(EVERYTHING, &[]),
        }
    }

    /// Patterns in display form, exclusions prefixed with `!`.
    pub fn describe(&self) -> Vec<String> {
        self.include
            .iter()
            .cloned()
            .chain(self.exclude.iter().map(|p| format!("!{p}")))
            .collect()
    }

    pub fn compile(&self) -> Result<InputMatcher> {
        let include = build_globset(&self.include).context("compiling include patterns")?;
        let exclude = if self.exclude.is_empty() {
            None
        } else {
            Some(build_globset(&self.exclude).context("compiling exclude patterns")?)
        };
        Ok(InputMatcher { include, exclude })
    }
}

/// Compiled form of [`InputPatterns`].
#[derive(Debug, Clone)]
pub struct InputMatcher {
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl InputMatcher {
    /// `rel_path` uses forward slashes and is relative to the matched tree.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.include.is_match(rel_path)
            && !self
                .exclude
                .as_ref()
                .is_some_and(|exclude| exclude.is_match(rel_path))
    }
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Files under `root` selected by `patterns`, sorted by relative path.
pub fn collect_matching(
    fs: &dyn FileSystem,
    root: &Path,
    patterns: &InputPatterns,
) -> Result<Vec<TreeFile>> {
    let matcher = patterns.compile()?;
    Ok(walk_files(fs, root)?
        .into_iter()
        .filter(|file| matcher.matches(&file.rel))
        .collect())
}

/// Which asset task owns a source file.
pub fn classify(rel_path: &str) -> Result<TaskKind> {
    for kind in [TaskKind::Css, TaskKind::Js, TaskKind::Html, TaskKind::Svg] {
        if InputPatterns::for_task(kind).compile()?.matches(rel_path) {
            return Ok(kind);
        }
    }
    Ok(TaskKind::Static)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn extensions_pick_the_owning_task() {
        let cases = [
            ("css/tailwindcss.css", TaskKind::Css),
            ("deep/nested/theme.css", TaskKind::Css),
            ("js/app.js", TaskKind::Js),
            ("js/types/model.ts", TaskKind::Js),
            ("index.html", TaskKind::Html),
            ("img/logo.svg", TaskKind::Svg),
            ("img/photo.png", TaskKind::Static),
            ("robots.txt", TaskKind::Static),
            ("js/app.js.map", TaskKind::Static),
        ];
        for (path, kind) in cases {
            assert_eq!(classify(path).unwrap(), kind, "{path}");
        }
    }

    #[test]
    fn every_file_matches_exactly_one_asset_task() {
        let matchers: Vec<(TaskKind, InputMatcher)> = TaskKind::ASSETS
            .into_iter()
            .map(|k| (k, InputPatterns::for_task(k).compile().unwrap()))
            .collect();

        for path in ["a.css", "b/c.ts", "d.html", "e/f.svg", "g.woff2", "h", "i/j.json"] {
            let owners: Vec<TaskKind> = matchers
                .iter()
                .filter(|(_, m)| m.matches(path))
                .map(|(k, _)| *k)
                .collect();
            assert_eq!(owners.len(), 1, "{path} owned by {owners:?}");
        }
    }

    #[test]
    fn static_patterns_describe_their_exclusions() {
        let described = InputPatterns::for_task(TaskKind::Static).describe();
        assert_eq!(described[0], "**/*");
        assert!(described.contains(&"!**/*.ts".to_string()));
    }

    #[test]
    fn collect_filters_and_sorts() {
        let fs = MockFileSystem::new();
        fs.add_file("src/js/b.js", "b");
        fs.add_file("src/js/a.ts", "a");
        fs.add_file("src/index.html", "<p></p>");

        let files =
            collect_matching(&fs, Path::new("src"), &InputPatterns::for_task(TaskKind::Js)).unwrap();
        let rels: Vec<&str> = files.iter().map(|f| f.rel.as_str()).collect();
        assert_eq!(rels, vec!["js/a.ts", "js/b.js"]);
    }
}
