// src/transform/css/purge.rs

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use anyhow::Result;
use regex::Regex;

use crate::transform::css::ast::{Node, Rule, Stylesheet};
use crate::transform::css::parser::split_top_level;
use crate::transform::css::CssPlugin;

static CONTENT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9_\-/:.]+").unwrap_or_else(|err| panic!("content token regex: {err}"))
});

/// At-rules kept regardless of the content scan.
const ALWAYS_KEPT: &[&str] = &["font-face", "import", "charset", "page", "namespace"];

/// Every candidate class name or id appearing in `content`.
///
/// Tokens are maximal runs of identifier characters plus `-/:.`, so variant
/// and fraction classes such as `md:w-1/2` survive intact; each token's
/// `.`/`:`/`/`-separated parts are added as well.
pub fn extract_tokens(content: &str, into: &mut HashSet<String>) {
    for m in CONTENT_TOKEN.find_iter(content) {
        let token = m.as_str();
        into.insert(token.to_string());
        for part in token.split(['.', ':', '/']) {
            if !part.is_empty() {
                into.insert(part.to_string());
            }
        }
    }
}

/// Class names and ids referenced by a selector, unescaped.
///
/// Names inside `[...]` and `(...)` are ignored: attribute values are not
/// classes, and `:not(.x)` still matches when `.x` is unused.
pub fn selector_names(selector: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut chars = selector.chars().peekable();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '\\' => {
                chars.next();
            }
            '.' | '#' if depth == 0 => {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if next == '\\' {
                        chars.next();
                        if let Some(escaped) = chars.next() {
                            name.push(escaped);
                        }
                    } else if next.is_alphanumeric() || next == '-' || next == '_' || !next.is_ascii() {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if !name.is_empty() {
                    names.push(name);
                }
            }
            _ => {}
        }
    }
    names
}

/// Drops rules whose selectors reference classes or ids that never appear
/// in the scanned content.
#[derive(Debug, Clone)]
pub struct Purge {
    tokens: Arc<HashSet<String>>,
}

impl Purge {
    pub fn new(tokens: Arc<HashSet<String>>) -> Self {
        Self { tokens }
    }

    fn selector_used(&self, selector: &str) -> bool {
        selector_names(selector)
            .iter()
            .all(|name| self.tokens.contains(name))
    }

    /// Keep the rule if any selector survives; narrow the list otherwise.
    fn keep_rule(&self, rule: &mut Rule) -> bool {
        let selectors: Vec<&str> = split_top_level(rule.selector(), b',')
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let kept: Vec<&str> = selectors
            .iter()
            .copied()
            .filter(|s| self.selector_used(s))
            .collect();

        if kept.is_empty() {
            return false;
        }
        if kept.len() < selectors.len() {
            let narrowed = kept.join(", ");
            rule.set_selector(narrowed);
        }
        true
    }

    fn purge_nodes(&self, nodes: &mut Vec<Node>) {
        nodes.retain_mut(|node| match node {
            Node::Trivia(_) => true,
            Node::Rule(rule) => self.keep_rule(rule),
            Node::AtRule(at) => {
                let name = at.name();
                if ALWAYS_KEPT.contains(&name) || name.ends_with("keyframes") {
                    return true;
                }
                match at.nodes_mut() {
                    Some(children) => {
                        self.purge_nodes(children);
                        !at.is_empty_block()
                    }
                    None => true,
                }
            }
        });
    }
}

impl CssPlugin for Purge {
    fn name(&self) -> &'static str {
        "purge"
    }

    fn run(&self, sheet: &mut Stylesheet) -> Result<()> {
        let before = sheet.nodes.len();
        self.purge_nodes(&mut sheet.nodes);
        tracing::trace!(before, after = sheet.nodes.len(), "purged top-level nodes");
        Ok(())
    }
}
