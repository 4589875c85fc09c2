// src/transform/css/tailwind.rs

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::transform::css::ast::{AtBody, AtRule, Decl, Node, Stylesheet};
use crate::transform::css::parser::parse;
use crate::transform::css::utilities::{
    container_nodes, lookup, Utility, BREAKPOINTS, PREFLIGHT, STATE_VARIANTS, UTILITIES,
};
use crate::transform::css::CssPlugin;

/// Expands `@tailwind base|components|utilities;` and `@apply`.
///
/// With a `used` set only classes that appear in it are generated;
/// otherwise the whole table is emitted.
#[derive(Debug, Clone, Default)]
pub struct TailwindDirectives {
    used: Option<Arc<HashSet<String>>>,
}

impl TailwindDirectives {
    /// Emit every utility.
    pub fn full() -> Self {
        Self { used: None }
    }

    /// Emit only utilities whose class name is in `used`.
    pub fn only_used(used: Arc<HashSet<String>>) -> Self {
        Self { used: Some(used) }
    }

    fn selected(&self, class: &str) -> bool {
        self.used.as_ref().is_none_or(|used| used.contains(class))
    }

    fn layer(&self, name: &str) -> Result<Vec<Node>> {
        match name {
            "base" => Ok(parse(PREFLIGHT)?.nodes),
            "components" if self.selected("container") => Ok(container_nodes()),
            "components" => Ok(Vec::new()),
            "utilities" => Ok(self.utilities()),
            other => bail!("unknown @tailwind layer '{other}'"),
        }
    }

    fn utilities(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = UTILITIES
            .iter()
            .filter(|u| self.selected(&u.class))
            .map(|u| Node::Rule(u.rule(None)))
            .collect();

        for state in STATE_VARIANTS {
            nodes.extend(
                UTILITIES
                    .iter()
                    .filter(|u| u.stateful && self.selected(&variant_class(state, u)))
                    .map(|u| Node::Rule(u.rule(Some(*state)))),
            );
        }

        for (prefix, width) in BREAKPOINTS {
            let rules: Vec<Node> = UTILITIES
                .iter()
                .filter(|u| self.selected(&variant_class(prefix, u)))
                .map(|u| Node::Rule(u.rule(Some(*prefix))))
                .collect();
            if !rules.is_empty() {
                nodes.push(Node::AtRule(AtRule::new(
                    "media",
                    format!("(min-width: {width})"),
                    AtBody::Nodes(rules),
                )));
            }
        }

        nodes
    }

    fn expand_apply(&self, sheet: &mut Stylesheet) -> Result<()> {
        let mut failure = None;

        sheet.walk_rules_mut(&mut |_, rule| {
            if failure.is_some() || !rule.decls().iter().any(|d| matches!(d, Decl::Apply(_))) {
                return;
            }
            match inline_applied(rule.decls()) {
                Ok(decls) => *rule.decls_mut() = decls,
                Err(err) => failure = Some(err.context(format!("in rule '{}'", rule.selector()))),
            }
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn variant_class(variant: &str, utility: &Utility) -> String {
    format!("{variant}:{}", utility.class)
}

fn inline_applied(decls: &[Decl]) -> Result<Vec<Decl>> {
    let mut out = Vec::with_capacity(decls.len());
    for decl in decls {
        match decl {
            Decl::Apply(names) => {
                for name in names {
                    let Some(utility) = lookup(name) else {
                        bail!("@apply of unknown utility class '{name}'");
                    };
                    out.extend(utility.decls.iter().cloned());
                }
            }
            other => out.push(other.clone()),
        }
    }
    Ok(out)
}

impl CssPlugin for TailwindDirectives {
    fn name(&self) -> &'static str {
        "tailwind"
    }

    fn run(&self, sheet: &mut Stylesheet) -> Result<()> {
        self.expand_apply(sheet)?;

        let mut nodes = Vec::with_capacity(sheet.nodes.len());
        for node in std::mem::take(&mut sheet.nodes) {
            match node {
                Node::AtRule(at) if at.name() == "tailwind" => {
                    nodes.extend(self.layer(at.params())?);
                }
                other => nodes.push(other),
            }
        }
        sheet.nodes = nodes;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::css::ast::Format;

    fn expand(plugin: &TailwindDirectives, src: &str) -> Result<String> {
        let mut sheet = parse(src)?;
        plugin.run(&mut sheet)?;
        Ok(sheet.to_css(Format::Preserve))
    }

    #[test]
    fn apply_inlines_utility_declarations() {
        let out = expand(&TailwindDirectives::full(), ".btn { @apply px-2 font-bold; }").unwrap();
        assert_eq!(
            out,
            ".btn {\n  padding-left: 0.5rem;\n  padding-right: 0.5rem;\n  font-weight: 700;\n}"
        );
    }

    #[test]
    fn unknown_apply_target_is_an_error() {
        let err = expand(&TailwindDirectives::full(), ".btn { @apply not-a-thing; }").unwrap_err();
        assert!(format!("{err:#}").contains("not-a-thing"));
    }

    #[test]
    fn only_used_utilities_are_generated() {
        let used: HashSet<String> = ["p-4", "md:p-4", "hover:bg-red-500"]
            .into_iter()
            .map(str::to_string)
            .collect();
        let out = expand(
            &TailwindDirectives::only_used(Arc::new(used)),
            "@tailwind components;\n@tailwind utilities;\n",
        )
        .unwrap();

        assert!(out.contains(".p-4 {\n  padding: 1rem;\n}"));
        assert!(out.contains("@media (min-width: 768px) {\n  .md\\:p-4 {\n    padding: 1rem;\n  }\n}"));
        assert!(out.contains(".hover\\:bg-red-500:hover"));
        assert!(!out.contains(".p-2 "));
        assert!(!out.contains(".container"));
        assert!(!out.contains("640px"));
    }

    #[test]
    fn base_layer_emits_preflight() {
        let out = expand(&TailwindDirectives::full(), "@tailwind base;").unwrap();
        assert!(out.starts_with("*,\n::before"));
        assert!(expand(&TailwindDirectives::full(), "@tailwind nope;").is_err());
    }
}
