// src/transform/css/prefixer.rs

use anyhow::Result;

use crate::transform::css::ast::{Decl, Stylesheet};
use crate::transform::css::CssPlugin;

/// Properties that still need vendor-prefixed fallbacks for the browsers a
/// typical project targets.
const PREFIXED_PROPERTIES: &[(&str, &[&str])] = &[
    ("appearance", &["-webkit-", "-moz-"]),
    ("backdrop-filter", &["-webkit-"]),
    ("box-decoration-break", &["-webkit-"]),
    ("clip-path", &["-webkit-"]),
    ("hyphens", &["-webkit-", "-ms-"]),
    ("mask-image", &["-webkit-"]),
    ("print-color-adjust", &["-webkit-"]),
    ("tab-size", &["-moz-"]),
    ("text-size-adjust", &["-webkit-", "-moz-"]),
    ("user-select", &["-webkit-", "-moz-", "-ms-"]),
];

/// Inserts vendor-prefixed declarations ahead of their standard form.
///
/// Rules that need no prefixes are left untouched so they keep their source
/// formatting.
#[derive(Debug, Default, Clone, Copy)]
pub struct Prefixer;

impl CssPlugin for Prefixer {
    fn name(&self) -> &'static str {
        "prefix"
    }

    fn run(&self, sheet: &mut Stylesheet) -> Result<()> {
        sheet.walk_rules_mut(&mut |_, rule| {
            if let Some(prefixed) = prefixed_decls(rule.decls()) {
                *rule.decls_mut() = prefixed;
            }
        });
        Ok(())
    }
}

/// The declaration list with fallbacks added, or `None` if nothing was
/// missing.
fn prefixed_decls(decls: &[Decl]) -> Option<Vec<Decl>> {
    let has = |prop: &str, value: Option<&str>| {
        decls.iter().any(|d| match d {
            Decl::Property { prop: p, value: v } => {
                p == prop && value.is_none_or(|want| v == want)
            }
            Decl::Apply(_) => false,
        })
    };

    let mut out = Vec::with_capacity(decls.len());
    let mut changed = false;

    for decl in decls {
        if let Decl::Property { prop, value } = decl {
            if let Some((_, prefixes)) = PREFIXED_PROPERTIES.iter().find(|(p, _)| p == prop) {
                for prefix in prefixes.iter() {
                    let name = format!("{prefix}{prop}");
                    if !has(&name, None) {
                        out.push(Decl::property(name, value.clone()));
                        changed = true;
                    }
                }
            }

            if prop == "position" && value == "sticky" && !has("position", Some("-webkit-sticky")) {
                out.push(Decl::property("position", "-webkit-sticky"));
                changed = true;
            }
        }
        out.push(decl.clone());
    }

    changed.then_some(out)
}
