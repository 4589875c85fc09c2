// src/transform/css/minify.rs

use anyhow::Result;

use crate::transform::css::ast::Stylesheet;
use crate::transform::css::CssPlugin;

/// Switches the sheet to compact output.
///
/// Comment removal, empty-rule removal and whitespace squeezing happen in
/// the serializer, so the plugin itself only flips the output format.
#[derive(Debug, Default, Clone, Copy)]
pub struct Minify;

impl CssPlugin for Minify {
    fn name(&self) -> &'static str {
        "minify"
    }

    fn run(&self, sheet: &mut Stylesheet) -> Result<()> {
        sheet.compact = true;
        Ok(())
    }
}

pub(crate) fn minify_selector(selector: &str) -> String {
    squeeze(selector, &['>', '+', '~', ','], &['>', '+', '~', ','])
}

pub(crate) fn minify_value(value: &str) -> String {
    squeeze(value, &[','], &[',', '!'])
}

pub(crate) fn minify_params(params: &str) -> String {
    squeeze(params, &[':', ','], &[','])
}

/// Collapse whitespace runs outside strings to a single space, dropping it
/// entirely after any of `tight_after` or before any of `tight_before`.
fn squeeze(text: &str, tight_after: &[char], tight_before: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    let mut quote: Option<char> = None;
    let mut chars = text.trim().chars();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        if c.is_whitespace() {
            pending_space = true;
            continue;
        }

        if pending_space {
            let after_tight = out.chars().last().is_some_and(|p| tight_after.contains(&p));
            if !after_tight && !tight_before.contains(&c) {
                out.push(' ');
            }
            pending_space = false;
        }

        out.push(c);
        match c {
            '"' | '\'' => quote = Some(c),
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            _ => {}
        }
    }
    out
}
