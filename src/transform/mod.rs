// src/transform/mod.rs

//! Asset transforms.
//!
//! Every transform is a pure `source -> output` function behind the
//! [`Transform`] trait, so asset tasks can assemble step lists without caring
//! which concrete processor runs:
//!
//! - [`css`] parses style sheets and runs plugin chains over them (utility
//!   expansion, vendor prefixing, purging, minification).
//! - [`typescript`] strips type syntax to plain ES2020.
//! - [`javascript`] minifies plain scripts.
//! - [`markup`] minifies HTML and SVG documents.
//! - [`compress`] produces gzip and brotli encodings of arbitrary bytes.

pub mod compress;
pub mod css;
pub mod javascript;
pub mod markup;
pub mod typescript;

use anyhow::Result;

/// A text-to-text transform step.
pub trait Transform: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    fn apply(&self, source: &str) -> Result<String>;
}

/// Run `source` through each step in order, stopping at the first failure.
pub fn apply_all(steps: &[Box<dyn Transform>], source: String) -> Result<String> {
    let mut current = source;
    for step in steps {
        tracing::trace!(step = step.name(), len = current.len(), "applying transform");
        current = step.apply(&current)?;
    }
    Ok(current)
}

/// 1-based line/column of a byte offset, for error messages.
pub(crate) fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source.as_bytes()[..offset];
    let line = before.iter().filter(|b| **b == b'\n').count() + 1;
    let col = before.iter().rev().take_while(|b| **b != b'\n').count() + 1;
    (line, col)
}
