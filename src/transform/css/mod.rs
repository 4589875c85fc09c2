// src/transform/css/mod.rs

//! Style sheet processing.
//!
//! A source file is parsed once into a [`ast::Stylesheet`], passed through an
//! ordered list of [`CssPlugin`]s, and serialized again. The serializer keeps
//! untouched source text as written, so a chain that changes nothing returns
//! its input unchanged.

pub mod ast;
pub mod minify;
pub mod parser;
pub mod prefixer;
pub mod purge;
pub mod tailwind;
pub mod utilities;

use anyhow::{Context, Result};

use crate::transform::css::ast::Stylesheet;
use crate::transform::Transform;

pub use minify::Minify;
pub use prefixer::Prefixer;
pub use purge::{extract_tokens, Purge};
pub use tailwind::TailwindDirectives;

/// One pass over a parsed style sheet.
pub trait CssPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self, sheet: &mut Stylesheet) -> Result<()>;
}

/// Parse, run plugins in order, serialize.
#[derive(Default)]
pub struct CssProcessor {
    plugins: Vec<Box<dyn CssPlugin>>,
}

impl CssProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, plugin: impl CssPlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }
}

impl Transform for CssProcessor {
    fn name(&self) -> &'static str {
        "css"
    }

    fn apply(&self, source: &str) -> Result<String> {
        let mut sheet = parser::parse(source)?;
        for plugin in self.plugins.iter() {
            plugin
                .run(&mut sheet)
                .with_context(|| format!("css plugin '{}'", plugin.name()))?;
        }
        Ok(sheet.to_css(sheet.format()))
    }
}
