// src/config/mod.rs

//! Project configuration for assetdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a project file from disk, or fall back to defaults (`loader.rs`).
//! - Validate paths, ports and globs (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, PathsSection, RawConfigFile, ScriptsSection, ServerSection, StylesSection,
    WatchSection,
};
