// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling each task's input patterns into a watch profile.
//! - Wiring up a cross-platform filesystem watcher (`notify`) on the source
//!   root.
//! - (Optionally) content hashing, so a save that leaves a task's inputs
//!   byte-identical does not re-run it.
//!
//! It does **not** know about the DAG or task dependencies; it only turns
//! filesystem changes into task-level triggers.

pub mod cache;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use hash::{HashStore, MemoryHashStore};
pub use patterns::{build_profiles, TaskWatchProfile};
pub use watcher::{spawn_watcher, WatcherHandle};
