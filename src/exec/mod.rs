// src/exec/mod.rs

//! Task execution layer.
//!
//! Tasks are CPU-bound transforms over files, so each one runs on Tokio's
//! blocking pool and reports back to the orchestration runtime via
//! `RuntimeEvent`s.
//!
//! - [`executor_loop`] owns the main executor loop and keeps at most one
//!   instance of each task in flight.
//! - [`task_runner`] runs a single task and converts its result into a
//!   completion event.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
