// src/dag/mod.rs

//! Task graph and run scheduling.
//!
//! [`graph`] compiles a task group into a directed acyclic graph;
//! [`scheduler`] walks it one run at a time, starting a task once its
//! upstream tasks have succeeded and failing its downstream tasks otherwise.

pub mod graph;
pub mod scheduler;
pub mod state_manager;
pub mod task_info;

pub use graph::DagGraph;
pub use scheduler::{Scheduler, SchedulerStep};
pub use task_info::{ScheduledTask, TaskRunState};
