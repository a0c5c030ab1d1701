//! Concurrent image migration
//!
//! The [`Orchestrator`] launches one [`Pipeline`] per configured image, all
//! sharing a single [`MigrationContext`](crate::context::MigrationContext).
//! The [`CancellationWatcher`] cancels that context when the process is asked
//! to terminate.

pub mod orchestrator;
pub mod pipeline;
pub mod watcher;

pub use orchestrator::{MigrationReport, Orchestrator};
pub use pipeline::{
    CleanupFailure, MigrationJob, Pipeline, PipelineOutcome, PipelineState, Stage, StageFailure,
};
pub use watcher::{CancellationWatcher, ShutdownSignal};
