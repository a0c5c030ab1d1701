//! Registry Migrator Library
//!
//! Moves container images between two registries: every configured image is
//! pulled from the source registry, re-tagged for the destination, pushed and
//! then removed locally. Images migrate concurrently and independently.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod migration;
pub mod registry;

pub use config::{ImageDescriptor, MigrationConfig, RegistryCredential};
pub use context::MigrationContext;
pub use error::{MigratorError, Result};
pub use migration::{MigrationReport, Orchestrator, PipelineOutcome, PipelineState, Stage};
