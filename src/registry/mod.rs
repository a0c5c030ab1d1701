//! Registry module for container engine interactions
//!
//! This module provides the engine capability used by the migration
//! pipelines, its Docker Engine API implementation, credential encoding for
//! registry logins and progress-stream handling.

pub mod auth;
pub mod client;
pub mod engine;
pub mod progress;

pub use auth::{decode_credential, encode_credential};
pub use client::{DockerEngineClient, DockerEngineClientBuilder};
pub use engine::{ImageEngine, ImageRef, ProgressStream, RemovedArtifact};
pub use progress::{ProgressMessage, ProgressTracker};
