//! Per-image migration pipeline
//!
//! A pipeline moves exactly one image: pull from the source registry, tag
//! for the destination, push, then remove both local references. Pull, tag
//! and push abort the pipeline on failure. Cleanup is best effort.

use crate::config::{ImageDescriptor, RegistryCredential};
use crate::context::MigrationContext;
use crate::error::MigratorError;
use crate::registry::auth::encode_credential;
use crate::registry::engine::{ImageEngine, ImageRef};
use crate::registry::progress::ProgressTracker;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Steps of a pipeline that talk to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Pull,
    Tag,
    Push,
    Remove,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Pull => "pull",
            Stage::Tag => "tag",
            Stage::Push => "push",
            Stage::Remove => "remove",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    Pulling,
    Tagging,
    Pushing,
    CleaningUp,
    Succeeded,
    Failed(Stage),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Succeeded | PipelineState::Failed(_))
    }
}

/// Source and destination references of one image, fixed at pipeline start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationJob {
    pub source: ImageRef,
    pub dest: ImageRef,
}

impl MigrationJob {
    /// `base_address/prefix+name:tag` on each side
    pub fn new(image: &ImageDescriptor, from: &RegistryCredential, to: &RegistryCredential) -> Self {
        Self {
            source: ImageRef::new(
                format!("{}/{}{}", from.base_address, image.from_prefix, image.name),
                image.tag.clone(),
            ),
            dest: ImageRef::new(
                format!("{}/{}{}", to.base_address, image.to_prefix, image.name),
                image.tag.clone(),
            ),
        }
    }
}

/// A pull, tag or push failed; nothing after it ran
#[derive(Debug, Error)]
#[error("can't {stage} image: {source}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub source: MigratorError,
}

/// Removing one local reference failed after a successful push
#[derive(Debug, Error)]
#[error("can't delete image '{image}': {source}")]
pub struct CleanupFailure {
    pub image: ImageRef,
    #[source]
    pub source: MigratorError,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub job: MigrationJob,
    pub state: PipelineState,
    pub failure: Option<StageFailure>,
    pub cleanup_failures: Vec<CleanupFailure>,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.state == PipelineState::Succeeded
    }
}

pub struct Pipeline<E: ImageEngine + ?Sized> {
    engine: Arc<E>,
    ctx: MigrationContext,
    from: Arc<RegistryCredential>,
    to: Arc<RegistryCredential>,
    job: MigrationJob,
    state: PipelineState,
}

impl<E: ImageEngine + ?Sized> Pipeline<E> {
    pub fn new(
        engine: Arc<E>,
        ctx: MigrationContext,
        from: Arc<RegistryCredential>,
        to: Arc<RegistryCredential>,
        image: &ImageDescriptor,
    ) -> Self {
        let job = MigrationJob::new(image, &from, &to);
        Self {
            engine,
            ctx,
            from,
            to,
            job,
            state: PipelineState::Pending,
        }
    }

    pub fn job(&self) -> &MigrationJob {
        &self.job
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Drive the pipeline to a terminal state
    pub async fn run(mut self) -> PipelineOutcome {
        info!(source = %self.job.source, dest = %self.job.dest, "Starting migration");

        if let Err(failure) = self.transfer().await {
            self.state = PipelineState::Failed(failure.stage);
            warn!(
                source = %self.job.source,
                dest = %self.job.dest,
                stage = %failure.stage,
                "Migration failed: {}",
                failure
            );
            return self.finish(Some(failure), Vec::new());
        }

        self.state = PipelineState::CleaningUp;
        let cleanup_failures = self.cleanup().await;

        self.state = PipelineState::Succeeded;
        info!(source = %self.job.source, dest = %self.job.dest, "Migration succeeded");
        self.finish(None, cleanup_failures)
    }

    async fn transfer(&mut self) -> Result<(), StageFailure> {
        self.state = PipelineState::Pulling;
        self.pull().await.map_err(|source| StageFailure { stage: Stage::Pull, source })?;

        self.state = PipelineState::Tagging;
        self.engine
            .tag(&self.ctx, &self.job.source, &self.job.dest)
            .await
            .map_err(|source| StageFailure { stage: Stage::Tag, source })?;
        debug!(source = %self.job.source, dest = %self.job.dest, "Tagged");

        self.state = PipelineState::Pushing;
        self.push().await.map_err(|source| StageFailure { stage: Stage::Push, source })?;

        Ok(())
    }

    async fn pull(&self) -> crate::error::Result<()> {
        let auth = encode_credential(&self.from)?;
        let stream = self.engine.pull(&self.ctx, &self.job.source, &auth).await?;
        ProgressTracker::new(format!("pull {}", self.job.source))
            .drain(&self.ctx, stream)
            .await
    }

    async fn push(&self) -> crate::error::Result<()> {
        let auth = encode_credential(&self.to)?;
        let stream = self.engine.push(&self.ctx, &self.job.dest, &auth).await?;
        ProgressTracker::new(format!("push {}", self.job.dest))
            .drain(&self.ctx, stream)
            .await
    }

    // Each removal is attempted regardless of how the other went
    async fn cleanup(&self) -> Vec<CleanupFailure> {
        let mut failures = Vec::new();

        for image in [&self.job.source, &self.job.dest] {
            match self.engine.remove(&self.ctx, image).await {
                Ok(removed) => {
                    let removed: Vec<String> = removed.iter().map(ToString::to_string).collect();
                    info!(image = %image, "Removed local image: [{}]", removed.join(", "));
                }
                Err(source) => {
                    let failure = CleanupFailure {
                        image: image.clone(),
                        source,
                    };
                    warn!(image = %image, stage = %Stage::Remove, "{}", failure);
                    failures.push(failure);
                }
            }
        }

        failures
    }

    fn finish(self, failure: Option<StageFailure>, cleanup_failures: Vec<CleanupFailure>) -> PipelineOutcome {
        debug_assert!(self.state.is_terminal());
        PipelineOutcome {
            job: self.job,
            state: self.state,
            failure,
            cleanup_failures,
        }
    }
}
