//! Fan-out/fan-in of one pipeline per configured image

use crate::config::MigrationConfig;
use crate::context::MigrationContext;
use crate::migration::pipeline::{Pipeline, PipelineOutcome};
use crate::registry::engine::ImageEngine;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Terminal outcomes of a run, in completion order
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub outcomes: Vec<PipelineOutcome>,
    /// Pipelines whose task died before reporting an outcome
    pub aborted: usize,
}

impl MigrationReport {
    pub fn total(&self) -> usize {
        self.outcomes.len() + self.aborted
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

pub struct Orchestrator<E: ImageEngine + ?Sized> {
    config: Arc<MigrationConfig>,
    engine: Arc<E>,
}

impl<E: ImageEngine + ?Sized + 'static> Orchestrator<E> {
    pub fn new(config: Arc<MigrationConfig>, engine: Arc<E>) -> Self {
        Self { config, engine }
    }

    /// Launch one pipeline per image and wait until every one of them has
    /// finished. A failing image never stops its siblings.
    pub async fn run(&self, ctx: &MigrationContext) -> MigrationReport {
        let from = Arc::new(self.config.from_registry.clone());
        let to = Arc::new(self.config.to_registry.clone());

        if self.config.images.is_empty() {
            warn!("No images configured, nothing to migrate");
            return MigrationReport::default();
        }

        let mut tasks = JoinSet::new();
        for image in &self.config.images {
            let pipeline = Pipeline::new(
                Arc::clone(&self.engine),
                ctx.clone(),
                Arc::clone(&from),
                Arc::clone(&to),
                image,
            );
            tasks.spawn(pipeline.run());
        }
        info!("Launched {} migration pipelines", tasks.len());

        let mut report = MigrationReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => {
                    error!("Migration task terminated abnormally: {}", e);
                    report.aborted += 1;
                }
            }
        }

        report
    }
}
