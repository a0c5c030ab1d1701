//! Runner wiring config, engine, watcher and orchestrator together

use crate::cli::args::Args;
use crate::config::MigrationConfig;
use crate::context::MigrationContext;
use crate::error::Result;
use crate::logging::format_duration;
use crate::migration::{CancellationWatcher, MigrationReport, Orchestrator, ShutdownSignal};
use crate::registry::{DockerEngineClient, ImageEngine};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub struct Runner {
    args: Args,
}

impl Runner {
    pub fn new(args: Args) -> Self {
        Self { args }
    }

    /// Load the config, connect to the engine and migrate every image.
    /// Only configuration problems are returned as errors.
    pub async fn run(&self) -> Result<MigrationReport> {
        info!("Loading config from {}", self.args.file);
        let config = Arc::new(MigrationConfig::load(&self.args.file)?);

        let engine = DockerEngineClient::builder(self.args.docker_host())
            .with_skip_tls(self.args.skip_tls)
            .build()?;
        info!("Using engine at {}", engine.base_url());

        // Handlers go in before any pipeline exists
        let signal = ShutdownSignal::install();
        Ok(migrate(config, Arc::new(engine), signal.recv()).await)
    }
}

/// Run the orchestrator with a watcher that cancels the shared context when
/// `signal` resolves. Returns once every pipeline has finished.
pub async fn migrate<E, S>(config: Arc<MigrationConfig>, engine: Arc<E>, signal: S) -> MigrationReport
where
    E: ImageEngine + ?Sized + 'static,
    S: Future<Output = ()> + Send + 'static,
{
    let start_time = Instant::now();
    let ctx = MigrationContext::new();

    info!(
        "Migrating {} images from {} to {}",
        config.images.len(),
        config.from_registry.base_address,
        config.to_registry.base_address
    );

    let watcher = tokio::spawn(CancellationWatcher::new(ctx.clone()).watch(signal));
    let report = Orchestrator::new(config, engine).run(&ctx).await;

    // All pipelines are done; stop listening for signals
    watcher.abort();
    let _ = watcher.await;

    let summary = format!(
        "{} succeeded, {} failed in {}",
        report.succeeded(),
        report.failed(),
        format_duration(start_time.elapsed())
    );
    if report.has_failures() {
        warn!("Migration finished: {}", summary);
    } else {
        info!("Migration finished: {}", summary);
    }
    if ctx.is_cancelled() {
        warn!("Run was cancelled before all images completed");
    }

    report
}
