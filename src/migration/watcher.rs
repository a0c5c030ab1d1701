//! Termination-signal watcher

use crate::context::MigrationContext;
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Cancels a [`MigrationContext`] when the process is asked to terminate
pub struct CancellationWatcher {
    ctx: MigrationContext,
}

impl CancellationWatcher {
    pub fn new(ctx: MigrationContext) -> Self {
        Self { ctx }
    }

    /// Register the SIGINT and SIGTERM handlers, then watch them in a
    /// background task
    pub fn spawn(self) -> JoinHandle<bool> {
        let signal = ShutdownSignal::install();
        tokio::spawn(self.watch(signal.recv()))
    }

    /// Wait for `signal`, then cancel the context. Returns whether this call
    /// performed the cancellation.
    pub async fn watch<F>(self, signal: F) -> bool
    where
        F: Future<Output = ()>,
    {
        signal.await;

        let fired = self.ctx.cancel();
        if fired {
            info!("Termination requested, cancelling in-flight migrations");
        }
        fired
    }
}

/// SIGINT (Ctrl+C) and SIGTERM handlers, registered as soon as this is
/// created. Signals delivered before [`ShutdownSignal::recv`] is polled are
/// kept, not handled by the default disposition.
///
/// Must be created inside a tokio runtime.
pub struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: Option<tokio::signal::unix::Signal>,
    #[cfg(unix)]
    terminate: Option<tokio::signal::unix::Signal>,
    #[cfg(windows)]
    ctrl_c: Option<tokio::signal::windows::CtrlC>,
}

impl ShutdownSignal {
    #[cfg(unix)]
    pub fn install() -> Self {
        use tokio::signal::unix::{SignalKind, signal};

        let interrupt = signal(SignalKind::interrupt())
            .map_err(|e| warn!("Failed to register SIGINT handler: {}", e))
            .ok();
        let terminate = signal(SignalKind::terminate())
            .map_err(|e| warn!("Failed to register SIGTERM handler: {}", e))
            .ok();
        Self { interrupt, terminate }
    }

    #[cfg(windows)]
    pub fn install() -> Self {
        let ctrl_c = tokio::signal::windows::ctrl_c()
            .map_err(|e| warn!("Failed to listen for Ctrl+C: {}", e))
            .ok();
        Self { ctrl_c }
    }

    /// Resolves on the first signal received. Never resolves when no handler
    /// could be registered.
    #[cfg(unix)]
    pub async fn recv(self) {
        tokio::select! {
            _ = next(self.interrupt) => info!("SIGINT (Ctrl+C) received"),
            _ = next(self.terminate) => info!("SIGTERM received"),
        }
    }

    #[cfg(windows)]
    pub async fn recv(self) {
        match self.ctrl_c {
            Some(mut ctrl_c) => {
                ctrl_c.recv().await;
                info!("Ctrl+C received");
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(unix)]
async fn next(signal: Option<tokio::signal::unix::Signal>) {
    match signal {
        Some(mut signal) => {
            // A closed stream is not a request to stop
            if signal.recv().await.is_none() {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending::<()>().await,
    }
}
