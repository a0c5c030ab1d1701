//! Shared cancellation context for a migration run

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

use crate::error::{MigratorError, Result};

/// Single cancellation signal shared by every pipeline and engine call.
///
/// Cloning is cheap and every clone observes the same signal. Once cancelled
/// it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct MigrationContext {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl MigrationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the context. Returns `true` only for the call that actually
    /// performed the cancellation.
    pub fn cancel(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.token.cancel();
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Run `fut` unless the context is cancelled first
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(MigratorError::Cancelled),
            res = fut => res,
        }
    }
}
