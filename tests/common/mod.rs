//! Recording engine double shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use registry_migrator::MigrationContext;
use registry_migrator::error::{MigratorError, Result};
use registry_migrator::registry::{ImageEngine, ImageRef, ProgressStream, RemovedArtifact};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Pull,
    Tag,
    Push,
    Remove,
}

#[derive(Default)]
pub struct MockEngine {
    calls: Mutex<Vec<(Op, String)>>,
    auths: Mutex<Vec<(Op, String, String)>>,
    tags: Mutex<Vec<(String, String)>>,
    failures: Mutex<HashSet<(Op, String)>>,
    stream_failures: Mutex<HashSet<(Op, String)>>,
    hangs: Mutex<HashSet<(Op, String)>>,
    hanging: AtomicUsize,
    hung: Notify,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` on `image` return an error
    pub fn fail(&self, op: Op, image: &str) -> &Self {
        self.failures.lock().unwrap().insert((op, image.to_string()));
        self
    }

    /// Make `op` on `image` succeed but report an error inside its progress stream
    pub fn fail_in_stream(&self, op: Op, image: &str) -> &Self {
        self.stream_failures.lock().unwrap().insert((op, image.to_string()));
        self
    }

    /// Make `op` on `image` block until the context is cancelled
    pub fn hang(&self, op: Op, image: &str) -> &Self {
        self.hangs.lock().unwrap().insert((op, image.to_string()));
        self
    }

    pub fn calls(&self, op: Op) -> usize {
        self.calls.lock().unwrap().iter().filter(|(o, _)| *o == op).count()
    }

    pub fn calls_for(&self, op: Op, image: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, i)| *o == op && i == image)
            .count()
    }

    pub fn auth_for(&self, op: Op, image: &str) -> Option<String> {
        self.auths
            .lock()
            .unwrap()
            .iter()
            .find(|(o, i, _)| *o == op && i == image)
            .map(|(_, _, auth)| auth.clone())
    }

    /// Targets `source` was tagged as, in call order
    pub fn tag_targets(&self, source: &str) -> Vec<String> {
        self.tags
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == source)
            .map(|(_, target)| target.clone())
            .collect()
    }

    pub fn hanging(&self) -> usize {
        self.hanging.load(Ordering::SeqCst)
    }

    /// Resolve once at least `count` calls are blocked in a hang
    pub async fn wait_for_hanging(&self, count: usize) {
        while self.hanging() < count {
            self.hung.notified().await;
        }
    }

    async fn respond(&self, ctx: &MigrationContext, op: Op, image: &ImageRef) -> Result<()> {
        let key = (op, image.to_string());
        self.calls.lock().unwrap().push(key.clone());

        let hangs = self.hangs.lock().unwrap().contains(&key);
        if hangs {
            self.hanging.fetch_add(1, Ordering::SeqCst);
            self.hung.notify_one();
            ctx.cancelled().await;
            return Err(MigratorError::Cancelled);
        }

        if self.failures.lock().unwrap().contains(&key) {
            return Err(MigratorError::Engine(format!("mock {:?} failure for {}", op, image)));
        }
        Ok(())
    }

    fn progress(&self, op: Op, image: &ImageRef) -> ProgressStream {
        let mut lines = vec![
            Ok(format!("{{\"status\":\"{:?} {}\"}}\n", op, image).into_bytes()),
            Ok(b"{\"status\":\"Layer done\",\"id\":\"0123abcd\"}\n".to_vec()),
        ];
        if self.stream_failures.lock().unwrap().contains(&(op, image.to_string())) {
            lines.push(Ok(
                b"{\"errorDetail\":{\"message\":\"unauthorized: authentication required\"},\"error\":\"unauthorized\"}\n"
                    .to_vec(),
            ));
        }
        stream::iter(lines).boxed()
    }
}

#[async_trait]
impl ImageEngine for MockEngine {
    async fn pull(&self, ctx: &MigrationContext, image: &ImageRef, auth: &str) -> Result<ProgressStream> {
        self.auths
            .lock()
            .unwrap()
            .push((Op::Pull, image.to_string(), auth.to_string()));
        self.respond(ctx, Op::Pull, image).await?;
        Ok(self.progress(Op::Pull, image))
    }

    async fn tag(&self, ctx: &MigrationContext, source: &ImageRef, target: &ImageRef) -> Result<()> {
        self.tags
            .lock()
            .unwrap()
            .push((source.to_string(), target.to_string()));
        self.respond(ctx, Op::Tag, source).await
    }

    async fn push(&self, ctx: &MigrationContext, image: &ImageRef, auth: &str) -> Result<ProgressStream> {
        self.auths
            .lock()
            .unwrap()
            .push((Op::Push, image.to_string(), auth.to_string()));
        self.respond(ctx, Op::Push, image).await?;
        Ok(self.progress(Op::Push, image))
    }

    async fn remove(&self, ctx: &MigrationContext, image: &ImageRef) -> Result<Vec<RemovedArtifact>> {
        self.respond(ctx, Op::Remove, image).await?;
        Ok(vec![RemovedArtifact {
            untagged: Some(image.to_string()),
            deleted: None,
        }])
    }
}
