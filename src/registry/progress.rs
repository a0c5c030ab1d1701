//! Progress tracking for engine pull and push streams
//!
//! The engine reports progress as newline-delimited JSON messages. A
//! [`ProgressTracker`] drains such a stream to its end, logs what it sees and
//! remembers the first error the engine reported in-band.

use crate::context::MigrationContext;
use crate::error::{MigratorError, Result};
use crate::logging::format_duration;
use crate::registry::engine::ProgressStream;
use futures::StreamExt;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, trace};

/// One line of engine progress output
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressMessage {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub progress: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, rename = "errorDetail")]
    pub error_detail: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

impl ProgressMessage {
    /// Error text carried by this message, if any
    pub fn error_message(&self) -> Option<&str> {
        self.error_detail
            .as_ref()
            .and_then(|detail| detail.message.as_deref())
            .or(self.error.as_deref())
    }
}

pub struct ProgressTracker {
    operation_name: String,
    start_time: Instant,
    pending: Vec<u8>,
    bytes_read: u64,
    messages: usize,
    first_error: Option<String>,
}

impl ProgressTracker {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            start_time: Instant::now(),
            pending: Vec::new(),
            bytes_read: 0,
            messages: 0,
            first_error: None,
        }
    }

    /// Read `stream` to its end. Fails if reading fails, if `ctx` is
    /// cancelled first, or if the engine reported an error in the stream.
    pub async fn drain(mut self, ctx: &MigrationContext, mut stream: ProgressStream) -> Result<()> {
        loop {
            let next = tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(MigratorError::Cancelled),
                next = stream.next() => next,
            };

            match next {
                Some(chunk) => self.update(&chunk?),
                None => break,
            }
        }

        self.finish()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.bytes_read += chunk.len() as u64;
        self.pending.extend_from_slice(chunk);

        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.handle_line(&line);
        }
    }

    fn handle_line(&mut self, line: &[u8]) {
        let line = line.trim_ascii();
        if line.is_empty() {
            return;
        }

        let message: ProgressMessage = match serde_json::from_slice(line) {
            Ok(message) => message,
            Err(e) => {
                trace!(operation = %self.operation_name, "Skipping unparseable progress line: {}", e);
                return;
            }
        };
        self.messages += 1;

        if let Some(error) = message.error_message() {
            if self.first_error.is_none() {
                self.first_error = Some(error.to_string());
            }
            return;
        }

        if let Some(status) = &message.status {
            debug!(
                operation = %self.operation_name,
                layer = message.id.as_deref().unwrap_or("-"),
                "{} {}",
                status,
                message.progress.as_deref().unwrap_or("")
            );
        }
    }

    pub fn finish(mut self) -> Result<()> {
        // A trailing message without a newline
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.handle_line(&rest);
        }

        if let Some(error) = self.first_error {
            return Err(MigratorError::Engine(error));
        }

        debug!(
            operation = %self.operation_name,
            "Completed in {} ({} messages, {} bytes)",
            format_duration(self.start_time.elapsed()),
            self.messages,
            self.bytes_read
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn stream_of(chunks: &[&str]) -> ProgressStream {
        let items: Vec<Result<Vec<u8>>> = chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect();
        stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn drains_clean_stream() {
        let ctx = MigrationContext::new();
        let stream = stream_of(&[
            "{\"status\":\"Pulling from team/app\",\"id\":\"v1\"}\n{\"sta",
            "tus\":\"Download complete\",\"id\":\"abc\"}\n",
            "{\"status\":\"Status: Downloaded newer image\"}",
        ]);

        ProgressTracker::new("pull").drain(&ctx, stream).await.unwrap();
    }

    #[tokio::test]
    async fn in_band_error_fails_after_full_drain() {
        let ctx = MigrationContext::new();
        let stream = stream_of(&[
            "{\"status\":\"The push refers to repository\"}\n",
            "{\"errorDetail\":{\"message\":\"denied: requested access to the resource is denied\"},\"error\":\"denied\"}\n",
            "{\"status\":\"trailing\"}\n",
        ]);

        let err = ProgressTracker::new("push").drain(&ctx, stream).await.unwrap_err();
        match err {
            MigratorError::Engine(msg) => assert!(msg.starts_with("denied: requested access")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn read_error_is_propagated() {
        let ctx = MigrationContext::new();
        let items: Vec<Result<Vec<u8>>> = vec![
            Ok(b"{\"status\":\"x\"}\n".to_vec()),
            Err(MigratorError::Engine("connection reset".to_string())),
        ];

        let err = ProgressTracker::new("pull")
            .drain(&ctx, stream::iter(items).boxed())
            .await
            .unwrap_err();
        assert!(matches!(err, MigratorError::Engine(_)));
    }

    #[tokio::test]
    async fn cancelled_context_stops_pending_stream() {
        let ctx = MigrationContext::new();
        ctx.cancel();

        let err = ProgressTracker::new("pull")
            .drain(&ctx, stream::pending::<Result<Vec<u8>>>().boxed())
            .await
            .unwrap_err();
        assert!(matches!(err, MigratorError::Cancelled));
    }

    #[test]
    fn non_json_lines_are_ignored() {
        let mut tracker = ProgressTracker::new("pull");
        tracker.update(b"plain text\n\n{\"status\":\"ok\"}\n");

        assert_eq!(tracker.messages, 1);
        assert!(tracker.finish().is_ok());
    }
}
