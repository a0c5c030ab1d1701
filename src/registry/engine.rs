//! Image engine capability used by the migration pipelines
//!
//! The pipelines never talk to a registry directly. They drive an
//! [`ImageEngine`] (normally the local Docker engine) which pulls, tags,
//! pushes and removes images on their behalf.

use crate::context::MigrationContext;
use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Deserialize;
use std::fmt;

/// Progress output of a pull or push. The operation is not finished until
/// the stream has been read to its end.
pub type ProgressStream = BoxStream<'static, Result<Vec<u8>>>;

/// Fully qualified image reference, `repository:tag`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// One entry of the engine's image removal report
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemovedArtifact {
    #[serde(rename = "Untagged", default)]
    pub untagged: Option<String>,
    #[serde(rename = "Deleted", default)]
    pub deleted: Option<String>,
}

impl fmt::Display for RemovedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.untagged, &self.deleted) {
            (Some(untagged), _) => write!(f, "untagged {}", untagged),
            (None, Some(deleted)) => write!(f, "deleted {}", deleted),
            (None, None) => write!(f, "(empty)"),
        }
    }
}

/// Operations a migration needs from a container engine.
///
/// Implementations must honour `ctx`: a cancelled context should make an
/// in-flight call return [`MigratorError::Cancelled`](crate::error::MigratorError::Cancelled)
/// or another error promptly.
#[async_trait]
pub trait ImageEngine: Send + Sync {
    /// Pull `image` using the encoded registry credential `auth`
    async fn pull(&self, ctx: &MigrationContext, image: &ImageRef, auth: &str) -> Result<ProgressStream>;

    /// Add the `target` reference to the local image `source`
    async fn tag(&self, ctx: &MigrationContext, source: &ImageRef, target: &ImageRef) -> Result<()>;

    /// Push `image` using the encoded registry credential `auth`
    async fn push(&self, ctx: &MigrationContext, image: &ImageRef, auth: &str) -> Result<ProgressStream>;

    /// Force-remove the local `image`, pruning untagged parents
    async fn remove(&self, ctx: &MigrationContext, image: &ImageRef) -> Result<Vec<RemovedArtifact>>;
}
