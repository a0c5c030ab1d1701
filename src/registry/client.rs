// Docker Engine API client. Pulls, tags, pushes and removes images through
// the engine's HTTP endpoint; the engine itself talks to the registries
// using the credential passed in the X-Registry-Auth header.

use crate::context::MigrationContext;
use crate::error::{MigratorError, Result};
use crate::registry::engine::{ImageEngine, ImageRef, ProgressStream, RemovedArtifact};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

pub const DEFAULT_DOCKER_HOST: &str = "tcp://localhost:2375";
const REGISTRY_AUTH_HEADER: &str = "X-Registry-Auth";

pub struct DockerEngineClientBuilder {
    host: String,
    skip_tls: bool,
}

impl DockerEngineClientBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            skip_tls: false,
        }
    }

    pub fn with_skip_tls(mut self, skip_tls: bool) -> Self {
        self.skip_tls = skip_tls;
        self
    }

    pub fn build(self) -> Result<DockerEngineClient> {
        let base_url = normalize_host(&self.host)?;

        // The engine is a local or internal daemon, never reached through a proxy
        let mut builder = Client::builder()
            .user_agent(concat!("registry-migrator/", env!("CARGO_PKG_VERSION")))
            .no_proxy();
        if self.skip_tls {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        let client = builder.build()?;

        Ok(DockerEngineClient { client, base_url })
    }
}

/// Turn a `DOCKER_HOST` style address into the HTTP base URL of the engine
pub fn normalize_host(host: &str) -> Result<String> {
    let host = host.trim().trim_end_matches('/');

    let http = if let Some(rest) = host.strip_prefix("tcp://") {
        format!("http://{}", rest)
    } else if host.starts_with("unix://") || host.starts_with("npipe://") {
        return Err(MigratorError::Config(format!(
            "Engine address {} is a local socket; expose the engine over tcp:// instead",
            host
        )));
    } else if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        return Err(MigratorError::Config(format!(
            "Invalid engine address: {}. Must start with tcp://, http:// or https://",
            host
        )));
    };

    let url = Url::parse(&http)?;
    if url.host_str().is_none() {
        return Err(MigratorError::Config(format!("Engine address {} has no host", host)));
    }

    Ok(http)
}

#[derive(Debug, Deserialize)]
struct EngineErrorBody {
    message: String,
}

pub struct DockerEngineClient {
    client: Client,
    base_url: String,
}

impl DockerEngineClient {
    pub fn new(host: impl Into<String>) -> Result<Self> {
        Self::builder(host).build()
    }

    pub fn builder(host: impl Into<String>) -> DockerEngineClientBuilder {
        DockerEngineClientBuilder::new(host)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, ctx: &MigrationContext, request: RequestBuilder, operation: &str) -> Result<Response> {
        let response = ctx.run(async { request.send().await.map_err(MigratorError::from) }).await?;
        debug!("{} response status: {}", operation, response.status());

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = match ctx.run(async { response.text().await.map_err(MigratorError::from) }).await {
            Ok(text) => text,
            Err(MigratorError::Cancelled) => return Err(MigratorError::Cancelled),
            Err(_) => "Failed to read error response".to_string(),
        };
        Err(engine_error(status, &text, operation))
    }

    fn progress_stream(response: Response) -> ProgressStream {
        response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(MigratorError::from))
            .boxed()
    }
}

fn engine_error(status: StatusCode, body: &str, operation: &str) -> MigratorError {
    let message = serde_json::from_str::<EngineErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string());

    let message = match status.as_u16() {
        401 | 403 => format!("{} denied (status {}): {}", operation, status, message),
        404 => format!("{}: no such image: {}", operation, message),
        409 => format!("{} conflict: {}", operation, message),
        500..=599 => format!("Engine server error during {}: {}", operation, message),
        _ => format!("{} failed (status {}): {}", operation, status, message),
    };

    MigratorError::Engine(message)
}

#[async_trait]
impl ImageEngine for DockerEngineClient {
    async fn pull(&self, ctx: &MigrationContext, image: &ImageRef, auth: &str) -> Result<ProgressStream> {
        let request = self
            .client
            .post(format!("{}/images/create", self.base_url))
            .query(&[("fromImage", image.repository.as_str()), ("tag", image.tag.as_str())])
            .header(REGISTRY_AUTH_HEADER, auth);

        let response = self.send(ctx, request, "pull").await?;
        Ok(Self::progress_stream(response))
    }

    async fn tag(&self, ctx: &MigrationContext, source: &ImageRef, target: &ImageRef) -> Result<()> {
        let request = self
            .client
            .post(format!("{}/images/{}/tag", self.base_url, source))
            .query(&[("repo", target.repository.as_str()), ("tag", target.tag.as_str())]);

        self.send(ctx, request, "tag").await?;
        Ok(())
    }

    async fn push(&self, ctx: &MigrationContext, image: &ImageRef, auth: &str) -> Result<ProgressStream> {
        let request = self
            .client
            .post(format!("{}/images/{}/push", self.base_url, image.repository))
            .query(&[("tag", image.tag.as_str())])
            .header(REGISTRY_AUTH_HEADER, auth);

        let response = self.send(ctx, request, "push").await?;
        Ok(Self::progress_stream(response))
    }

    async fn remove(&self, ctx: &MigrationContext, image: &ImageRef) -> Result<Vec<RemovedArtifact>> {
        let request = self
            .client
            .delete(format!("{}/images/{}", self.base_url, image))
            .query(&[("force", "true"), ("noprune", "false")]);

        let response = self.send(ctx, request, "remove").await?;
        ctx.run(async { response.json::<Vec<RemovedArtifact>>().await.map_err(MigratorError::from) })
            .await
    }
}
