//! Screenshot capture of deployed applications.
//!
//! Runs after a successful deploy as a detached task; the deploy result
//! has already been returned, so capture or cover-update failures are
//! logged and swallowed.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use forge_core::AppId;
use forge_store::AppStore;

use crate::error::{DeployError, DeployResult};

/// Screenshot capability boundary.
#[async_trait]
pub trait ScreenshotService: Send + Sync {
    /// Render a URL and return an image reference.
    async fn capture(&self, url: &str) -> DeployResult<String>;
}

/// Screenshot service backed by an HTTP render endpoint.
///
/// The endpoint receives the target as a `url` query parameter and
/// answers with the stored image reference as plain text.
pub struct HttpScreenshotService {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpScreenshotService {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ScreenshotService for HttpScreenshotService {
    async fn capture(&self, url: &str) -> DeployResult<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", url)])
            .send()
            .await
            .map_err(|e| DeployError::Screenshot(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeployError::Screenshot(format!(
                "render endpoint answered {}",
                response.status()
            )));
        }

        let reference = response
            .text()
            .await
            .map_err(|e| DeployError::Screenshot(e.to_string()))?;
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(DeployError::Screenshot("render endpoint answered empty body".into()));
        }
        Ok(reference.to_string())
    }
}

/// Capture a screenshot of a freshly deployed URL and update the
/// application's cover image, detached from the deploying request.
pub fn spawn_cover_update(
    screenshots: Arc<dyn ScreenshotService>,
    apps: Arc<dyn AppStore>,
    app_id: AppId,
    url: String,
) {
    tokio::spawn(async move {
        match screenshots.capture(&url).await {
            Ok(cover) => match apps.set_cover(app_id, cover).await {
                Ok(()) => info!(app_id, "cover image updated"),
                Err(e) => warn!(app_id, error = %e, "failed to store cover image"),
            },
            Err(e) => warn!(app_id, error = %e, "screenshot capture failed"),
        }
    });
}
