//! Deploy pipeline.
//!
//! Fail-fast, sequential steps from generated code to a public URL:
//! resolve the application and its deploy key, build project modes,
//! replace the deploy directory wholesale, persist the record, return
//! the URL. Any failure leaves the currently published version alone.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info};

use forge_core::{AppId, CoreError, DeploymentRecord, ForgeConfig, GenMode};
use forge_store::{AppStore, DeploymentStore};

use crate::builder::ProjectBuilder;
use crate::error::{DeployError, DeployResult};
use crate::screenshot::{spawn_cover_update, ScreenshotService};

/// Length of generated deploy keys.
pub const DEPLOY_KEY_LENGTH: usize = 6;

/// Result of a successful deploy.
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub url: String,
    pub deploy_key: String,
    pub deploy_dir: PathBuf,
}

/// Builds and publishes applications.
pub struct DeployPipeline {
    config: ForgeConfig,
    apps: Arc<dyn AppStore>,
    deployments: Arc<dyn DeploymentStore>,
    builders: HashMap<GenMode, Arc<dyn ProjectBuilder>>,
    screenshots: Option<Arc<dyn ScreenshotService>>,
}

impl DeployPipeline {
    pub fn new(
        config: ForgeConfig,
        apps: Arc<dyn AppStore>,
        deployments: Arc<dyn DeploymentStore>,
    ) -> Self {
        Self {
            config,
            apps,
            deployments,
            builders: HashMap::new(),
            screenshots: None,
        }
    }

    /// Register the build tool for a project mode.
    pub fn with_builder(mut self, mode: GenMode, builder: Arc<dyn ProjectBuilder>) -> Self {
        self.builders.insert(mode, builder);
        self
    }

    /// Enable post-deploy cover screenshots.
    pub fn with_screenshots(mut self, screenshots: Arc<dyn ScreenshotService>) -> Self {
        self.screenshots = Some(screenshots);
        self
    }

    /// Publish an application and return its shareable URL.
    pub async fn deploy(&self, app_id: AppId) -> DeployResult<DeployOutcome> {
        if app_id <= 0 {
            return Err(DeployError::Validation("application id must be positive".into()));
        }
        let app = self
            .apps
            .get_app(app_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("application {}", app_id)))?;
        let mode = app.mode.ok_or_else(|| {
            DeployError::Validation("application has no generation mode, generate code first".into())
        })?;

        let source_dir = self.config.output_dir(mode, app_id);
        if !source_dir.is_dir() || fs::read_dir(&source_dir)?.next().is_none() {
            return Err(DeployError::Validation(format!(
                "no generated code in {}, generate first",
                source_dir.display()
            )));
        }

        // Key is stable once assigned; a first deploy allocates one that
        // no persisted record already uses.
        let deploy_key = match app.deploy_key {
            Some(key) => key,
            None => self.allocate_key().await?,
        };

        // Project modes publish the build artifact, plain modes the
        // source directory itself.
        let publish_dir = if mode.is_project() {
            let builder = self.builders.get(&mode).ok_or_else(|| {
                DeployError::Build(format!("no builder registered for mode {}", mode))
            })?;
            builder.build(&source_dir).await?;
            let artifact = source_dir.join(builder.artifact_dir());
            if !artifact.is_dir() {
                return Err(DeployError::MissingArtifact(artifact));
            }
            artifact
        } else {
            source_dir.clone()
        };

        // Full replacement of the deploy directory, not a diff.
        let deploy_dir = self.config.deploy_dir(&deploy_key);
        fs::create_dir_all(&self.config.deploy_root)?;
        if deploy_dir.exists() {
            fs::remove_dir_all(&deploy_dir)?;
        }
        fs::create_dir_all(&deploy_dir)?;
        let mut options = fs_extra::dir::CopyOptions::new();
        options.content_only = true;
        options.overwrite = true;
        fs_extra::dir::copy(&publish_dir, &deploy_dir, &options)
            .map_err(|e| DeployError::CopyFailed(e.to_string()))?;

        let deployed_at = Utc::now();
        self.deployments
            .upsert_record(DeploymentRecord {
                app_id,
                deploy_key: deploy_key.clone(),
                source_dir,
                deploy_dir: deploy_dir.clone(),
                deployed_at,
            })
            .await?;
        self.apps
            .set_deploy_info(app_id, deploy_key.clone(), deployed_at)
            .await?;

        let url = self.config.deploy_url(&deploy_key);
        info!(app_id, deploy_key = %deploy_key, url = %url, "application deployed");

        if let Some(screenshots) = &self.screenshots {
            spawn_cover_update(screenshots.clone(), self.apps.clone(), app_id, url.clone());
        }

        Ok(DeployOutcome {
            url,
            deploy_key,
            deploy_dir,
        })
    }

    /// Allocate a deploy key no persisted record uses yet.
    async fn allocate_key(&self) -> DeployResult<String> {
        loop {
            let key = generate_key(DEPLOY_KEY_LENGTH);
            if !self.deployments.deploy_key_exists(&key).await? {
                return Ok(key);
            }
            debug!("deploy key collision, drawing again");
        }
    }
}

fn generate_key(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
