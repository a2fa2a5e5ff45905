//! External project build step.
//!
//! Project-mode applications ship a real front-end toolchain; before
//! publishing, their source directory goes through the stack's build
//! command and must leave an artifact subdirectory behind.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{DeployError, DeployResult};

/// External build tool boundary.
#[async_trait]
pub trait ProjectBuilder: Send + Sync {
    /// Build a project source directory in place. The artifact
    /// subdirectory must exist once this returns Ok.
    async fn build(&self, source_dir: &Path) -> DeployResult<()>;

    /// Name of the output artifact subdirectory.
    fn artifact_dir(&self) -> &str {
        "dist"
    }
}

/// Builds Node-based projects with `npm install` + `npm run build`.
pub struct NodeProjectBuilder {
    timeout: Duration,
}

impl Default for NodeProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeProjectBuilder {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(300),
        }
    }

    /// Override the per-command timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run_npm(&self, source_dir: &Path, args: &[&str]) -> DeployResult<()> {
        debug!(dir = %source_dir.display(), ?args, "running npm");
        let child = Command::new("npm")
            .args(args)
            .current_dir(source_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DeployError::Build(format!("failed to spawn npm: {}", e)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                DeployError::Build(format!(
                    "npm {} timed out after {}s",
                    args.join(" "),
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| DeployError::Build(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeployError::Build(format!(
                "npm {} exited with {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectBuilder for NodeProjectBuilder {
    async fn build(&self, source_dir: &Path) -> DeployResult<()> {
        if !source_dir.join("package.json").is_file() {
            return Err(DeployError::Build(format!(
                "no package.json in {}",
                source_dir.display()
            )));
        }
        self.run_npm(source_dir, &["install"]).await?;
        self.run_npm(source_dir, &["run", "build"]).await?;
        info!(dir = %source_dir.display(), "project build finished");
        Ok(())
    }
}
