//! Mock build and screenshot implementations for testing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::builder::ProjectBuilder;
use crate::error::{DeployError, DeployResult};
use crate::screenshot::ScreenshotService;

/// What a [`MockBuilder`] does when invoked.
#[derive(Debug, Clone)]
enum MockBuildBehavior {
    /// Succeed and create the artifact directory with an index.html.
    CreateArtifact,
    /// Report success but leave no artifact directory behind.
    SkipArtifact,
    /// Fail outright.
    Fail(String),
}

/// Configurable mock project builder.
#[derive(Clone)]
pub struct MockBuilder {
    behavior: Arc<RwLock<MockBuildBehavior>>,
    built_dirs: Arc<RwLock<Vec<PathBuf>>>,
}

impl MockBuilder {
    /// A builder that produces a `dist/` with an index.html.
    pub fn succeeding() -> Self {
        Self {
            behavior: Arc::new(RwLock::new(MockBuildBehavior::CreateArtifact)),
            built_dirs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// A builder that succeeds without producing an artifact directory.
    pub fn without_artifact() -> Self {
        let builder = Self::succeeding();
        *builder.behavior.write() = MockBuildBehavior::SkipArtifact;
        builder
    }

    /// A builder that fails with a message.
    pub fn failing(message: impl Into<String>) -> Self {
        let builder = Self::succeeding();
        *builder.behavior.write() = MockBuildBehavior::Fail(message.into());
        builder
    }

    /// Source directories built so far.
    pub fn built_dirs(&self) -> Vec<PathBuf> {
        self.built_dirs.read().clone()
    }
}

#[async_trait]
impl ProjectBuilder for MockBuilder {
    async fn build(&self, source_dir: &Path) -> DeployResult<()> {
        self.built_dirs.write().push(source_dir.to_path_buf());
        let behavior = { self.behavior.read().clone() };
        match behavior {
            MockBuildBehavior::CreateArtifact => {
                let dist = source_dir.join(self.artifact_dir());
                std::fs::create_dir_all(&dist)?;
                std::fs::write(dist.join("index.html"), "<html>built</html>")?;
                Ok(())
            }
            MockBuildBehavior::SkipArtifact => Ok(()),
            MockBuildBehavior::Fail(message) => Err(DeployError::Build(message)),
        }
    }
}

/// Screenshot service returning a canned reference, or failing.
#[derive(Clone)]
pub struct MockScreenshotService {
    result: Arc<RwLock<Result<String, String>>>,
    captured_urls: Arc<RwLock<Vec<String>>>,
}

impl MockScreenshotService {
    pub fn returning(reference: impl Into<String>) -> Self {
        Self {
            result: Arc::new(RwLock::new(Ok(reference.into()))),
            captured_urls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        let service = Self::returning("");
        *service.result.write() = Err(message.into());
        service
    }

    /// URLs capture was asked for.
    pub fn captured_urls(&self) -> Vec<String> {
        self.captured_urls.read().clone()
    }
}

#[async_trait]
impl ScreenshotService for MockScreenshotService {
    async fn capture(&self, url: &str) -> DeployResult<String> {
        self.captured_urls.write().push(url.to_string());
        let result = { self.result.read().clone() };
        result.map_err(DeployError::Screenshot)
    }
}
