//! Runtime configuration.
//!
//! Settings are read from an optional `forge.toml` and can be
//! overridden through `FORGE_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Session cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Maximum number of cached session handles.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Seconds after construction before an entry expires.
    #[serde(default = "default_write_ttl")]
    pub write_ttl_secs: u64,
    /// Seconds after last access before an entry expires.
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl_secs: u64,
}

fn default_capacity() -> usize {
    1000
}

fn default_write_ttl() -> u64 {
    30 * 60
}

fn default_idle_ttl() -> u64 {
    10 * 60
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            write_ttl_secs: default_write_ttl(),
            idle_ttl_secs: default_idle_ttl(),
        }
    }
}

impl CacheSettings {
    pub fn write_ttl(&self) -> Duration {
        Duration::from_secs(self.write_ttl_secs)
    }

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

/// Workspace-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Root directory generated code is written under.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    /// Root directory published deployments live under.
    #[serde(default = "default_deploy_root")]
    pub deploy_root: PathBuf,
    /// Public domain deploy URLs are formed from.
    #[serde(default = "default_deploy_domain")]
    pub deploy_domain: String,
    /// How many recent messages seed a fresh session handle.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// Screenshot render endpoint, if configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_endpoint: Option<String>,
    #[serde(default)]
    pub cache: CacheSettings,
}

fn default_output_root() -> PathBuf {
    PathBuf::from("tmp/code_output")
}

fn default_deploy_root() -> PathBuf {
    PathBuf::from("tmp/code_deploy")
}

fn default_deploy_domain() -> String {
    "http://localhost".to_string()
}

fn default_context_window() -> usize {
    20
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            deploy_root: default_deploy_root(),
            deploy_domain: default_deploy_domain(),
            context_window: default_context_window(),
            screenshot_endpoint: None,
            cache: CacheSettings::default(),
        }
    }
}

impl ForgeConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Load `forge.toml` from a directory if present, falling back to
    /// defaults, then apply environment overrides.
    pub fn load(dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join("forge.toml");
        let mut config = if path.exists() {
            match Self::from_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Ignoring unreadable {}: {}", path.display(), e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };
        config.apply_env();
        config
    }

    /// Override settings from `FORGE_*` environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(root) = std::env::var("FORGE_OUTPUT_ROOT") {
            if !root.is_empty() {
                self.output_root = PathBuf::from(root);
            }
        }
        if let Ok(root) = std::env::var("FORGE_DEPLOY_ROOT") {
            if !root.is_empty() {
                self.deploy_root = PathBuf::from(root);
            }
        }
        if let Ok(domain) = std::env::var("FORGE_DEPLOY_DOMAIN") {
            if !domain.is_empty() {
                self.deploy_domain = domain;
            }
        }
        if let Ok(endpoint) = std::env::var("FORGE_SCREENSHOT_ENDPOINT") {
            if !endpoint.is_empty() {
                self.screenshot_endpoint = Some(endpoint);
            }
        }
    }

    /// Output directory for one application and mode.
    pub fn output_dir(&self, mode: crate::GenMode, app_id: crate::AppId) -> PathBuf {
        self.output_root.join(mode.output_dir_name(app_id))
    }

    /// Deploy directory for a deploy key.
    pub fn deploy_dir(&self, deploy_key: &str) -> PathBuf {
        self.deploy_root.join(deploy_key)
    }

    /// Public URL for a deploy key.
    pub fn deploy_url(&self, deploy_key: &str) -> String {
        format!("{}/{}", self.deploy_domain, deploy_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ForgeConfig::default();
        assert_eq!(config.context_window, 20);
        assert_eq!(config.cache.capacity, 1000);
        assert_eq!(config.cache.write_ttl(), Duration::from_secs(1800));
        assert_eq!(config.cache.idle_ttl(), Duration::from_secs(600));
    }

    #[test]
    fn test_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forge.toml");
        std::fs::write(
            &path,
            r#"
output_root = "/srv/forge/out"
deploy_domain = "https://apps.example.com"

[cache]
capacity = 10
"#,
        )
        .unwrap();

        let config = ForgeConfig::from_file(&path).unwrap();
        assert_eq!(config.output_root, PathBuf::from("/srv/forge/out"));
        assert_eq!(config.deploy_domain, "https://apps.example.com");
        assert_eq!(config.cache.capacity, 10);
        // Untouched fields keep defaults
        assert_eq!(config.deploy_root, PathBuf::from("tmp/code_deploy"));
    }

    #[test]
    fn test_derived_paths() {
        let config = ForgeConfig::default();
        assert_eq!(
            config.output_dir(crate::GenMode::Html, 9),
            PathBuf::from("tmp/code_output/html_9")
        );
        assert_eq!(config.deploy_url("abc123"), "http://localhost/abc123");
    }
}
