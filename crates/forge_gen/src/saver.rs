//! Validation and persistence of generated code.
//!
//! Each application owns exactly one output directory per mode,
//! `{output_root}/{mode}_{appId}`; regeneration overwrites it in place.
//! Text-mode artifacts are staged in a temp directory and moved in as a
//! set, so a half-written response never lands in the output directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use forge_core::{AppId, CodeArtifact, GenMode};

use crate::error::{GenError, GenResult};

/// Writes validated artifacts into per-application output directories.
pub struct CodeSaver {
    output_root: PathBuf,
}

impl CodeSaver {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    /// Output directory for one application and mode.
    pub fn output_dir(&self, mode: GenMode, app_id: AppId) -> PathBuf {
        self.output_root.join(mode.output_dir_name(app_id))
    }

    /// Save an artifact, returning the directory it now lives in.
    pub fn save(&self, artifact: &CodeArtifact, mode: GenMode, app_id: AppId) -> GenResult<PathBuf> {
        let dir = self.output_dir(mode, app_id);
        match artifact {
            CodeArtifact::Html { html } => {
                if html.trim().is_empty() {
                    return Err(GenError::Validation("HTML content must not be empty".into()));
                }
                self.write_set(&dir, &[("index.html", html)])?;
            }
            CodeArtifact::MultiFile { html, css, js } => {
                if html.trim().is_empty() {
                    return Err(GenError::Validation("HTML content must not be empty".into()));
                }
                self.write_set(&dir, &[("index.html", html), ("style.css", css), ("script.js", js)])?;
            }
            CodeArtifact::ProjectFiles { written_paths } => {
                // Files were already written through the workspace during
                // streaming; nothing left to do here.
                debug!(app_id, files = written_paths.len(), "project files already on disk");
            }
        }
        info!(app_id, %mode, dir = %dir.display(), "saved code artifact");
        Ok(dir)
    }

    /// Write a file set all-or-nothing: everything lands in a staging
    /// directory first and is only moved into place once complete.
    fn write_set(&self, dir: &Path, files: &[(&str, &str)]) -> GenResult<()> {
        fs::create_dir_all(&self.output_root)?;
        let stage = tempfile::Builder::new()
            .prefix(".stage-")
            .tempdir_in(&self.output_root)?;
        for (name, content) in files {
            fs::write(stage.path().join(name), content)?;
        }
        fs::create_dir_all(dir)?;
        for (name, _) in files {
            fs::rename(stage.path().join(name), dir.join(name))?;
        }
        Ok(())
    }
}

/// Project-mode write surface handed to the backend's file-write tool.
///
/// Every requested path is resolved against the project root; absolute
/// paths and traversal components are rejected before anything touches
/// the filesystem.
pub struct ProjectWorkspace {
    root: PathBuf,
    written: Mutex<Vec<PathBuf>>,
}

impl ProjectWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: Mutex::new(Vec::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a tool-supplied path, rejecting anything that would
    /// escape the project root.
    pub fn resolve(&self, relative: &str) -> GenResult<PathBuf> {
        let path = Path::new(relative);
        if path.is_absolute() {
            return Err(GenError::PathEscape(relative.to_string()));
        }
        for component in path.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(GenError::PathEscape(relative.to_string()));
                }
            }
        }
        Ok(self.root.join(path))
    }

    /// Write one project file, creating parent directories as needed.
    pub fn write_file(&self, relative: &str, content: &str) -> GenResult<PathBuf> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        debug!(path = %path.display(), "wrote project file");
        self.written.lock().push(PathBuf::from(relative));
        Ok(path)
    }

    /// Relative paths written so far, in write order.
    pub fn written_paths(&self) -> Vec<PathBuf> {
        self.written.lock().clone()
    }
}
