//! Scripted generation backend for testing.
//!
//! Plays back a predefined sequence of chunks, tool-driven file writes
//! and failures, so the orchestration around a backend can be exercised
//! without a live provider. Also drives the CLI demo.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::backend::{EventSink, GenerationBackend, SessionHandle};
use crate::error::{GenError, GenResult};
use crate::saver::ProjectWorkspace;

/// One scripted emission.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Emit a content chunk.
    Chunk(String),
    /// Request the file-write tool, perform the write, emit completion.
    ToolWrite { path: String, content: String },
    /// Fail the turn.
    Fail(String),
}

/// Scripted backend.
///
/// Captures every prompt it is asked to generate for, and replays its
/// steps on each call.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    steps: Arc<RwLock<Vec<ScriptStep>>>,
    prompts: Arc<RwLock<Vec<String>>>,
    calls: Arc<AtomicUsize>,
    step_delay: Arc<RwLock<Option<std::time::Duration>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a content chunk step.
    pub fn chunk(self, text: impl Into<String>) -> Self {
        self.steps.write().push(ScriptStep::Chunk(text.into()));
        self
    }

    /// Append a tool-driven file write step.
    pub fn tool_write(self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.steps.write().push(ScriptStep::ToolWrite {
            path: path.into(),
            content: content.into(),
        });
        self
    }

    /// Append a failing step.
    pub fn fail(self, cause: impl Into<String>) -> Self {
        self.steps.write().push(ScriptStep::Fail(cause.into()));
        self
    }

    /// Replace the script wholesale.
    pub fn with_steps(self, steps: Vec<ScriptStep>) -> Self {
        *self.steps.write() = steps;
        self
    }

    /// Pause between steps, pacing emission like a real provider.
    pub fn with_step_delay(self, delay: std::time::Duration) -> Self {
        *self.step_delay.write() = Some(delay);
        self
    }

    /// Number of generate calls made.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.read().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(
        &self,
        _session: &SessionHandle,
        prompt: &str,
        workspace: Option<&ProjectWorkspace>,
        sink: &dyn EventSink,
    ) -> GenResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.write().push(prompt.to_string());

        let steps = self.steps.read().clone();
        let mut tool_index = 0u32;
        for step in steps {
            match step {
                ScriptStep::Chunk(text) => {
                    if !sink.content_chunk(&text) {
                        return Err(GenError::Cancelled);
                    }
                }
                ScriptStep::ToolWrite { path, content } => {
                    let workspace = workspace.ok_or_else(|| {
                        GenError::Generation("tool call outside a project-mode turn".into())
                    })?;
                    let args = serde_json::json!({ "path": path }).to_string();
                    if !sink.tool_requested("write_file", &args, tool_index) {
                        return Err(GenError::Cancelled);
                    }
                    tool_index += 1;
                    workspace.write_file(&path, &content)?;
                    if !sink.tool_completed(&format!("wrote {}", path)) {
                        return Err(GenError::Cancelled);
                    }
                }
                ScriptStep::Fail(cause) => {
                    return Err(GenError::Generation(cause));
                }
            }
            // Let the consumer observe events as they arrive
            let delay = { *self.step_delay.read() };
            match delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => tokio::task::yield_now().await,
            }
        }
        Ok(())
    }
}
