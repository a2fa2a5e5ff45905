//! Generation capability boundary.
//!
//! The AI engine is consumed as a black box behind [`GenerationBackend`]:
//! given a session handle and a prompt it drives the [`EventSink`]
//! callbacks on its own schedule and returns once the turn is over.
//! The stream normalizer bridges those callbacks into an ordered,
//! cancellable event sequence.

use async_trait::async_trait;
use parking_lot::Mutex;

use forge_core::{AppId, ChatMessage, GenMode};

use crate::error::GenResult;
use crate::saver::ProjectWorkspace;

/// Callback surface a backend drives while generating.
///
/// Every callback returns `true` while the consumer is still listening.
/// Once a callback returns `false` the backend must stop producing and
/// return [`GenError::Cancelled`](crate::GenError::Cancelled).
pub trait EventSink: Send + Sync {
    /// A fragment of generated text.
    fn content_chunk(&self, text: &str) -> bool;

    /// The model requested a tool invocation.
    fn tool_requested(&self, name: &str, args: &str, index: u32) -> bool;

    /// A tool invocation finished.
    fn tool_completed(&self, result: &str) -> bool;
}

/// Provider-bound conversation state for one (application, mode) pair.
///
/// Holds the bounded recent-message window loaded once at construction.
/// Eviction from the session cache drops this handle only; history stays
/// persisted and a replacement handle is reseeded from it on next use.
pub struct SessionHandle {
    app_id: AppId,
    mode: GenMode,
    window: usize,
    context: Mutex<Vec<ChatMessage>>,
}

impl SessionHandle {
    /// Create a handle seeded with recent history, oldest first.
    pub fn new(app_id: AppId, mode: GenMode, seed: Vec<ChatMessage>, window: usize) -> Self {
        Self {
            app_id,
            mode,
            window,
            context: Mutex::new(seed),
        }
    }

    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    pub fn mode(&self) -> GenMode {
        self.mode
    }

    /// Snapshot of the conversation window, oldest first.
    pub fn context(&self) -> Vec<ChatMessage> {
        self.context.lock().clone()
    }

    /// Append a turn message, trimming the window from the front.
    pub fn remember(&self, message: ChatMessage) {
        let mut context = self.context.lock();
        context.push(message);
        let len = context.len();
        if len > self.window {
            context.drain(..len - self.window);
        }
    }
}

/// The consumed generation capability.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Drive one generation turn for `session`.
    ///
    /// Content and tool events go through `sink` in emission order.
    /// Project-mode turns receive a `workspace`; file writes requested by
    /// the model go through it (and only through it) while streaming.
    /// Returning `Ok` marks normal completion, `Err` failure.
    async fn generate(
        &self,
        session: &SessionHandle,
        prompt: &str,
        workspace: Option<&ProjectWorkspace>,
        sink: &dyn EventSink,
    ) -> GenResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forge_core::MessageRole;

    fn message(id: i64, content: &str) -> ChatMessage {
        ChatMessage {
            id,
            app_id: 1,
            user_id: 1,
            role: MessageRole::User,
            content: content.to_string(),
            parent_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_remember_trims_window() {
        let handle = SessionHandle::new(1, GenMode::Html, Vec::new(), 3);
        for i in 0..5 {
            handle.remember(message(i, &format!("m{}", i)));
        }
        let context = handle.context();
        assert_eq!(context.len(), 3);
        assert_eq!(context[0].content, "m2");
        assert_eq!(context[2].content, "m4");
    }
}
