//! Chat history operations.
//!
//! Enforces the conversation invariants on top of a [`ChatStore`]:
//! ai replies always point at a user message of the same application,
//! retries replace a message's ai subtree instead of appending to it,
//! and reads come back in the order each caller needs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use forge_core::{AppId, ChatMessage, MessageId, MessageRole, UserId};

use crate::error::{StoreError, StoreResult};
use crate::traits::{ChatStore, NewMessage};

/// Hard cap on history page size.
pub const MAX_PAGE_SIZE: usize = 50;

/// Chat history service over a storage backend.
#[derive(Clone)]
pub struct ChatHistoryService {
    store: Arc<dyn ChatStore>,
}

impl ChatHistoryService {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// Append a message after validating the role invariants.
    ///
    /// Ai messages must reference an existing user message of the same
    /// application; user messages never carry a parent.
    pub async fn add_message(
        &self,
        app_id: AppId,
        author_id: UserId,
        role: MessageRole,
        content: impl Into<String>,
        parent_id: Option<MessageId>,
    ) -> StoreResult<MessageId> {
        let content = content.into();
        if app_id <= 0 {
            return Err(StoreError::Validation("application id must be positive".into()));
        }
        if author_id <= 0 {
            return Err(StoreError::Validation("author id must be positive".into()));
        }
        if content.trim().is_empty() {
            return Err(StoreError::Validation("message content must not be empty".into()));
        }

        match role {
            MessageRole::Ai => {
                let parent_id = parent_id.ok_or_else(|| {
                    StoreError::Validation("ai message must reference a user message".into())
                })?;
                let parent = self
                    .store
                    .get_message(parent_id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(format!("message {}", parent_id)))?;
                if parent.role != MessageRole::User {
                    return Err(StoreError::Validation(
                        "ai message can only reply to a user message".into(),
                    ));
                }
                if parent.app_id != app_id {
                    return Err(StoreError::Validation(
                        "parent message belongs to another application".into(),
                    ));
                }
            }
            MessageRole::User => {
                if parent_id.is_some() {
                    return Err(StoreError::Validation(
                        "user message must not carry a parent".into(),
                    ));
                }
            }
        }

        let stored = self
            .store
            .insert_message(NewMessage {
                app_id,
                user_id: author_id,
                role,
                content,
                parent_id,
            })
            .await?;
        Ok(stored.id)
    }

    /// Look up a message, failing when absent.
    pub async fn get(&self, id: MessageId) -> StoreResult<ChatMessage> {
        self.store
            .get_message(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("message {}", id)))
    }

    /// Delete every ai reply to a user message. The retry entry point:
    /// the caller regenerates against the same parent afterwards, so the
    /// subtree is replaced rather than appended to.
    pub async fn delete_ai_children(&self, user_message_id: MessageId) -> StoreResult<u64> {
        if user_message_id <= 0 {
            return Err(StoreError::Validation("parent message id must be positive".into()));
        }
        let removed = self.store.delete_ai_children(user_message_id).await?;
        debug!(parent = user_message_id, removed, "cleared ai replies");
        Ok(removed)
    }

    /// Child messages of a parent, ascending by creation time.
    pub async fn children(&self, parent_id: MessageId) -> StoreResult<Vec<ChatMessage>> {
        self.store.children(parent_id).await
    }

    /// The most recent `max_count` messages, ascending chronologically.
    /// Seeds fresh session handles.
    pub async fn context(&self, app_id: AppId, max_count: usize) -> StoreResult<Vec<ChatMessage>> {
        let mut messages = self.store.recent_messages(app_id, max_count).await?;
        messages.reverse();
        Ok(messages)
    }

    /// Cursor-paged history for display: messages created strictly before
    /// `before`, newest first, page size capped at [`MAX_PAGE_SIZE`].
    pub async fn page(
        &self,
        app_id: AppId,
        page_size: usize,
        before: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<ChatMessage>> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(StoreError::Validation(format!(
                "page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        self.store.page_messages(app_id, page_size, before).await
    }

    /// Remove an application's entire history (application deletion cascade).
    pub async fn delete_by_app(&self, app_id: AppId) -> StoreResult<u64> {
        self.store.delete_by_app(app_id).await
    }
}
