//! Storage boundary traits.
//!
//! Query shapes are exactly the ones the pipeline needs: lookups by id,
//! parent-indexed deletes, recency-ordered windows and a strictly-less-than
//! creation-time cursor.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forge_core::{
    AppId, Application, ChatMessage, DeploymentRecord, GenMode, MessageId, MessageRole, UserId,
};

use crate::error::StoreResult;

/// Fields for a message about to be appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub app_id: AppId,
    pub user_id: UserId,
    pub role: MessageRole,
    pub content: String,
    pub parent_id: Option<MessageId>,
}

/// Application persistence.
#[async_trait]
pub trait AppStore: Send + Sync {
    /// Look up an application by id.
    async fn get_app(&self, app_id: AppId) -> StoreResult<Option<Application>>;

    /// Create an application, assigning its id.
    async fn create_app(
        &self,
        user_id: UserId,
        name: String,
        init_prompt: String,
        mode: Option<GenMode>,
    ) -> StoreResult<Application>;

    /// Record the generation mode chosen for an application.
    async fn set_mode(&self, app_id: AppId, mode: GenMode) -> StoreResult<()>;

    /// Record a successful deploy.
    async fn set_deploy_info(
        &self,
        app_id: AppId,
        deploy_key: String,
        deployed_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Update the cover image reference.
    async fn set_cover(&self, app_id: AppId, cover: String) -> StoreResult<()>;

    /// Delete an application row. Chat history cascade is the caller's job.
    async fn delete_app(&self, app_id: AppId) -> StoreResult<bool>;
}

/// Chat message persistence. Append-only except for retry deletions.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Append a message, assigning id and creation time.
    async fn insert_message(&self, message: NewMessage) -> StoreResult<ChatMessage>;

    /// Look up a message by id.
    async fn get_message(&self, id: MessageId) -> StoreResult<Option<ChatMessage>>;

    /// Delete every ai message whose parent is `parent_id`. Returns the
    /// number of rows removed.
    async fn delete_ai_children(&self, parent_id: MessageId) -> StoreResult<u64>;

    /// Child messages of `parent_id`, ascending by creation time.
    async fn children(&self, parent_id: MessageId) -> StoreResult<Vec<ChatMessage>>;

    /// The most recent `limit` messages of an application, descending by
    /// creation time.
    async fn recent_messages(&self, app_id: AppId, limit: usize) -> StoreResult<Vec<ChatMessage>>;

    /// Messages created strictly before `before` (all when `None`),
    /// descending by creation time, at most `limit`.
    async fn page_messages(
        &self,
        app_id: AppId,
        limit: usize,
        before: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<ChatMessage>>;

    /// Remove an application's entire history. Returns rows removed.
    async fn delete_by_app(&self, app_id: AppId) -> StoreResult<u64>;
}

/// Deployment record persistence.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Whether a deploy key is already taken by any application.
    async fn deploy_key_exists(&self, deploy_key: &str) -> StoreResult<bool>;

    /// Create or overwrite the record for an application.
    async fn upsert_record(&self, record: DeploymentRecord) -> StoreResult<()>;

    /// The current record for an application, if it ever deployed.
    async fn get_record(&self, app_id: AppId) -> StoreResult<Option<DeploymentRecord>>;
}
