//! In-memory store.
//!
//! Reference implementation of the storage traits, backed by plain maps
//! behind a `parking_lot` lock. Used by the test suites and the CLI demo;
//! production deployments put a database behind the same traits.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use forge_core::{
    AppId, Application, ChatMessage, DeploymentRecord, GenMode, MessageId, MessageRole, UserId,
};

use crate::error::StoreResult;
use crate::traits::{AppStore, ChatStore, DeploymentStore, NewMessage};

#[derive(Default)]
struct Inner {
    apps: HashMap<AppId, Application>,
    /// Insertion order doubles as creation order within an application.
    messages: Vec<ChatMessage>,
    deployments: HashMap<AppId, DeploymentRecord>,
    next_app_id: AppId,
    next_message_id: MessageId,
}

/// In-memory implementation of all three storage traits.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted messages, across all applications.
    pub fn message_count(&self) -> usize {
        self.inner.read().messages.len()
    }
}

#[async_trait]
impl AppStore for MemoryStore {
    async fn get_app(&self, app_id: AppId) -> StoreResult<Option<Application>> {
        Ok(self.inner.read().apps.get(&app_id).cloned())
    }

    async fn create_app(
        &self,
        user_id: UserId,
        name: String,
        init_prompt: String,
        mode: Option<GenMode>,
    ) -> StoreResult<Application> {
        let mut inner = self.inner.write();
        inner.next_app_id += 1;
        let app = Application {
            id: inner.next_app_id,
            user_id,
            name,
            init_prompt,
            mode,
            deploy_key: None,
            deployed_at: None,
            cover: None,
            created_at: Utc::now(),
        };
        inner.apps.insert(app.id, app.clone());
        Ok(app)
    }

    async fn set_mode(&self, app_id: AppId, mode: GenMode) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if let Some(app) = inner.apps.get_mut(&app_id) {
            app.mode = Some(mode);
        }
        Ok(())
    }

    async fn set_deploy_info(
        &self,
        app_id: AppId,
        deploy_key: String,
        deployed_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if let Some(app) = inner.apps.get_mut(&app_id) {
            app.deploy_key = Some(deploy_key);
            app.deployed_at = Some(deployed_at);
        }
        Ok(())
    }

    async fn set_cover(&self, app_id: AppId, cover: String) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if let Some(app) = inner.apps.get_mut(&app_id) {
            app.cover = Some(cover);
        }
        Ok(())
    }

    async fn delete_app(&self, app_id: AppId) -> StoreResult<bool> {
        Ok(self.inner.write().apps.remove(&app_id).is_some())
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn insert_message(&self, message: NewMessage) -> StoreResult<ChatMessage> {
        let mut inner = self.inner.write();
        inner.next_message_id += 1;
        let stored = ChatMessage {
            id: inner.next_message_id,
            app_id: message.app_id,
            user_id: message.user_id,
            role: message.role,
            content: message.content,
            parent_id: message.parent_id,
            created_at: Utc::now(),
        };
        inner.messages.push(stored.clone());
        Ok(stored)
    }

    async fn get_message(&self, id: MessageId) -> StoreResult<Option<ChatMessage>> {
        Ok(self
            .inner
            .read()
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn delete_ai_children(&self, parent_id: MessageId) -> StoreResult<u64> {
        let mut inner = self.inner.write();
        let before = inner.messages.len();
        inner
            .messages
            .retain(|m| !(m.role == MessageRole::Ai && m.parent_id == Some(parent_id)));
        Ok((before - inner.messages.len()) as u64)
    }

    async fn children(&self, parent_id: MessageId) -> StoreResult<Vec<ChatMessage>> {
        let inner = self.inner.read();
        let mut children: Vec<ChatMessage> = inner
            .messages
            .iter()
            .filter(|m| m.parent_id == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by_key(|m| (m.created_at, m.id));
        Ok(children)
    }

    async fn recent_messages(&self, app_id: AppId, limit: usize) -> StoreResult<Vec<ChatMessage>> {
        let inner = self.inner.read();
        let mut messages: Vec<ChatMessage> = inner
            .messages
            .iter()
            .filter(|m| m.app_id == app_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| std::cmp::Reverse((m.created_at, m.id)));
        messages.truncate(limit);
        Ok(messages)
    }

    async fn page_messages(
        &self,
        app_id: AppId,
        limit: usize,
        before: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<ChatMessage>> {
        let inner = self.inner.read();
        let mut messages: Vec<ChatMessage> = inner
            .messages
            .iter()
            .filter(|m| m.app_id == app_id)
            .filter(|m| before.map_or(true, |cursor| m.created_at < cursor))
            .cloned()
            .collect();
        messages.sort_by_key(|m| std::cmp::Reverse((m.created_at, m.id)));
        messages.truncate(limit);
        Ok(messages)
    }

    async fn delete_by_app(&self, app_id: AppId) -> StoreResult<u64> {
        let mut inner = self.inner.write();
        let before = inner.messages.len();
        inner.messages.retain(|m| m.app_id != app_id);
        Ok((before - inner.messages.len()) as u64)
    }
}

#[async_trait]
impl DeploymentStore for MemoryStore {
    async fn deploy_key_exists(&self, deploy_key: &str) -> StoreResult<bool> {
        Ok(self
            .inner
            .read()
            .deployments
            .values()
            .any(|r| r.deploy_key == deploy_key))
    }

    async fn upsert_record(&self, record: DeploymentRecord) -> StoreResult<()> {
        self.inner.write().deployments.insert(record.app_id, record);
        Ok(())
    }

    async fn get_record(&self, app_id: AppId) -> StoreResult<Option<DeploymentRecord>> {
        Ok(self.inner.read().deployments.get(&app_id).cloned())
    }
}
