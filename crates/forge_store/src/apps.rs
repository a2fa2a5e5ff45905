//! Application lifecycle helpers.
//!
//! Creation and deletion live outside the generation pipeline, but both
//! touch more than the application row: names derive from the prompt,
//! and deleting an application takes its chat history with it.

use std::sync::Arc;

use tracing::{info, warn};

use forge_core::{AppId, Application, GenMode, UserId};

use crate::error::{StoreError, StoreResult};
use crate::history::ChatHistoryService;
use crate::traits::AppStore;

/// Application-level operations over the stores.
#[derive(Clone)]
pub struct AppService {
    apps: Arc<dyn AppStore>,
    history: ChatHistoryService,
}

impl AppService {
    pub fn new(apps: Arc<dyn AppStore>, history: ChatHistoryService) -> Self {
        Self { apps, history }
    }

    /// Create an application from its init prompt. The display name is
    /// derived from the prompt; the mode may stay unset until the first
    /// generation classifies it.
    pub async fn create_from_prompt(
        &self,
        user_id: UserId,
        init_prompt: impl Into<String>,
        mode: Option<GenMode>,
    ) -> StoreResult<Application> {
        let init_prompt = init_prompt.into();
        if init_prompt.trim().is_empty() {
            return Err(StoreError::Validation("init prompt must not be empty".into()));
        }
        if init_prompt.len() > 2000 {
            return Err(StoreError::Validation(
                "init prompt too long, at most 2000 characters".into(),
            ));
        }
        let name = Application::name_from_prompt(&init_prompt);
        let app = self.apps.create_app(user_id, name, init_prompt, mode).await?;
        info!(app_id = app.id, "created application");
        Ok(app)
    }

    /// Delete an application and cascade to its chat history. A history
    /// cleanup failure is logged but does not block the deletion.
    pub async fn remove(&self, app_id: AppId) -> StoreResult<bool> {
        match self.history.delete_by_app(app_id).await {
            Ok(removed) => info!(app_id, removed, "deleted application chat history"),
            Err(e) => warn!(app_id, error = %e, "failed to delete chat history"),
        }
        self.apps.delete_app(app_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::traits::ChatStore;
    use forge_core::MessageRole;

    fn service() -> (AppService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let history = ChatHistoryService::new(store.clone());
        (AppService::new(store.clone(), history), store)
    }

    #[tokio::test]
    async fn test_name_derived_from_prompt() {
        let (apps, _) = service();
        let app = apps
            .create_from_prompt(1, "a dashboard for tracking orders", None)
            .await
            .unwrap();
        assert_eq!(app.name, "a dashboard ");
        assert!(app.mode.is_none());
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let (apps, _) = service();
        let err = apps.create_from_prompt(1, "  ", None).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_remove_cascades_history() {
        let (apps, store) = service();
        let app = apps.create_from_prompt(1, "a page", None).await.unwrap();
        let history = ChatHistoryService::new(store.clone());
        history
            .add_message(app.id, 1, MessageRole::User, "hello", None)
            .await
            .unwrap();

        assert!(apps.remove(app.id).await.unwrap());
        assert!(store.get_app(app.id).await.unwrap().is_none());
        assert!(store
            .recent_messages(app.id, 10)
            .await
            .unwrap()
            .is_empty());
    }
}
