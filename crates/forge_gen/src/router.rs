//! Generation routing.
//!
//! Entry point for a generation turn: validates the request, resolves
//! the generation mode (explicit tag, the application's recorded mode,
//! or prompt classification on the first turn), records the user
//! message, and dispatches to the session cache + stream normalizer.
//!
//! Turns for the same application queue behind a per-application lock,
//! held from before the backend call until persistence completes, so
//! the output directory only ever has one writer.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use forge_core::{AppId, CoreError, GenMode, MessageId, MessageRole, UserId};
use forge_store::{AppStore, ChatHistoryService};

use crate::backend::GenerationBackend;
use crate::error::GenResult;
use crate::saver::CodeSaver;
use crate::session::SessionCache;
use crate::stream::{spawn_turn, EventStream, TurnContext};

/// One inbound generation request.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DispatchRequest {
    pub app_id: AppId,
    pub author_id: UserId,
    pub prompt: String,
    /// Explicit mode tag; absent on the first prompt of a new application.
    pub mode: Option<GenMode>,
    /// Present on retry: the user message whose ai subtree is replaced.
    pub parent_message_id: Option<MessageId>,
}

/// Routes generation requests to the matching strategy.
pub struct GenerationRouter {
    apps: Arc<dyn AppStore>,
    history: ChatHistoryService,
    cache: Arc<SessionCache>,
    saver: Arc<CodeSaver>,
    backend: Arc<dyn GenerationBackend>,
    locks: Mutex<HashMap<AppId, Arc<AsyncMutex<()>>>>,
}

impl GenerationRouter {
    pub fn new(
        apps: Arc<dyn AppStore>,
        history: ChatHistoryService,
        cache: Arc<SessionCache>,
        saver: Arc<CodeSaver>,
        backend: Arc<dyn GenerationBackend>,
    ) -> Self {
        Self {
            apps,
            history,
            cache,
            saver,
            backend,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Map a prompt to a generation mode.
    ///
    /// Deterministic for identical input; anything ambiguous falls to
    /// MultiFile, the most general supported mode, never an error.
    pub fn classify(prompt: &str) -> GenMode {
        let prompt = prompt.to_lowercase();
        if prompt.contains("react") {
            GenMode::ReactProject
        } else if prompt.contains("vue") {
            GenMode::VueProject
        } else if prompt.contains("single page")
            || prompt.contains("single-page")
            || prompt.contains("one page")
            || prompt.contains("single html")
        {
            GenMode::Html
        } else {
            GenMode::MultiFile
        }
    }

    /// Dispatch a generation turn, returning its event stream.
    pub async fn dispatch(&self, request: DispatchRequest) -> GenResult<EventStream> {
        if request.app_id <= 0 {
            return Err(CoreError::Validation("application id must be positive".into()).into());
        }
        let app = self
            .apps
            .get_app(request.app_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("application {}", request.app_id)))?;
        if app.user_id != request.author_id {
            return Err(CoreError::Authorization(format!(
                "user {} does not own application {}",
                request.author_id, app.id
            ))
            .into());
        }

        // Record the user turn. A retry replaces the parent's ai subtree
        // and regenerates from the original user content.
        let (prompt, user_message_id) = match request.parent_message_id {
            Some(parent_id) => {
                let parent = self.history.get(parent_id).await?;
                if parent.role != MessageRole::User {
                    return Err(
                        CoreError::Validation("only user messages can be retried".into()).into(),
                    );
                }
                if parent.app_id != app.id {
                    return Err(CoreError::Validation(
                        "message belongs to another application".into(),
                    )
                    .into());
                }
                let removed = self.history.delete_ai_children(parent_id).await?;
                debug!(parent = parent_id, removed, "retry: cleared ai subtree");
                (parent.content, parent_id)
            }
            None => {
                if request.prompt.trim().is_empty() {
                    return Err(CoreError::Validation("prompt must not be empty".into()).into());
                }
                let id = self
                    .history
                    .add_message(
                        app.id,
                        request.author_id,
                        MessageRole::User,
                        request.prompt.clone(),
                        None,
                    )
                    .await?;
                (request.prompt, id)
            }
        };

        // Explicit tag wins, then the recorded mode; a brand-new
        // application gets classified and the choice persisted.
        let mode = match request.mode.or(app.mode) {
            Some(mode) => mode,
            None => {
                let mode = Self::classify(&prompt);
                self.apps.set_mode(app.id, mode).await?;
                info!(app_id = app.id, %mode, "classified generation mode");
                mode
            }
        };

        let guard = self.app_lock(app.id).lock_owned().await;
        let session = self.cache.get(app.id, mode).await;
        info!(app_id = app.id, %mode, user_message = user_message_id, "dispatching generation");

        let turn = TurnContext {
            app_id: app.id,
            author_id: request.author_id,
            mode,
            user_message_id,
        };
        Ok(spawn_turn(
            self.backend.clone(),
            session,
            self.saver.clone(),
            self.history.clone(),
            turn,
            prompt,
            guard,
        ))
    }

    /// Re-run generation for a user message, replacing its ai subtree.
    pub async fn retry(&self, user_message_id: MessageId, author_id: UserId) -> GenResult<EventStream> {
        let message = self.history.get(user_message_id).await?;
        self.dispatch(DispatchRequest {
            app_id: message.app_id,
            author_id,
            prompt: String::new(),
            mode: None,
            parent_message_id: Some(user_message_id),
        })
        .await
    }

    /// Session cache backing this router.
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    fn app_lock(&self, app_id: AppId) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .entry(app_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}
