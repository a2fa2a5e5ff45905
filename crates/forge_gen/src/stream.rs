//! Stream normalization.
//!
//! Bridges the backend's callback-driven emission into one ordered
//! event sequence behind a channel. The backend runs on its own task
//! and pushes through a [`ChannelSink`]; the caller pulls from an
//! [`EventStream`] until the single terminal event.
//!
//! Dropping the stream closes the channel; the next sink callback
//! reports it and the backend stops, so cancellation propagates
//! upstream without extra signalling.

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

use forge_core::{AppId, CodeArtifact, GenMode, MessageId, MessageRole, StreamEvent, UserId};
use forge_store::ChatHistoryService;

use crate::backend::{EventSink, GenerationBackend, SessionHandle};
use crate::error::{GenError, GenResult};
use crate::parser;
use crate::saver::{CodeSaver, ProjectWorkspace};

/// Ordered event sequence for one generation turn.
///
/// Yields events in provider emission order and ends after exactly one
/// terminal event. Dropping it cancels the turn upstream.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<StreamEvent>,
}

impl EventStream {
    fn new(rx: mpsc::UnboundedReceiver<StreamEvent>) -> Self {
        Self { rx }
    }

    /// Receive the next event, or `None` once the stream is over.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Drain the stream to completion.
    pub async fn collect_events(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }
}

impl futures::Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Sink fed by the backend; relays events and accumulates text.
struct ChannelSink {
    tx: mpsc::UnboundedSender<StreamEvent>,
    buffer: Mutex<String>,
}

impl ChannelSink {
    fn new(tx: mpsc::UnboundedSender<StreamEvent>) -> Self {
        Self {
            tx,
            buffer: Mutex::new(String::new()),
        }
    }

    fn text(&self) -> String {
        self.buffer.lock().clone()
    }
}

impl EventSink for ChannelSink {
    fn content_chunk(&self, text: &str) -> bool {
        self.buffer.lock().push_str(text);
        self.tx
            .send(StreamEvent::ContentChunk { text: text.to_string() })
            .is_ok()
    }

    fn tool_requested(&self, name: &str, args: &str, index: u32) -> bool {
        self.tx
            .send(StreamEvent::ToolInvocationRequested {
                name: name.to_string(),
                args: args.to_string(),
                index,
            })
            .is_ok()
    }

    fn tool_completed(&self, result: &str) -> bool {
        self.tx
            .send(StreamEvent::ToolInvocationCompleted {
                result: result.to_string(),
            })
            .is_ok()
    }
}

/// Identity of one generation turn.
#[derive(Debug, Clone)]
pub(crate) struct TurnContext {
    pub app_id: AppId,
    pub author_id: UserId,
    pub mode: GenMode,
    /// The user message this turn answers.
    pub user_message_id: MessageId,
}

/// Run a generation turn on its own task and return the event stream.
///
/// The per-application guard is held until post-stream persistence is
/// done, so a queued turn for the same application cannot start before
/// this one's artifacts and chat entry have landed.
pub(crate) fn spawn_turn(
    backend: Arc<dyn GenerationBackend>,
    session: Arc<SessionHandle>,
    saver: Arc<CodeSaver>,
    history: ChatHistoryService,
    turn: TurnContext,
    prompt: String,
    guard: OwnedMutexGuard<()>,
) -> EventStream {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let _guard = guard;
        let sink = ChannelSink::new(tx.clone());
        let workspace = turn
            .mode
            .is_project()
            .then(|| ProjectWorkspace::new(saver.output_dir(turn.mode, turn.app_id)));

        match backend
            .generate(&session, &prompt, workspace.as_ref(), &sink)
            .await
        {
            Ok(()) => {
                let text = sink.text();
                match finish_turn(&saver, &history, &session, &turn, &text, workspace).await {
                    Ok(dir) => {
                        let _ = tx.send(StreamEvent::Completed { dir });
                    }
                    Err(e) => {
                        warn!(app_id = turn.app_id, error = %e, "post-stream persistence failed");
                        record_failure(&history, &turn, &e).await;
                        let _ = tx.send(StreamEvent::Failed { cause: e.to_string() });
                    }
                }
            }
            Err(GenError::Cancelled) => {
                debug!(app_id = turn.app_id, "generation cancelled by consumer");
            }
            Err(e) => {
                warn!(app_id = turn.app_id, error = %e, "generation failed");
                record_failure(&history, &turn, &e).await;
                let _ = tx.send(StreamEvent::Failed { cause: e.to_string() });
            }
        }
    });

    EventStream::new(rx)
}

/// Validate, save and record a completed turn. The partial text buffer
/// never reaches disk unless this whole function succeeds.
async fn finish_turn(
    saver: &CodeSaver,
    history: &ChatHistoryService,
    session: &SessionHandle,
    turn: &TurnContext,
    text: &str,
    workspace: Option<ProjectWorkspace>,
) -> GenResult<PathBuf> {
    let artifact = match &workspace {
        None => parser::parse(turn.mode, text)?,
        Some(ws) => CodeArtifact::ProjectFiles {
            written_paths: ws.written_paths(),
        },
    };

    let dir = saver.save(&artifact, turn.mode, turn.app_id)?;

    // Full accumulated text is the reply; tool-driven turns without
    // narration get a short summary instead.
    let reply = if text.trim().is_empty() {
        match &artifact {
            CodeArtifact::ProjectFiles { written_paths } => {
                format!("Generated {} project files.", written_paths.len())
            }
            _ => text.to_string(),
        }
    } else {
        text.to_string()
    };

    let ai_id = history
        .add_message(
            turn.app_id,
            turn.author_id,
            MessageRole::Ai,
            reply,
            Some(turn.user_message_id),
        )
        .await
        .map_err(|e| GenError::Persistence(e.to_string()))?;

    // Keep the cached handle's window in step with what was persisted.
    if let Ok(user) = history.get(turn.user_message_id).await {
        session.remember(user);
    }
    if let Ok(ai) = history.get(ai_id).await {
        session.remember(ai);
    }

    info!(app_id = turn.app_id, ai_message = ai_id, "generation turn persisted");
    Ok(dir)
}

/// Record a diagnostic ai entry so the conversation stays navigable
/// after a failed turn. The partial output buffer is discarded.
async fn record_failure(history: &ChatHistoryService, turn: &TurnContext, cause: &GenError) {
    let diagnostic = format!("Generation failed: {}", cause);
    if let Err(e) = history
        .add_message(
            turn.app_id,
            turn.author_id,
            MessageRole::Ai,
            diagnostic,
            Some(turn.user_message_id),
        )
        .await
    {
        error!(app_id = turn.app_id, error = %e, "failed to record diagnostic entry");
    }
}
