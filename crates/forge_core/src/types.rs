//! Core types for the generation and delivery pipeline.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application identifier.
pub type AppId = i64;

/// User identifier.
pub type UserId = i64;

/// Chat message identifier.
pub type MessageId = i64;

/// Generation mode governing output shape and build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenMode {
    /// Single self-contained HTML page.
    Html,
    /// index.html + style.css + script.js triplet.
    MultiFile,
    /// Full Vue project written through tool calls, built before deploy.
    VueProject,
    /// Full React project written through tool calls, built before deploy.
    ReactProject,
}

impl GenMode {
    /// Get all mode variants.
    pub fn all() -> &'static [GenMode] {
        &[
            GenMode::Html,
            GenMode::MultiFile,
            GenMode::VueProject,
            GenMode::ReactProject,
        ]
    }

    /// Stable wire value for this mode.
    pub fn value(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::MultiFile => "multi_file",
            Self::VueProject => "vue_project",
            Self::ReactProject => "react_project",
        }
    }

    /// Parse a wire value back into a mode.
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "html" => Some(Self::Html),
            "multi_file" => Some(Self::MultiFile),
            "vue_project" => Some(Self::VueProject),
            "react_project" => Some(Self::ReactProject),
            _ => None,
        }
    }

    /// Whether this mode produces a project that needs a build step
    /// before it can be published.
    pub fn is_project(&self) -> bool {
        matches!(self, Self::VueProject | Self::ReactProject)
    }

    /// Name of the per-application output directory for this mode.
    pub fn output_dir_name(&self, app_id: AppId) -> String {
        format!("{}_{}", self.value(), app_id)
    }
}

impl std::fmt::Display for GenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.value())
    }
}

/// An application owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: AppId,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "appName")]
    pub name: String,
    /// The prompt the application was created from.
    #[serde(rename = "initPrompt")]
    pub init_prompt: String,
    /// Current generation mode. Unset until chosen explicitly or by
    /// prompt classification on the first generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<GenMode>,
    #[serde(rename = "deployKey", skip_serializing_if = "Option::is_none")]
    pub deploy_key: Option<String>,
    #[serde(rename = "deployedAt", skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,
    /// Cover image reference, refreshed asynchronously after deploy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Maximum length used when deriving an application name from its prompt.
pub const APP_NAME_MAX_LENGTH: usize = 12;

impl Application {
    /// Derive a display name from an init prompt.
    pub fn name_from_prompt(prompt: &str) -> String {
        prompt.chars().take(APP_NAME_MAX_LENGTH).collect()
    }
}

/// Message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Ai,
}

impl MessageRole {
    /// Stable wire value for this role.
    pub fn value(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }

    /// Parse a wire value back into a role.
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }
}

/// A single chat message in an application's history.
///
/// Ai messages always reference the user message they answer through
/// `parent_id`; user messages never carry a parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    #[serde(rename = "appId")]
    pub app_id: AppId,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub role: MessageRole,
    pub content: String,
    #[serde(rename = "parentId", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<MessageId>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// One event in a generation stream.
///
/// A stream is a sequence of content/tool events closed by exactly one
/// terminal event, `Completed` or `Failed`, in provider emission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A fragment of generated text.
    ContentChunk { text: String },
    /// The model asked for a tool invocation (a file write).
    ToolInvocationRequested {
        name: String,
        args: String,
        index: u32,
    },
    /// A tool invocation finished.
    ToolInvocationCompleted { result: String },
    /// Generation finished and artifacts were persisted.
    Completed {
        /// Output directory the artifacts were saved to.
        dir: PathBuf,
    },
    /// Generation or persistence failed; no artifacts were kept.
    Failed { cause: String },
}

impl StreamEvent {
    /// Whether this event terminates its stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Validated, saved output of one generation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CodeArtifact {
    /// A single HTML document.
    Html { html: String },
    /// HTML plus optional CSS and JS, saved as three files.
    MultiFile {
        html: String,
        css: String,
        js: String,
    },
    /// Files already written by tool calls during streaming.
    ProjectFiles { written_paths: Vec<PathBuf> },
}

/// Record of a published deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    #[serde(rename = "appId")]
    pub app_id: AppId,
    /// Short key mapping the deploy directory to a public URL.
    /// Stable across redeploys of the same application.
    #[serde(rename = "deployKey")]
    pub deploy_key: String,
    #[serde(rename = "sourceDir")]
    pub source_dir: PathBuf,
    #[serde(rename = "deployDir")]
    pub deploy_dir: PathBuf,
    #[serde(rename = "deployedAt")]
    pub deployed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trip() {
        for mode in GenMode::all() {
            assert_eq!(GenMode::from_value(mode.value()), Some(*mode));
        }
        assert_eq!(GenMode::from_value("cobol_project"), None);
    }

    #[test]
    fn test_output_dir_name() {
        assert_eq!(GenMode::MultiFile.output_dir_name(42), "multi_file_42");
        assert_eq!(GenMode::VueProject.output_dir_name(7), "vue_project_7");
    }

    #[test]
    fn test_project_modes() {
        assert!(GenMode::VueProject.is_project());
        assert!(GenMode::ReactProject.is_project());
        assert!(!GenMode::Html.is_project());
        assert!(!GenMode::MultiFile.is_project());
    }

    #[test]
    fn test_name_from_prompt_truncates() {
        let name = Application::name_from_prompt("a very long prompt describing an app");
        assert_eq!(name.chars().count(), APP_NAME_MAX_LENGTH);
    }

    #[test]
    fn test_stream_event_terminal() {
        assert!(StreamEvent::Completed { dir: PathBuf::new() }.is_terminal());
        assert!(StreamEvent::Failed { cause: "x".into() }.is_terminal());
        assert!(!StreamEvent::ContentChunk { text: "x".into() }.is_terminal());
    }

    #[test]
    fn test_stream_event_wire_shape() {
        let event = StreamEvent::ToolInvocationRequested {
            name: "write_file".to_string(),
            args: "{\"path\":\"src/App.vue\"}".to_string(),
            index: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tool_invocation_requested");
        assert_eq!(json["name"], "write_file");
    }
}
