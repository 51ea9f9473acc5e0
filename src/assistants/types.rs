//! Wire types for the Assistants API (v2)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by the API client
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection, timeout or body decoding failure
    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Client could not be set up
    #[error("Client configuration error: {0}")]
    Config(String),
}

/// A tool an assistant may use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tool {
    CodeInterpreter,
    FileSearch,
    Function { function: serde_json::Value },
}

impl Tool {
    /// Parse a tool name given on the command line
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "code_interpreter" => Some(Tool::CodeInterpreter),
            "file_search" => Some(Tool::FileSearch),
            _ => None,
        }
    }
}

/// Request body for creating an assistant
#[derive(Debug, Clone, Serialize)]
pub struct CreateAssistant {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub tools: Vec<Tool>,
}

impl CreateAssistant {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            model: crate::config::DEFAULT_MODEL.to_string(),
            tools: Vec::new(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Request body for posting a message
#[derive(Debug, Clone, Serialize)]
pub struct CreateMessage<'a> {
    pub role: Role,
    pub content: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: Vec<MessageContent>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub run_id: Option<String>,
}

impl Message {
    /// Concatenation of every text part, in order
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                MessageContent::Text { text } => Some(text.value.as_str()),
                MessageContent::Other => None,
            })
            .collect()
    }
}

/// One typed part of a message body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    /// Images, refusals and anything else that isn't text
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageList {
    pub data: Vec<Message>,
    #[serde(default)]
    pub first_id: Option<String>,
    #[serde(default)]
    pub last_id: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

impl MessageList {
    /// The newest assistant-authored message. Ties go to the earlier entry,
    /// since lists are requested newest first.
    pub fn latest_assistant(&self) -> Option<&Message> {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, m)| m.role == Role::Assistant)
            .max_by_key(|(pos, m)| (m.created_at, std::cmp::Reverse(*pos)))
            .map(|(_, m)| m)
    }
}

/// Request body for starting a run
#[derive(Debug, Clone, Serialize)]
pub struct CreateRun<'a> {
    pub assistant_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub assistant_id: Option<String>,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

/// Service-supplied failure reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    /// A status this client doesn't know; treated as still running
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether polling should stop at this status
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed
                | RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Expired
                | RunStatus::Incomplete
                | RunStatus::RequiresAction
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
