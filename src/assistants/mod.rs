pub mod client;
pub mod types;

pub use client::{AssistantsApi, AssistantsClient};
pub use types::{
    ApiError, ApiResult, Assistant, CreateAssistant, Message, MessageContent, MessageList, Role,
    Run, RunError, RunStatus, TextContent, Thread, Tool,
};
