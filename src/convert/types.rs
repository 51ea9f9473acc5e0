use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::extract::{ExtractError, ExtractionMode};
use crate::assistants::{ApiError, RunStatus};
use crate::steps::{StepIndexPolicy, ValidationReport};

/// Result type for conversion operations
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Why a conversion produced no output
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Run ended with status {status}: {reason}")]
    RunFailed { status: RunStatus, reason: String },

    #[error("No response from assistant")]
    NoAssistantReply,

    #[error("Could not extract JSON content from response: {source}")]
    Extraction { source: ExtractError, raw: String },

    #[error("Error parsing JSON response: {source}")]
    Parse { source: serde_json::Error, raw: String },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    InvalidSteps {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Validation failed with {} error(s)", .0.errors().count())]
    Validation(ValidationReport),

    #[error("Run did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Conversion cancelled")]
    Cancelled,

    #[error("Failed to serialize steps: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ConvertError {
    /// The assistant's reply text, when the failure happened after one arrived
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            ConvertError::Extraction { raw, .. } | ConvertError::Parse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// How to wait for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptions {
    /// Fixed delay between status checks
    pub interval: Duration,
    /// Stop waiting after this long; `None` waits forever
    pub deadline: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        crate::config::get().converter.poll_options()
    }
}

/// Everything a conversion needs besides the input and the API
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub assistant_id: String,
    pub output_path: PathBuf,
    pub poll: PollOptions,
    pub extraction: ExtractionMode,
    pub step_index_policy: StepIndexPolicy,
    /// Extra run-level instructions passed to the assistant
    pub instructions: Option<String>,
}

impl ConvertOptions {
    /// Options from the global configuration, for the given assistant
    pub fn new(assistant_id: impl Into<String>) -> Self {
        let cfg = &crate::config::get().converter;
        Self {
            assistant_id: assistant_id.into(),
            output_path: cfg.output_path.clone(),
            poll: cfg.poll_options(),
            extraction: cfg.extraction,
            step_index_policy: cfg.step_index_policy,
            instructions: None,
        }
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn poll(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }

    pub fn extraction(mut self, mode: ExtractionMode) -> Self {
        self.extraction = mode;
        self
    }

    pub fn step_index_policy(mut self, policy: StepIndexPolicy) -> Self {
        self.step_index_policy = policy;
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

/// A successful conversion
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutcome {
    pub thread_id: String,
    pub run_id: String,
    /// Where the validated steps were written
    pub output_path: PathBuf,
    pub step_count: usize,
    /// Steps per action name
    pub actions: BTreeMap<String, usize>,
    /// Contains warnings only
    pub report: ValidationReport,
    pub completed_at: DateTime<Utc>,
}
