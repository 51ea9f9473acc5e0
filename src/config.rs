//! Configuration management with environment variable support.
//!
//! Every value the converter needs comes from the environment, falling back
//! to the defaults below. CLI flags override these (see `main.rs`).
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `OPENAI_API_KEY` | Service credential | none |
//! | `OPENAI_BASE_URL` | Assistants API base URL | `https://api.openai.com/v1` |
//! | `OPENAI_ASSISTANT_ID` | Assistant that performs the conversion | none |
//! | `VIRTUOSO_REQUEST_TIMEOUT` | Per-request timeout in seconds | `60` |
//! | `VIRTUOSO_POLL_INTERVAL_MS` | Delay between run status checks (ms) | `2000` |
//! | `VIRTUOSO_POLL_TIMEOUT` | Give up on a run after this many seconds (0 = never) | `600` |
//! | `VIRTUOSO_OUTPUT` | Where converted steps are written | `virtuoso_steps.json` |
//! | `VIRTUOSO_EXTRACTION` | `fenced` or `brackets` | `fenced` |
//! | `VIRTUOSO_STRICT_STEP_INDEX` | Treat stepIndex mismatch as an error | `false` |
//! | `VIRTUOSO_MODEL` | Model used by `create-assistant` | `gpt-4-turbo-preview` |
//!
//! # Example
//!
//! ```bash
//! export OPENAI_API_KEY="sk-..."
//! export OPENAI_ASSISTANT_ID="asst_..."
//! export VIRTUOSO_POLL_TIMEOUT=300
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use crate::convert::{ExtractionMode, PollOptions};
use crate::steps::StepIndexPolicy;

// ============================================================================
// Default Values
// ============================================================================

/// Default Assistants API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default per-request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 60;

/// Default model for newly created assistants
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

/// Default delay between run status checks (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Default poll deadline (seconds)
pub const DEFAULT_POLL_TIMEOUT: u64 = 600;

/// Default output file
pub const DEFAULT_OUTPUT_PATH: &str = "virtuoso_steps.json";

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_ASSISTANT_ID: &str = "OPENAI_ASSISTANT_ID";
pub const ENV_REQUEST_TIMEOUT: &str = "VIRTUOSO_REQUEST_TIMEOUT";
pub const ENV_POLL_INTERVAL_MS: &str = "VIRTUOSO_POLL_INTERVAL_MS";
pub const ENV_POLL_TIMEOUT: &str = "VIRTUOSO_POLL_TIMEOUT";
pub const ENV_OUTPUT: &str = "VIRTUOSO_OUTPUT";
pub const ENV_EXTRACTION: &str = "VIRTUOSO_EXTRACTION";
pub const ENV_STRICT_STEP_INDEX: &str = "VIRTUOSO_STRICT_STEP_INDEX";
pub const ENV_MODEL: &str = "VIRTUOSO_MODEL";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote service settings
    pub api: ApiSettings,
    /// Conversion run settings
    pub converter: ConverterSettings,
}

/// Assistants API settings
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Bearer credential; remote commands refuse to run without it
    pub api_key: Option<String>,
    /// API base URL, without trailing slash
    pub base_url: String,
    /// Per-request timeout (seconds)
    pub request_timeout: u64,
    /// Model for `create-assistant`
    pub model: String,
}

/// Conversion settings
#[derive(Debug, Clone)]
pub struct ConverterSettings {
    /// Target assistant
    pub assistant_id: Option<String>,
    /// Delay between status checks (milliseconds)
    pub poll_interval_ms: u64,
    /// Poll deadline in seconds, 0 for none
    pub poll_timeout: u64,
    /// Output file for validated steps
    pub output_path: PathBuf,
    /// How the payload is located in the reply
    pub extraction: ExtractionMode,
    /// How stepIndex mismatches are treated
    pub step_index_policy: StepIndexPolicy,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            api: ApiSettings::from_env(),
            converter: ConverterSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            api: ApiSettings::defaults(),
            converter: ConverterSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ApiSettings {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var(ENV_API_KEY).ok().filter(|k| !k.trim().is_empty()),
            base_url: env::var(ENV_BASE_URL)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            request_timeout: parse_env(ENV_REQUEST_TIMEOUT).unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            model: env::var(ENV_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl ConverterSettings {
    pub fn from_env() -> Self {
        Self {
            assistant_id: env::var(ENV_ASSISTANT_ID).ok().filter(|id| !id.trim().is_empty()),
            poll_interval_ms: parse_env(ENV_POLL_INTERVAL_MS).unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            poll_timeout: parse_env(ENV_POLL_TIMEOUT).unwrap_or(DEFAULT_POLL_TIMEOUT),
            output_path: env::var(ENV_OUTPUT)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_PATH)),
            extraction: env::var(ENV_EXTRACTION)
                .ok()
                .and_then(|s| ExtractionMode::from_name(&s))
                .unwrap_or_default(),
            step_index_policy: if env::var(ENV_STRICT_STEP_INDEX)
                .map(|s| parse_flag(&s))
                .unwrap_or(false)
            {
                StepIndexPolicy::Strict
            } else {
                StepIndexPolicy::Warn
            },
        }
    }

    pub fn defaults() -> Self {
        Self {
            assistant_id: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            extraction: ExtractionMode::default(),
            step_index_policy: StepIndexPolicy::default(),
        }
    }

    /// Poll behaviour described by these settings
    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(self.poll_interval_ms),
            deadline: (self.poll_timeout > 0).then(|| Duration::from_secs(self.poll_timeout)),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// Parse a boolean-ish flag value ("1", "true", "yes", "on")
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" YES "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.model, DEFAULT_MODEL);
        assert!(config.api.api_key.is_none());
        assert_eq!(config.converter.output_path, PathBuf::from(DEFAULT_OUTPUT_PATH));
        assert_eq!(config.converter.extraction, ExtractionMode::Fenced);
        assert_eq!(config.converter.step_index_policy, StepIndexPolicy::Warn);
    }

    #[test]
    fn test_poll_options() {
        let mut settings = ConverterSettings::defaults();
        let options = settings.poll_options();
        assert_eq!(options.interval, Duration::from_millis(2000));
        assert_eq!(options.deadline, Some(Duration::from_secs(600)));

        settings.poll_timeout = 0;
        assert_eq!(settings.poll_options().deadline, None);
    }
}
