//! Virtuoso Convert - Selenium test scripts to Virtuoso test steps.
//!
//! This crate provides:
//! - A thin async client for the hosted Assistants API (threads, messages, runs)
//! - A conversion driver that submits a script, waits for the run with a
//!   deadline and cancellation, and extracts the JSON steps from the reply
//! - A structural validator for converted steps that reports every issue
//!
//! # Example
//!
//! ```rust,no_run
//! use virtuoso_convert::assistants::AssistantsClient;
//! use virtuoso_convert::convert::{CancelToken, ConvertOptions, Converter};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AssistantsClient::new("sk-...")?;
//! let converter = Converter::new(client, ConvertOptions::new("asst_...").output_path("steps.json"));
//! let outcome = converter
//!     .convert_file("Test_Rocketshop.py".as_ref(), &CancelToken::new())
//!     .await?;
//! println!("{} steps written", outcome.step_count);
//! # Ok(())
//! # }
//! ```

pub mod assistants;
pub mod config;
pub mod convert;
pub mod steps;

// Re-export the API client
pub use assistants::{ApiError, ApiResult, AssistantsApi, AssistantsClient};

// Re-export conversion types
pub use convert::{
    CancelToken, ConversionOutcome, ConvertError, ConvertOptions, ConvertResult, Converter,
    ExtractionMode, PollOptions,
};

// Re-export validation
pub use steps::{StepIndexPolicy, ValidationReport, validate, validate_report};
