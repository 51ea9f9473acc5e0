//! Drives one conversion from a local test script to a validated steps file.

use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::cancel::CancelToken;
use super::extract::{ExtractionMode, extract_payload};
use super::output::write_steps;
use super::poll::wait_for_run;
use super::types::{ConversionOutcome, ConvertError, ConvertOptions, ConvertResult};
use crate::assistants::{AssistantsApi, Role, RunStatus};
use crate::steps::{Step, action_counts, validate_report};

const PROMPT_PREAMBLE: &str = "Convert this Selenium test script to Virtuoso test steps following the Selenium to Virtuoso Converter format:";

/// Submits test scripts to a conversion assistant and persists the result
pub struct Converter<A> {
    api: A,
    options: ConvertOptions,
}

impl<A: AssistantsApi> Converter<A> {
    pub fn new(api: A, options: ConvertOptions) -> Self {
        Self { api, options }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert the test script at `input`
    pub async fn convert_file(
        &self,
        input: &Path,
        cancel: &CancelToken,
    ) -> ConvertResult<ConversionOutcome> {
        let source = fs::read_to_string(input)?;
        tracing::info!("Converting file: {}", input.display());

        let prompt = build_prompt(&source, fence_language(input));
        self.convert_prompt(&prompt, cancel).await
    }

    /// Send a ready-made prompt and process the reply.
    ///
    /// Output is written only after the reply parsed and validated cleanly.
    pub async fn convert_prompt(
        &self,
        prompt: &str,
        cancel: &CancelToken,
    ) -> ConvertResult<ConversionOutcome> {
        let thread = self.api.create_thread().await?;
        self.api.add_message(&thread.id, Role::User, prompt).await?;

        let run = self
            .api
            .create_run(
                &thread.id,
                &self.options.assistant_id,
                self.options.instructions.as_deref(),
            )
            .await?;

        let finished =
            match wait_for_run(&self.api, &thread.id, &run.id, &self.options.poll, cancel).await {
                Ok(finished) => finished,
                Err(e @ (ConvertError::Cancelled | ConvertError::DeadlineExceeded(_))) => {
                    self.cancel_remote(&thread.id, &run.id).await;
                    return Err(e);
                }
                Err(e) => return Err(e),
            };

        if finished.status != RunStatus::Completed {
            let reason = finished
                .last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no reason given".to_string());
            tracing::error!("Run failed with error: {}", reason);
            return Err(ConvertError::RunFailed {
                status: finished.status,
                reason,
            });
        }

        let messages = self.api.list_messages(&thread.id).await?;
        let reply = messages
            .latest_assistant()
            .ok_or(ConvertError::NoAssistantReply)?;
        tracing::info!("Received response from assistant");

        let steps = parse_reply(&reply.text(), self.options.extraction)?;

        let report = validate_report(&steps, self.options.step_index_policy);
        report.log();
        if !report.is_valid() {
            return Err(ConvertError::Validation(report));
        }

        write_steps(&self.options.output_path, &steps)?;

        let step_count = report.step_count;
        tracing::info!(
            "Conversion successful! Virtuoso steps saved to {}",
            self.options.output_path.display()
        );
        tracing::info!("Total steps converted: {}", step_count);

        Ok(ConversionOutcome {
            thread_id: thread.id,
            run_id: run.id,
            output_path: self.options.output_path.clone(),
            step_count,
            actions: summarize(&steps),
            report,
            completed_at: Utc::now(),
        })
    }

    async fn cancel_remote(&self, thread_id: &str, run_id: &str) {
        match self.api.cancel_run(thread_id, run_id).await {
            Ok(run) => tracing::info!(run_id, status = %run.status, "Requested run cancellation"),
            Err(e) => tracing::warn!(run_id, error = %e, "Could not cancel run"),
        }
    }
}

/// Extract and parse the steps array from a reply
pub fn parse_reply(text: &str, mode: ExtractionMode) -> ConvertResult<serde_json::Value> {
    let payload = extract_payload(text, mode).map_err(|source| ConvertError::Extraction {
        source,
        raw: text.to_string(),
    })?;

    serde_json::from_str(payload).map_err(|source| ConvertError::Parse {
        source,
        raw: text.to_string(),
    })
}

/// The message that asks the assistant to convert `source`
pub fn build_prompt(source: &str, language: &str) -> String {
    format!("{}\n\n```{}\n{}\n```", PROMPT_PREAMBLE, language, source)
}

/// Code fence language for a test script, from its extension
pub fn fence_language(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "py" => "python",
        "java" => "java",
        "js" | "mjs" | "cjs" => "javascript",
        "ts" => "typescript",
        "cs" => "csharp",
        "rb" => "ruby",
        "kt" => "kotlin",
        _ => "",
    }
}

fn summarize(steps: &serde_json::Value) -> BTreeMap<String, usize> {
    match Vec::<Step>::deserialize(steps) {
        Ok(typed) => action_counts(&typed),
        Err(e) => {
            tracing::debug!(error = %e, "Skipping action summary");
            BTreeMap::new()
        }
    }
}
