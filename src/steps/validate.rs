//! Structural validation of converted steps.
//!
//! Checks run on raw JSON, in this order for every step:
//!
//! 1. `checkpointId`, `stepIndex` and `parsedStep` are present
//! 2. `stepIndex` equals the step's position (warning unless strict)
//! 3. `parsedStep` carries `action`, `target` and `meta`
//! 4. for CLICK, WRITE, ASSERT_EXISTS and ASSERT_EQUALS: `element` is present,
//!    carries `id` and `target`, and `element.target` carries `selectors`
//!
//! Presence means the key exists; a `null` value counts as present. A value
//! that should be an object but isn't is missing every field it should carry.
//!
//! Every issue in every step is collected. The verdict is the same as a
//! validator that stops at the first error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::types::{Action, ELEMENT_FIELDS, PARSED_STEP_FIELDS, STEP_FIELDS};

/// How a `stepIndex` that differs from the step's position is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepIndexPolicy {
    /// Report a warning, keep the verdict
    #[default]
    Warn,
    /// Report an error
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// What is wrong with a step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    /// The payload is not a JSON array
    NotAList { found: String },
    MissingStepFields { fields: Vec<String> },
    MissingParsedStepFields { fields: Vec<String> },
    /// A UI action without an `element`
    MissingElement { action: String },
    MissingElementFields { fields: Vec<String> },
    MissingSelectors,
    StepIndexMismatch { found: Value },
}

/// A single finding, tied to a step position when there is one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub step: Option<usize>,
    pub severity: Severity,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let i = self.step.unwrap_or_default();
        match &self.kind {
            IssueKind::NotAList { found } => write!(f, "Steps is not a list (found {})", found),
            IssueKind::MissingStepFields { fields } => {
                write!(f, "Step {} is missing required fields: {}", i, fields.join(", "))
            }
            IssueKind::MissingParsedStepFields { fields } => write!(
                f,
                "Step {} parsedStep is missing required fields: {}",
                i,
                fields.join(", ")
            ),
            IssueKind::MissingElement { action } => {
                write!(f, "Step {} with action {} is missing 'element' field", i, action)
            }
            IssueKind::MissingElementFields { fields } => write!(
                f,
                "Step {} element is missing required fields: {}",
                i,
                fields.join(", ")
            ),
            IssueKind::MissingSelectors => {
                write!(f, "Step {} element target is missing selectors", i)
            }
            IssueKind::StepIndexMismatch { found } => {
                write!(f, "Step {} has stepIndex {}", i, found)
            }
        }
    }
}

/// All findings for one payload
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Number of steps inspected (0 when the payload is not a list)
    pub step_count: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// True when no error was found. Warnings don't count.
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// The error a fail-fast validator would have stopped at
    pub fn first_error(&self) -> Option<&ValidationIssue> {
        self.errors().next()
    }

    /// Emit every issue as a log line, then the overall outcome
    pub fn log(&self) {
        for issue in &self.issues {
            match issue.severity {
                Severity::Error => tracing::error!("{}", issue),
                Severity::Warning => tracing::warn!("{}", issue),
            }
        }
        if self.is_valid() {
            tracing::info!(steps = self.step_count, "All steps validated successfully");
        } else {
            tracing::error!(
                errors = self.errors().count(),
                steps = self.step_count,
                "Step validation failed"
            );
        }
    }

    fn push(&mut self, step: Option<usize>, severity: Severity, kind: IssueKind) {
        self.issues.push(ValidationIssue { step, severity, kind });
    }
}

/// Validate a payload and log the findings. Returns the verdict.
pub fn validate(steps: &Value) -> bool {
    let report = validate_report(steps, StepIndexPolicy::Warn);
    report.log();
    report.is_valid()
}

/// Validate a payload without logging, collecting every issue
pub fn validate_report(steps: &Value, policy: StepIndexPolicy) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(items) = steps.as_array() else {
        report.push(
            None,
            Severity::Error,
            IssueKind::NotAList { found: json_type(steps).to_string() },
        );
        return report;
    };

    report.step_count = items.len();
    for (i, step) in items.iter().enumerate() {
        check_step(&mut report, i, step, policy);
    }
    report
}

fn check_step(report: &mut ValidationReport, i: usize, step: &Value, policy: StepIndexPolicy) {
    let missing = missing_fields(step, &STEP_FIELDS);
    if !missing.is_empty() {
        report.push(Some(i), Severity::Error, IssueKind::MissingStepFields { fields: missing });
    }

    if let Some(index) = step.get("stepIndex") {
        if !index_matches(index, i) {
            let severity = match policy {
                StepIndexPolicy::Warn => Severity::Warning,
                StepIndexPolicy::Strict => Severity::Error,
            };
            report.push(
                Some(i),
                severity,
                IssueKind::StepIndexMismatch { found: index.clone() },
            );
        }
    }

    let Some(parsed) = step.get("parsedStep") else {
        return;
    };

    let missing = missing_fields(parsed, &PARSED_STEP_FIELDS);
    if !missing.is_empty() {
        report.push(
            Some(i),
            Severity::Error,
            IssueKind::MissingParsedStepFields { fields: missing },
        );
    }

    let Some(action) = parsed.get("action").and_then(Value::as_str).map(Action::parse) else {
        return;
    };
    if !action.requires_element() {
        return;
    }

    let Some(element) = parsed.get("element") else {
        report.push(
            Some(i),
            Severity::Error,
            IssueKind::MissingElement { action: action.to_string() },
        );
        return;
    };

    let missing = missing_fields(element, &ELEMENT_FIELDS);
    if !missing.is_empty() {
        report.push(
            Some(i),
            Severity::Error,
            IssueKind::MissingElementFields { fields: missing },
        );
    }

    if let Some(target) = element.get("target") {
        if !missing_fields(target, &["selectors"]).is_empty() {
            report.push(Some(i), Severity::Error, IssueKind::MissingSelectors);
        }
    }
}

fn missing_fields(value: &Value, fields: &[&str]) -> Vec<String> {
    match value.as_object() {
        Some(map) => fields
            .iter()
            .filter(|f| !map.contains_key(**f))
            .map(|f| f.to_string())
            .collect(),
        None => fields.iter().map(|f| f.to_string()).collect(),
    }
}

fn index_matches(index: &Value, position: usize) -> bool {
    match index {
        Value::Number(n) => match n.as_u64() {
            Some(v) => v == position as u64,
            None => n.as_f64() == Some(position as f64),
        },
        _ => false,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
