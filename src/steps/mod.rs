pub mod types;
pub mod validate;

pub use types::{Action, Element, ElementTarget, ParsedStep, Step, action_counts};
pub use validate::{
    IssueKind, Severity, StepIndexPolicy, ValidationIssue, ValidationReport, validate,
    validate_report,
};
