//! Typed views of converted Virtuoso steps.
//!
//! The validator works on raw JSON so it can reject arbitrary shapes. These
//! types are for reading output that already passed validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Top-level keys every step must carry
pub const STEP_FIELDS: [&str; 3] = ["checkpointId", "stepIndex", "parsedStep"];

/// Keys every `parsedStep` must carry
pub const PARSED_STEP_FIELDS: [&str; 3] = ["action", "target", "meta"];

/// Keys an `element` must carry
pub const ELEMENT_FIELDS: [&str; 2] = ["id", "target"];

/// One element of the conversion output array
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Opaque checkpoint identifier
    pub checkpoint_id: serde_json::Value,

    /// Expected to equal the position in the array
    pub step_index: serde_json::Value,

    /// The structured action record
    pub parsed_step: ParsedStep,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedStep {
    pub action: Action,
    pub target: serde_json::Value,
    pub meta: serde_json::Value,

    /// Present for actions that interact with a UI element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<Element>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub id: serde_json::Value,
    pub target: ElementTarget,
}

/// How to locate an element. Only `selectors` is interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementTarget {
    pub selectors: serde_json::Value,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Step action kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Click,
    Write,
    AssertExists,
    AssertEquals,
    /// Any action without extra structural requirements (NAVIGATE, WAIT, ...)
    Other(String),
}

impl Action {
    pub fn parse(name: &str) -> Self {
        match name {
            "CLICK" => Action::Click,
            "WRITE" => Action::Write,
            "ASSERT_EXISTS" => Action::AssertExists,
            "ASSERT_EQUALS" => Action::AssertEquals,
            other => Action::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Action::Click => "CLICK",
            Action::Write => "WRITE",
            Action::AssertExists => "ASSERT_EXISTS",
            Action::AssertEquals => "ASSERT_EQUALS",
            Action::Other(name) => name,
        }
    }

    /// Whether a step with this action must carry an `element` with selectors
    pub fn requires_element(&self) -> bool {
        !matches!(self, Action::Other(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Action {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Non-string actions are kept so a typed read never rejects a payload
        // the validator accepted
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(name) => Ok(Action::parse(&name)),
            other => Ok(Action::Other(other.to_string())),
        }
    }
}

/// Count of steps per action, in action-name order
pub fn action_counts(steps: &[Step]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for step in steps {
        *counts
            .entry(step.parsed_step.action.as_str().to_string())
            .or_insert(0) += 1;
    }
    counts
}
