//! Structural validation of converted steps

use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use virtuoso_convert::steps::{IssueKind, StepIndexPolicy, validate, validate_report};

fn navigate(index: usize) -> Value {
    json!({
        "checkpointId": "c1",
        "stepIndex": index,
        "parsedStep": {"action": "NAVIGATE", "target": "https://rocketshop.example", "meta": {}}
    })
}

fn ui_step(index: usize, action: &str) -> Value {
    json!({
        "checkpointId": "c1",
        "stepIndex": index,
        "parsedStep": {
            "action": action,
            "target": "field",
            "meta": {"value": "hello"},
            "element": {
                "id": format!("e{}", index),
                "target": {"selectors": [{"type": "XPATH", "value": "//input[@id='q']"}]}
            }
        }
    })
}

#[test]
fn test_navigate_example_is_valid() {
    let steps = json!([{"checkpointId":"c1","stepIndex":0,"parsedStep":{"action":"NAVIGATE","target":"url","meta":{}}}]);
    assert!(validate(&steps));
}

#[test]
fn test_click_without_selectors_is_invalid() {
    let steps = json!([{"checkpointId":"c1","stepIndex":0,"parsedStep":{"action":"CLICK","target":"btn","meta":{},"element":{"id":"e1","target":{}}}}]);
    assert!(!validate(&steps));
}

#[test]
fn test_missing_step_index_is_invalid() {
    let steps = json!([{"checkpointId":"c1","parsedStep":{"action":"CLICK","target":"x","meta":{}}}]);
    assert!(!validate(&steps));
}

#[test]
fn test_full_conforming_sequence_is_valid() {
    let steps = json!([
        navigate(0),
        ui_step(1, "CLICK"),
        ui_step(2, "WRITE"),
        ui_step(3, "ASSERT_EXISTS"),
        ui_step(4, "ASSERT_EQUALS"),
    ]);
    let report = validate_report(&steps, StepIndexPolicy::Strict);
    assert!(report.is_valid());
    assert!(report.issues.is_empty());
    assert_eq!(report.step_count, 5);
}

#[test]
fn test_empty_list_is_valid() {
    assert!(validate(&json!([])));
}

#[test]
fn test_each_missing_top_level_field_is_invalid() {
    for field in ["checkpointId", "stepIndex", "parsedStep"] {
        let mut step = navigate(0);
        step.as_object_mut().unwrap().remove(field);
        assert!(!validate(&json!([navigate(0), step])), "missing {} accepted", field);
    }
}

#[test]
fn test_each_missing_parsed_step_field_is_invalid() {
    for field in ["action", "target", "meta"] {
        let mut step = navigate(0);
        step["parsedStep"].as_object_mut().unwrap().remove(field);
        assert!(!validate(&json!([step])), "missing parsedStep.{} accepted", field);
    }
}

#[test]
fn test_ui_actions_require_element() {
    for action in ["CLICK", "WRITE", "ASSERT_EXISTS", "ASSERT_EQUALS"] {
        let mut step = ui_step(0, action);
        step["parsedStep"].as_object_mut().unwrap().remove("element");
        let report = validate_report(&json!([step]), StepIndexPolicy::Warn);
        assert_eq!(
            report.first_error().map(|e| e.kind.clone()),
            Some(IssueKind::MissingElement { action: action.to_string() })
        );
    }
}

#[test]
fn test_element_requires_id_and_target() {
    for field in ["id", "target"] {
        let mut step = ui_step(0, "WRITE");
        step["parsedStep"]["element"].as_object_mut().unwrap().remove(field);
        assert!(!validate(&json!([step])), "missing element.{} accepted", field);
    }
}

#[test]
fn test_other_actions_do_not_need_element() {
    for action in ["NAVIGATE", "WAIT", "SCROLL", "EXECUTE", "click"] {
        let mut step = navigate(0);
        step["parsedStep"]["action"] = json!(action);
        assert!(validate(&json!([step])), "{} required an element", action);
    }
}

#[test]
fn test_step_index_gap_only_warns() {
    let steps = json!([navigate(0), ui_step(5, "CLICK"), navigate(2)]);
    let report = validate_report(&steps, StepIndexPolicy::Warn);
    assert!(report.is_valid());
    assert!(validate(&steps));

    let warnings: Vec<_> = report.warnings().map(|w| (w.step, w.kind.clone())).collect();
    assert_eq!(
        warnings,
        vec![(Some(1), IssueKind::StepIndexMismatch { found: json!(5) })]
    );
}

#[test]
fn test_non_sequence_input_is_rejected() {
    for input in [
        json!({"checkpointId": "c1", "stepIndex": 0}),
        json!("[]"),
        json!(42),
        json!(null),
        json!(true),
    ] {
        assert!(!validate(&input), "{} accepted", input);
    }
}

#[test]
fn test_validation_does_not_mutate_input() {
    let steps = json!([ui_step(3, "CLICK"), {"checkpointId": "c1"}]);
    let before = steps.clone();
    let _ = validate_report(&steps, StepIndexPolicy::Strict);
    assert_eq!(steps, before);
}

#[test]
fn test_report_verdict_matches_first_failure() {
    // A later error must not be hidden by an earlier one
    let mut bad_click = ui_step(2, "CLICK");
    bad_click["parsedStep"]["element"]["target"] = json!({});
    let steps = json!([{"checkpointId": "c1", "stepIndex": 0}, navigate(1), bad_click]);

    let report = validate_report(&steps, StepIndexPolicy::Warn);
    let steps_with_errors: Vec<_> = report.errors().map(|e| e.step).collect();
    assert_eq!(steps_with_errors, vec![Some(0), Some(2)]);
    assert_eq!(report.first_error().unwrap().step, Some(0));
}
