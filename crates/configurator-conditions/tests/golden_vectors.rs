//! Runs the shared golden vector suite against the evaluator.
//!
//! The same file drives the form client's evaluator; a failure here means the
//! two sides disagree on what a field's visibility should be.

use configurator_conditions::{golden_vectors, golden_vectors_json, ConditionEvaluator};
use serde_json::Value;

#[test]
fn test_every_vector_passes() {
    let evaluator = ConditionEvaluator::new();
    let mut failures = Vec::new();

    for vector in golden_vectors().expect("vector file parses") {
        let outcome = evaluator.evaluate_json(&vector.condition, &vector.context);
        if !vector.expected.is_met_by(&outcome) {
            failures.push(format!(
                "{}: expected {:?}, got {:?}",
                vector.name, vector.expected, outcome
            ));
        }
    }

    assert!(failures.is_empty(), "failing vectors:\n{}", failures.join("\n"));
}

#[test]
fn test_vectors_are_deterministic() {
    let evaluator = ConditionEvaluator::new();

    for vector in golden_vectors().unwrap() {
        let first = evaluator.evaluate_json(&vector.condition, &vector.context);
        for _ in 0..2 {
            assert_eq!(
                evaluator.evaluate_json(&vector.condition, &vector.context),
                first,
                "{}",
                vector.name
            );
        }
    }
}

#[test]
fn test_vector_names_are_unique() {
    let vectors = golden_vectors().unwrap();
    let mut names: Vec<&str> = vectors.iter().map(|v| v.name.as_str()).collect();
    names.sort_unstable();
    let before = names.len();
    names.dedup();
    assert_eq!(names.len(), before);
}

#[test]
fn test_vector_suite_is_exportable() {
    let raw: Value = serde_json::from_str(golden_vectors_json()).unwrap();
    let entries = raw.as_array().unwrap();
    assert_eq!(entries.len(), golden_vectors().unwrap().len());
    for entry in entries {
        for key in ["name", "condition", "context", "expected"] {
            assert!(entry.get(key).is_some(), "missing {key} in {entry}");
        }
    }
}

#[test]
fn test_every_operator_is_covered() {
    let raw = golden_vectors_json();
    for op in configurator_conditions::Operator::all() {
        assert!(
            raw.contains(&format!("\"operator\": \"{}\"", op.as_str())),
            "no vector for {op}"
        );
    }
    for op in ["and", "or", "not"] {
        assert!(raw.contains(&format!("\"operator\": \"{op}\"")));
    }
}
