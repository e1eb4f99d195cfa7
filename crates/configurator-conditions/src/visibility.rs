//! Bulk field visibility.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::evaluator::ConditionEvaluator;

/// Evaluate the display condition of every field in a form.
///
/// Unlike [`ConditionEvaluator::evaluate_json`], a field whose stored
/// condition fails to parse is reported visible and logged, so one bad rule
/// cannot hide the rest of the form.
///
/// ```
/// use configurator_conditions::evaluate_visibility;
/// use serde_json::json;
///
/// let fields = vec![
///     ("width", json!(null)),
///     ("glazing", json!({"operator": "equals", "field": "type", "value": "Window"})),
///     ("broken", json!({"operator": "between", "field": "width"})),
/// ];
/// let visible = evaluate_visibility(fields, &json!({"type": "Door"}));
///
/// assert_eq!(visible["width"], true);
/// assert_eq!(visible["glazing"], false);
/// assert_eq!(visible["broken"], true);
/// ```
pub fn evaluate_visibility<I, K>(fields: I, context: &Value) -> BTreeMap<String, bool>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    let evaluator = ConditionEvaluator::new();

    fields
        .into_iter()
        .map(|(name, condition)| {
            let name = name.into();
            let visible = match evaluator.evaluate_json(&condition, context) {
                Ok(visible) => visible,
                Err(e) => {
                    tracing::warn!(field = %name, error = %e, "Invalid display condition, showing field");
                    true
                }
            };
            (name, visible)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_visibility_map() {
        let fields = vec![
            ("a".to_string(), json!({"operator": "exists", "field": "x"})),
            ("b".to_string(), json!({"operator": "not_exists", "field": "x"})),
        ];
        let visible = evaluate_visibility(fields, &json!({"x": 1}));
        assert_eq!(visible.len(), 2);
        assert!(visible["a"]);
        assert!(!visible["b"]);
    }

    #[test]
    fn test_bad_rule_defaults_visible() {
        let fields = vec![("bad", json!({"operator": "nope"}))];
        let visible = evaluate_visibility(fields, &json!({}));
        assert!(visible["bad"]);
    }
}
