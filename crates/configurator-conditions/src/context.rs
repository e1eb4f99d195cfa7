//! Field lookup in an evaluation context.

use serde_json::Value;

/// Resolve a field in the context.
///
/// An exact top-level key wins; otherwise the path is split on `.` and
/// walked through nested objects. A missing key at any level, or a non-object
/// on the way, resolves to `None`.
///
/// ```
/// use configurator_conditions::resolve_field;
/// use serde_json::json;
///
/// let ctx = json!({"frame": {"material": "pvc"}, "glass.type": "double"});
/// assert_eq!(resolve_field(&ctx, "frame.material"), Some(&json!("pvc")));
/// assert_eq!(resolve_field(&ctx, "glass.type"), Some(&json!("double")));
/// assert_eq!(resolve_field(&ctx, "frame.color.code"), None);
/// ```
pub fn resolve_field<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let Value::Object(root) = context else {
        return None;
    };
    if let Some(value) = root.get(path) {
        return Some(value);
    }
    if !path.contains('.') {
        return None;
    }

    path.split('.')
        .try_fold(context, |current, key| match current {
            Value::Object(map) => map.get(key),
            _ => None,
        })
}
