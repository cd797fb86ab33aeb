//! Interpretation of raw prediction model output.

use serde_json::Value;

static NULL: Value = Value::Null;

/// Extract the predicted instance type from whatever the model returned.
///
/// A list yields its first element; an object yields
/// `predicted_instance_type`, then `prediction`, then its first value;
/// anything else is used as-is. Strings come back unquoted.
pub fn predicted_type(output: &Value) -> String {
    let picked = match output {
        Value::Array(items) => items.first().unwrap_or(&NULL),
        Value::Object(map) => map
            .get("predicted_instance_type")
            .filter(|v| truthy(v))
            .or_else(|| map.get("prediction").filter(|v| truthy(v)))
            .or_else(|| map.values().next())
            .unwrap_or(&NULL),
        other => other,
    };
    match picked {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
    }
}
