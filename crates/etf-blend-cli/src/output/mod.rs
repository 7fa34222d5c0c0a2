pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Flatten nested objects into dotted keys, keeping field order.
///
/// `{"optimalWeights": {"vti": 0.75}}` becomes `[("optimalWeights.vti", 0.75)]`.
/// Arrays are kept as single values.
pub fn flatten(map: &Map<String, Value>) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into("", map, &mut out);
    out
}

fn flatten_into(prefix: &str, map: &Map<String, Value>, out: &mut Vec<(String, Value)>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match val {
            Value::Object(inner) => flatten_into(&name, inner, out),
            other => out.push((name, other.clone())),
        }
    }
}

/// One-line rendering of a structured warning: `kind: field=value, ...`.
pub fn describe_warning(warning: &Value) -> String {
    match warning {
        Value::Object(map) => {
            let kind = map.get("kind").and_then(Value::as_str).unwrap_or("warning");
            let details: Vec<String> = map
                .iter()
                .filter(|(k, _)| k.as_str() != "kind")
                .map(|(k, v)| format!("{}={}", k, scalar(v)))
                .collect();
            format!("{}: {}", kind, details.join(", "))
        }
        other => scalar(other),
    }
}

/// Render a JSON value as plain text.
pub fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(scalar).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
