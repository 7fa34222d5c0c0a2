use serde_json::Value;
use std::io;

use super::{describe_warning, flatten, scalar};

/// Write the result as a two-column `field,value` CSV to stdout.
///
/// Nested objects are flattened to dotted field names and each warning is
/// appended as a `warning` row.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    let _ = wtr.write_record(["field", "value"]);

    match value {
        Value::Object(map) => {
            let body = match map.get("result") {
                Some(Value::Object(result)) => result,
                _ => map,
            };
            for (key, val) in flatten(body) {
                let _ = wtr.write_record([key, scalar(&val)]);
            }
            if let Some(Value::Array(warnings)) = map.get("warnings") {
                for w in warnings {
                    let _ = wtr.write_record(["warning".to_string(), describe_warning(w)]);
                }
            }
        }
        other => {
            let _ = wtr.write_record(["value".to_string(), scalar(other)]);
        }
    }

    let _ = wtr.flush();
}
