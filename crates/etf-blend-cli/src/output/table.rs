use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{describe_warning, flatten, scalar};

/// Format output as tables using the tabled crate.
///
/// The result is split into a weights table (baseline, weight, percent) and a
/// field/value table for everything else.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => print_result(result, map),
            _ => print_fields(map),
        },
        _ => println!("{}", value),
    }
}

fn print_result(result: &Map<String, Value>, envelope: &Map<String, Value>) {
    let weights = result.get("optimalWeights").and_then(Value::as_object);
    let percentages = result.get("weightsPercentages").and_then(Value::as_object);

    if let Some(weights) = weights {
        let mut builder = Builder::default();
        builder.push_record(["Baseline", "Weight", "Percent"]);
        for (symbol, w) in weights {
            let pct = percentages
                .and_then(|p| p.get(symbol))
                .map(scalar)
                .unwrap_or_default();
            builder.push_record([symbol.to_uppercase(), scalar(w), pct]);
        }
        println!("{}", Table::from(builder));
    }

    let rest: Map<String, Value> = result
        .iter()
        .filter(|(k, _)| k.as_str() != "optimalWeights" && k.as_str() != "weightsPercentages")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    print_fields(&rest);

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                println!("  - {}", describe_warning(w));
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in flatten(map) {
        builder.push_record([key, scalar(&val)]);
    }
    println!("{}", Table::from(builder));
}
