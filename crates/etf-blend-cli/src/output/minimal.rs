use serde_json::Value;

/// Print just the key answer: the baseline weights as `SYMBOL=weight` pairs.
///
/// Falls back to the universe symbols (for `universe`) and then to the whole
/// result as compact JSON.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(Value::Object(weights)) = result_obj.get("optimalWeights") {
        let pairs: Vec<String> = weights
            .iter()
            .map(|(symbol, w)| format!("{}={}", symbol.to_uppercase(), super::scalar(w)))
            .collect();
        println!("{}", pairs.join(" "));
        return;
    }

    if let Some(Value::Array(symbols)) = result_obj.get("symbols") {
        println!("{}", super::scalar(&Value::Array(symbols.clone())));
        return;
    }

    println!("{}", serde_json::to_string(result_obj).unwrap_or_default());
}
