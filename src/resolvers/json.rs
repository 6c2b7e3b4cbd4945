//! Flat JSON documents to items.

use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// Decode a flat JSON object into string items.
///
/// Strings pass through, numbers use their shortest decimal form and
/// booleans become `"1"`/`"0"`. Fields of any other type are skipped.
/// A body that is not a JSON object is an error.
pub fn decode_flat_json(body: &str) -> Result<BTreeMap<String, String>, String> {
    let value: Value = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let Value::Object(fields) = value else {
        return Err(format!("expected a JSON object, found {}", kind_of(&value)));
    };

    let mut items = BTreeMap::new();
    for (key, value) in fields {
        let rendered = match value {
            Value::String(s) => s,
            Value::Number(n) => render_number(&n),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => "0".to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => continue,
        };
        items.insert(key, rendered);
    }
    Ok(items)
}

fn render_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    // f64's Display is the shortest round-trip form and never uses an exponent.
    n.as_f64().map(|f| f.to_string()).unwrap_or_else(|| n.to_string())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
