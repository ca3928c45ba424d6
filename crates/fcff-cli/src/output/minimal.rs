use serde_json::{Map, Value};

/// Print just the key answer value from the output.
///
/// Heuristic: look for well-known result fields in order of priority,
/// then fall back to the first field in the result object.
pub fn print_minimal(value: &Value) {
    // Try to extract the "result" envelope
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    // Priority list of key output fields
    let priority_keys = [
        "fair_value_per_share",
        "mean",
        "equity_value",
        "total_firm_value",
    ];

    if let Value::Object(map) = result_obj {
        if let Some(val) = find_priority(map, &priority_keys) {
            println!("{}", format_minimal(val));
            return;
        }

        // Fall back to first field
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    // Not an object, just print directly
    println!("{}", format_minimal(result_obj));
}

/// Search the object, then its nested objects (e.g. a Monte Carlo `summary`),
/// for the first non-null priority key.
fn find_priority<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    let direct = keys
        .iter()
        .find_map(|key| map.get(*key).filter(|v| !v.is_null()));
    direct.or_else(|| {
        map.values()
            .filter_map(Value::as_object)
            .find_map(|child| keys.iter().find_map(|key| child.get(*key).filter(|v| !v.is_null())))
    })
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
