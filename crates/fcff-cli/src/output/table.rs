use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Decimal places shown for numeric cells.
const DISPLAY_DP: usize = 4;

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(arr) => print_row_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => {
            // Nested tables (forecast / roic / summary) get their own section
            let (scalars, nested): (Vec<_>, Vec<_>) = res_map
                .iter()
                .partition(|(_, v)| !v.is_object() && !is_row_array(v));
            print_pairs(scalars.into_iter());
            for (key, val) in nested {
                println!("\n{}:", key);
                match val {
                    Value::Array(rows) => print_row_table(rows),
                    Value::Object(inner) => print_flat_object(inner),
                    _ => {}
                }
            }
        }
        Value::Array(rows) => print_row_table(rows),
        other => println!("{}", format_value(other)),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(map: &Map<String, Value>) {
    print_pairs(map.iter());
}

fn print_pairs<'a>(pairs: impl Iterator<Item = (&'a String, &'a Value)>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in pairs {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

/// Period rows (forecast, ROIC) as one table with the label column first.
fn print_row_table(arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            println!("{}", format_value(item));
        }
        return;
    };

    let headers = row_headers(first);
    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(String::as_str));
    for map in arr.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
            .collect();
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}

/// Column order for period rows: `label` first, the structured `period` key
/// dropped when a label is present.
pub fn row_headers(first: &Map<String, Value>) -> Vec<String> {
    let has_label = first.contains_key("label");
    let mut headers: Vec<String> = Vec::with_capacity(first.len());
    if has_label {
        headers.push("label".into());
    }
    headers.extend(
        first
            .keys()
            .filter(|k| !(has_label && (*k == "label" || *k == "period")))
            .cloned(),
    );
    headers
}

fn is_row_array(value: &Value) -> bool {
    matches!(value, Value::Array(arr) if arr.first().is_some_and(Value::is_object))
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => round_numeric(s),
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .map(|f| format!("{:.*}", DISPLAY_DP, f))
            .unwrap_or_else(|| n.to_string()),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Decimals serialize as strings; shorten long ones for display.
fn round_numeric(s: &str) -> String {
    match s.parse::<rust_decimal::Decimal>() {
        Ok(d) if d.scale() as usize > DISPLAY_DP => d.round_dp(DISPLAY_DP as u32).to_string(),
        _ => s.to_string(),
    }
}
