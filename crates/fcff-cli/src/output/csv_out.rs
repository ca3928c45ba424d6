use serde_json::Value;
use std::io;

use super::table::row_headers;

/// Write output as CSV to stdout. Values keep full precision.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Array(rows)) => write_rows(&mut wtr, rows),
            Some(Value::Object(result)) => {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in result {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
            _ => {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
        },
        Value::Array(rows) => write_rows(&mut wtr, rows),
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_rows(wtr: &mut csv::Writer<io::StdoutLock<'_>>, rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
        return;
    };

    let headers = row_headers(first);
    let _ = wtr.write_record(&headers);
    for map in rows.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| map.get(h.as_str()).map(format_csv_value).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&row);
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
