use serde::Serialize;

/// Emit a record as a single JSON line to stdout.
pub fn report_event<T: Serialize>(event: &T) {
    if let Ok(json) = serde_json::to_string(event) {
        println!("{json}");
    }
}

/// Emit a summary as pretty-printed JSON to stdout.
pub fn report_summary<T: Serialize>(summary: &T) {
    if let Ok(json) = serde_json::to_string_pretty(summary) {
        println!("{json}");
    }
}
