//! Display formatting for CLI output

use console::style;
use serde_json::Value;

/// Human-readable rendering of one build/push JSON log line
pub fn progress_line(line: &str) -> Option<String> {
    let value: Value = serde_json::from_str(line).ok()?;

    if let Some(text) = value.get("stream").and_then(Value::as_str) {
        let text = text.trim_end();
        return (!text.is_empty()).then(|| text.to_string());
    }
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Some(style(error).red().to_string());
    }
    if let Some(status) = value.get("status").and_then(Value::as_str) {
        let rendered = match value.get("id").and_then(Value::as_str) {
            Some(id) => format!("{}: {}", style(id).dim(), status),
            None => status.to_string(),
        };
        return Some(rendered);
    }
    None
}

/// Print a whole build/push log
pub fn print_progress(log: &str) {
    for line in log.lines().filter_map(progress_line) {
        println!("{}", line);
    }
}

/// Phase colored the way a reader expects
pub fn styled_phase(phase: &str) -> String {
    match phase {
        "Running" | "Succeeded" => style(phase).green().to_string(),
        "Failed" => style(phase).red().to_string(),
        "Pending" => style(phase).yellow().to_string(),
        _ => style(phase).dim().to_string(),
    }
}
