/// Utility functions and helpers
use serde_json::Value;
use std::time::Duration;

/// Format duration for human-readable output
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Format byte size for human-readable output
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Loose integer coercion for stats values.
///
/// Counters arrive as integers, floats or strings such as "15000ms"
/// depending on the server version. Strings contribute their leading
/// integer; anything else counts as zero.
pub fn coerce_int(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => leading_int(s),
        Some(Value::Bool(b)) => i64::from(*b),
        _ => 0,
    }
}

fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let digits_start = usize::from(s.starts_with('-') || s.starts_with('+'));
    let digits_end = s[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(s.len(), |i| i + digits_start);

    btoi::btoi(s[..digits_end].as_bytes()).unwrap_or(0)
}

/// String form of a scalar value; empty for null and containers
pub fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h1m1s");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
    }

    #[test]
    fn test_coerce_int() {
        assert_eq!(coerce_int(Some(&json!(15000))), 15000);
        assert_eq!(coerce_int(Some(&json!(2.9))), 2);
        assert_eq!(coerce_int(Some(&json!(" 42 "))), 42);
        assert_eq!(coerce_int(Some(&json!("1.5"))), 1);
        assert_eq!(coerce_int(Some(&json!("15000ms"))), 15000);
        assert_eq!(coerce_int(Some(&json!("-3"))), -3);
        assert_eq!(coerce_int(Some(&json!(true))), 1);
        assert_eq!(coerce_int(Some(&json!("n/a"))), 0);
        assert_eq!(coerce_int(Some(&json!([1]))), 0);
        assert_eq!(coerce_int(None), 0);
    }

    #[test]
    fn test_coerce_string() {
        assert_eq!(coerce_string(Some(&json!("1.2 MB"))), "1.2 MB");
        assert_eq!(coerce_string(Some(&json!(2048))), "2048");
        assert_eq!(coerce_string(Some(&Value::Null)), "");
        assert_eq!(coerce_string(None), "");
    }
}
