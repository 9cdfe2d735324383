use serde_json::Value;

/// Read a price that upstreams encode either as a JSON number or as a string,
/// possibly with thousands separators (`"1,015,000"`).
pub(crate) fn number_from_value(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("number out of range: {n}")),
        Value::String(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            if cleaned.is_empty() {
                return Err("empty price string".to_string());
            }
            cleaned
                .parse::<f64>()
                .map_err(|_| format!("could not parse number from string: {s}"))
        }
        Value::Null => Err("price is null".to_string()),
        other => Err(format!("expected number or string, got: {other}")),
    }
}

/// Truncate a price to whole rials, rejecting negatives and non-finite values.
pub(crate) fn to_rials(value: f64) -> Result<i64, String> {
    if !value.is_finite() || value < 0.0 || value > i64::MAX as f64 {
        return Err(format!("price out of range: {value}"));
    }
    Ok(value.trunc() as i64)
}
