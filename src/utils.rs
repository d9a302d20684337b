//! Loose-typing helpers shared by providers and the day-file codec.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Coerce a loosely-typed JSON value into record text.
///
/// Strings pass through unchanged, numbers and booleans use their JSON text,
/// `null` becomes the empty string, and arrays/objects are kept as compact JSON.
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}

/// Serde adapter that accepts any JSON value for a string field.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_to_string(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerce_keeps_strings_and_renders_scalars() {
        assert_eq!(coerce_to_string(&json!("盘前要闻")), "盘前要闻");
        assert_eq!(coerce_to_string(&json!(null)), "");
        assert_eq!(coerce_to_string(&json!(42)), "42");
        assert_eq!(coerce_to_string(&json!(1.5)), "1.5");
        assert_eq!(coerce_to_string(&json!(true)), "true");
        assert_eq!(coerce_to_string(&json!(["a", 1])), "[\"a\",1]");
    }
}
