//! Custom deserializers for the loosely-typed fields of stored equipment documents.
//!
//! Documents were written by hand through an admin console over several seasons, so
//! the same field shows up as a string, a number, a boolean or a store timestamp
//! object depending on who typed it. These helpers fold all of that into
//! `Option<String>` so a single odd value never makes the whole record unreadable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserializes a display string from any JSON scalar or timestamp object.
///
/// # Accepted Formats
///
/// * **String**: kept verbatim; blank strings become `None`
/// * **Number / bool**: stringified (`7` → `"7"`)
/// * **Timestamp object**: `{ "seconds": .., "nanoseconds": .. }` or the
///   underscore-prefixed export form, rendered as `YYYY-MM-DD` (UTC)
/// * **Other objects / arrays**: compact JSON
/// * **Null / missing**: `None`
pub fn de_option_string_forgiving<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<Value>::deserialize(deserializer)?;
    Ok(opt.and_then(|v| value_to_display(&v)))
}

/// Shared conversion used by the deserializer and the legacy reader
pub fn value_to_display(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(_) => {
            Some(timestamp_to_date(value).unwrap_or_else(|| value.to_string()))
        }
        Value::Array(_) => Some(value.to_string()),
    }
}

/// Render a store timestamp object as a calendar date
pub fn timestamp_to_date(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    let seconds = obj
        .get("seconds")
        .or_else(|| obj.get("_seconds"))
        .and_then(Value::as_i64)?;
    let nanos = obj
        .get("nanoseconds")
        .or_else(|| obj.get("_nanoseconds"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let nanos = u32::try_from(nanos).ok()?;
    let dt: DateTime<Utc> = DateTime::from_timestamp(seconds, nanos)?;
    Some(dt.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "de_option_string_forgiving")]
        when: Option<String>,
    }

    fn read_when(v: Value) -> Option<String> {
        serde_json::from_value::<Holder>(v).unwrap().when
    }

    #[test]
    fn test_strings_are_verbatim_and_blank_is_none() {
        assert_eq!(read_when(json!({"when": " 2024-01-01 "})).as_deref(), Some(" 2024-01-01 "));
        assert_eq!(read_when(json!({"when": "   "})), None);
        assert_eq!(read_when(json!({"when": null})), None);
        assert_eq!(read_when(json!({})), None);
    }

    #[test]
    fn test_scalars_are_stringified() {
        assert_eq!(read_when(json!({"when": 23})).as_deref(), Some("23"));
        assert_eq!(read_when(json!({"when": false})).as_deref(), Some("false"));
    }

    #[test]
    fn test_timestamp_objects_become_dates() {
        // 2024-03-15T12:00:00Z
        let ts = json!({"seconds": 1_710_504_000, "nanoseconds": 0});
        assert_eq!(read_when(json!({"when": ts})).as_deref(), Some("2024-03-15"));

        let exported = json!({"_seconds": 1_710_504_000, "_nanoseconds": 5});
        assert_eq!(read_when(json!({"when": exported})).as_deref(), Some("2024-03-15"));
    }

    #[test]
    fn test_other_objects_fall_back_to_json() {
        assert_eq!(
            read_when(json!({"when": {"dia": 3}})).as_deref(),
            Some(r#"{"dia":3}"#)
        );
    }
}
