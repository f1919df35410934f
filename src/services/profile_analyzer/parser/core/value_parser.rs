//! Value parsing utilities for profile responses
//!
//! Typed, path-aware accessors over `serde_json::Value`. Every failure names the JSON path
//! of the offending field so callers can point the user at the exact location.

use crate::services::profile_analyzer::parser::error::{ProfileError, ProfileResult};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::borrow::Cow;

// Descriptions pasted from consoles sometimes arrive as `"description": """..."""`.
// The closing quotes must be followed by the next separator so content may end in `"`.
static TRIPLE_QUOTED_DESCRIPTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)"description":\s*"""(.*?)"""(\s*[,}\]])"#).unwrap());

/// Value parser for profile JSON fields
pub struct ValueParser;

impl ValueParser {
    /// Path of a named field below `parent`
    pub fn field_path(parent: &str, key: &str) -> String {
        if parent.is_empty() { key.to_string() } else { format!("{}.{}", parent, key) }
    }

    /// Path of an array element below `parent`
    pub fn index_path(parent: &str, idx: usize) -> String {
        format!("{}[{}]", parent, idx)
    }

    /// JSON type name used in error messages
    pub fn type_name(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn as_object<'a>(value: &'a Value, path: &str) -> ProfileResult<&'a Map<String, Value>> {
        value.as_object().ok_or_else(|| {
            ProfileError::schema(
                path,
                format!("expected object, found {}", Self::type_name(value)),
            )
        })
    }

    /// Required array field; missing or mistyped is an error
    pub fn required_array<'a>(
        obj: &'a Map<String, Value>,
        key: &str,
        parent: &str,
    ) -> ProfileResult<&'a [Value]> {
        let path = Self::field_path(parent, key);
        match obj.get(key) {
            None => Err(ProfileError::schema(path, "missing required field")),
            Some(value) => Self::expect_array(value, &path),
        }
    }

    /// Optional array field; missing or null yields an empty slice
    pub fn optional_array<'a>(
        obj: &'a Map<String, Value>,
        key: &str,
        parent: &str,
    ) -> ProfileResult<&'a [Value]> {
        match obj.get(key) {
            None | Some(Value::Null) => Ok(&[]),
            Some(value) => Self::expect_array(value, &Self::field_path(parent, key)),
        }
    }

    fn expect_array<'a>(value: &'a Value, path: &str) -> ProfileResult<&'a [Value]> {
        value.as_array().map(Vec::as_slice).ok_or_else(|| {
            ProfileError::schema(
                path,
                format!("expected array, found {}", Self::type_name(value)),
            )
        })
    }

    /// Optional object field; missing or null yields `None`
    pub fn optional_object<'a>(
        obj: &'a Map<String, Value>,
        key: &str,
        parent: &str,
    ) -> ProfileResult<Option<&'a Map<String, Value>>> {
        match obj.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Self::as_object(value, &Self::field_path(parent, key)).map(Some),
        }
    }

    /// Optional string field; a present non-string value is an error
    pub fn optional_string(
        obj: &Map<String, Value>,
        key: &str,
        parent: &str,
    ) -> ProfileResult<Option<String>> {
        match obj.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ProfileError::schema(
                Self::field_path(parent, key),
                format!("expected string, found {}", Self::type_name(other)),
            )),
        }
    }

    /// Optional non-negative integer field (nanoseconds, milliseconds, counts)
    pub fn optional_u64(
        obj: &Map<String, Value>,
        key: &str,
        parent: &str,
    ) -> ProfileResult<Option<u64>> {
        match obj.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Self::expect_u64(value, &Self::field_path(parent, key)).map(Some),
        }
    }

    /// A value that must be a non-negative integer
    pub fn expect_u64(value: &Value, path: &str) -> ProfileResult<u64> {
        match value {
            Value::Number(n) => n.as_u64().ok_or_else(|| {
                ProfileError::schema(
                    path,
                    format!("expected non-negative integer, found {}", n),
                )
            }),
            other => Err(ProfileError::schema(
                path,
                format!("expected non-negative integer, found {}", Self::type_name(other)),
            )),
        }
    }

    /// Rewrite triple-quoted description values into valid JSON strings
    ///
    /// Returns the input unchanged (borrowed) when there is nothing to fix.
    pub fn normalize_triple_quoted_descriptions(text: &str) -> Cow<'_, str> {
        TRIPLE_QUOTED_DESCRIPTION_REGEX.replace_all(text, |caps: &Captures| {
            let escaped = Value::String(caps[1].to_string()).to_string();
            format!("\"description\": {}{}", escaped, &caps[2])
        })
    }

    /// Deepest `{` / `[` nesting in JSON text, ignoring brackets inside strings
    ///
    /// Malformed text is scanned as far as it goes; decoding reports the actual syntax error.
    pub fn nesting_depth(text: &str) -> usize {
        let mut depth = 0usize;
        let mut max_depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for byte in text.bytes() {
            if in_string {
                match byte {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {},
                }
                continue;
            }
            match byte {
                b'"' => in_string = true,
                b'{' | b'[' => {
                    depth += 1;
                    max_depth = max_depth.max(depth);
                },
                b'}' | b']' => depth = depth.saturating_sub(1),
                _ => {},
            }
        }
        max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_and_index_paths() {
        assert_eq!(ValueParser::field_path("", "profile"), "profile");
        assert_eq!(ValueParser::field_path("profile", "shards"), "profile.shards");
        assert_eq!(ValueParser::index_path("shards", 2), "shards[2]");
    }

    #[test]
    fn test_optional_u64_rejects_strings_with_path() {
        let value = json!({ "time_in_nanos": "12ms" });
        let obj = value.as_object().unwrap();
        let err = ValueParser::optional_u64(obj, "time_in_nanos", "shards[0].fetch").unwrap_err();
        assert_eq!(err.path(), Some("shards[0].fetch.time_in_nanos"));
    }

    #[test]
    fn test_optional_u64_rejects_negative_numbers() {
        let value = json!({ "rewrite_time": -5 });
        let obj = value.as_object().unwrap();
        assert!(ValueParser::optional_u64(obj, "rewrite_time", "").is_err());
    }

    #[test]
    fn test_optional_u64_missing_and_null() {
        let value = json!({ "a": null });
        let obj = value.as_object().unwrap();
        assert_eq!(ValueParser::optional_u64(obj, "a", "").unwrap(), None);
        assert_eq!(ValueParser::optional_u64(obj, "b", "").unwrap(), None);
    }

    #[test]
    fn test_required_array_missing() {
        let value = json!({});
        let obj = value.as_object().unwrap();
        let err = ValueParser::required_array(obj, "shards", "profile").unwrap_err();
        assert_eq!(err.path(), Some("profile.shards"));
    }

    #[test]
    fn test_required_array_wrong_type() {
        let value = json!({ "shards": {} });
        let obj = value.as_object().unwrap();
        let err = ValueParser::required_array(obj, "shards", "profile").unwrap_err();
        assert!(err.to_string().contains("expected array, found object"));
    }

    #[test]
    fn test_normalize_triple_quoted_description() {
        let text = r#"{"description": """field:"value" AND x""", "time_in_nanos": 1}"#;
        let fixed = ValueParser::normalize_triple_quoted_descriptions(text);
        let parsed: Value = serde_json::from_str(&fixed).unwrap();
        assert_eq!(parsed["description"], json!("field:\"value\" AND x"));
    }

    #[test]
    fn test_normalize_description_ending_in_quote() {
        let text = r#"{"description": """a:"b"""", "time_in_nanos": 1}"#;
        let fixed = ValueParser::normalize_triple_quoted_descriptions(text);
        let parsed: Value = serde_json::from_str(&fixed).unwrap();
        assert_eq!(parsed["description"], json!("a:\"b\""));
        assert_eq!(parsed["time_in_nanos"], json!(1));
    }

    #[test]
    fn test_normalize_description_last_in_object() {
        let text = "[{\"description\": \"\"\"title:\"rust\"\"\"\"\n}]";
        let fixed = ValueParser::normalize_triple_quoted_descriptions(text);
        let parsed: Value = serde_json::from_str(&fixed).unwrap();
        assert_eq!(parsed[0]["description"], json!("title:\"rust\""));
    }

    #[test]
    fn test_nesting_depth_ignores_brackets_in_strings() {
        assert_eq!(ValueParser::nesting_depth("42"), 0);
        assert_eq!(ValueParser::nesting_depth(r#"{"a": [1, {"b": []}]}"#), 4);
        assert_eq!(ValueParser::nesting_depth(r#"{"a": "[[{{\"[["}"#), 1);
        assert_eq!(ValueParser::nesting_depth(r#"[[], [[]], []]"#), 3);
    }

    #[test]
    fn test_normalize_leaves_plain_json_borrowed() {
        let text = r#"{"description": "plain"}"#;
        assert!(matches!(
            ValueParser::normalize_triple_quoted_descriptions(text),
            Cow::Borrowed(_)
        ));
    }
}
