//! Null-safe accessors over dynamic vendor JSON.
//!
//! Vendor payloads are deeply nested and inconsistently populated, so raw
//! records are kept as [`serde_json::Value`] rather than deserialized into
//! strict structs. Every extraction in `crate::normalize` goes through these
//! helpers instead of chained `.get().unwrap()`, so a missing or
//! wrong-shaped field null-propagates rather than panicking.

use serde_json::Value;

/// A raw vendor record, as returned by a `SourceClient`.
pub type RawRecord = Value;

pub fn str_at<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key)?.as_str()
}

pub fn owned_str_at(v: &Value, key: &str) -> Option<String> {
    str_at(v, key).map(str::to_owned)
}

pub fn i64_at(v: &Value, key: &str) -> Option<i64> {
    v.get(key)?.as_i64()
}

pub fn bool_at(v: &Value, key: &str) -> Option<bool> {
    v.get(key)?.as_bool()
}

pub fn obj_at<'a>(v: &'a Value, key: &str) -> Option<&'a Value> {
    v.get(key).filter(|inner| inner.is_object())
}

/// The elements of `v[key]` as a slice, or an empty slice if `key` is
/// missing, null, or not an array.
pub fn list_at<'a>(v: &'a Value, key: &str) -> &'a [Value] {
    v.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Qualys nests repeated fields as `{"<field>": {"list": [...]}}`. Returns
/// the inner list, or empty if the wrapper or the list is absent.
pub fn qualys_list<'a>(raw: &'a Value, field: &str) -> &'a [Value] {
    raw.get(field)
        .and_then(|wrapper| wrapper.get("list"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// `true` iff `v` is `Value::Null`, an empty object, or an empty array —
/// the shapes a raw vendor record takes when there's effectively no data.
pub fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn str_at_missing_key_is_none() {
        let v = json!({"a": "b"});
        assert_eq!(str_at(&v, "missing"), None);
    }

    #[test]
    fn qualys_list_missing_wrapper_is_empty() {
        let v = json!({"other": 1});
        assert!(qualys_list(&v, "networkInterface").is_empty());
    }

    #[test]
    fn qualys_list_present() {
        let v = json!({"networkInterface": {"list": [{"HostAssetInterface": {}}]}});
        assert_eq!(qualys_list(&v, "networkInterface").len(), 1);
    }

    #[test]
    fn is_blank_variants() {
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&json!({})));
        assert!(is_blank(&json!([])));
        assert!(!is_blank(&json!({"a": 1})));
    }
}
