// src/utils/serialization.rs
//! Canonical JSON serialization.
//!
//! Every signature in the system covers the *canonical* JSON text of a value:
//! object keys sorted case-insensitively at every nesting level, arrays left
//! exactly as they are, no whitespace. Signer and verifier must produce the
//! same bytes, so this module is the single place where that form is built.
//!
//! Ordering rules, matching how the signing wallets emit JSON:
//! - keys that look like array indices (`"0"`, `"17"`) come first, ascending
//!   by numeric value;
//! - all other keys follow, compared lowercase over UTF-16 code units;
//! - keys that compare equal keep their input order.
//!
//! One level differs: the credential keys of a provider group are ordered by
//! exact UTF-16 code units (after the index-like keys), as wallets sort them
//! with a plain string sort. [`canonicalize_credential_map`] builds that level.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Returns the canonical form of `value`.
///
/// Pure: the input is never modified. Objects nested inside arrays are not
/// reordered. Idempotent: `canonicalize(&canonicalize(v)) == canonicalize(v)`.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sort_object(map, KeyOrder::CaseInsensitive)),
        other => other.clone(),
    }
}

/// Canonical form of a provider group's `credentials` map: keys in exact
/// code-unit order, every credential canonicalized as usual.
pub fn canonicalize_credential_map(map: &Map<String, Value>) -> Map<String, Value> {
    sort_object(map, KeyOrder::Exact)
}

/// How the keys of one object level are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyOrder {
    CaseInsensitive,
    Exact,
}

/// Orders one object level by `order` and canonicalizes the values below it.
fn sort_object(map: &Map<String, Value>, order: KeyOrder) -> Map<String, Value> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|(left, _), (right, _)| compare_keys(left, right, order));

    let mut sorted = Map::with_capacity(entries.len());
    for (key, nested) in entries {
        sorted.insert(key.clone(), canonicalize(nested));
    }
    sorted
}

/// Serializes `data` and returns its canonical JSON text: the exact bytes
/// that get signed.
pub fn to_canonical_string<T: Serialize + ?Sized>(data: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(data)?;
    serde_json::to_string(&canonicalize(&value))
}

/// Deserializes a value from a JSON string.
pub fn deserialize<T: DeserializeOwned>(data: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(data)
}

fn compare_keys(left: &str, right: &str, order: KeyOrder) -> Ordering {
    match (array_index(left), array_index(right)) {
        (Some(l), Some(r)) => l.cmp(&r),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => match order {
            KeyOrder::CaseInsensitive => left
                .to_lowercase()
                .encode_utf16()
                .cmp(right.to_lowercase().encode_utf16()),
            KeyOrder::Exact => left.encode_utf16().cmp(right.encode_utf16()),
        },
    }
}

/// `Some(n)` if `key` is the canonical decimal form of an array index.
fn array_index(key: &str) -> Option<u32> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse::<u32>().ok().filter(|index| *index != u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(value: &Value) -> Vec<String> {
        value.as_object().unwrap().keys().cloned().collect()
    }

    #[test]
    fn test_keys_sorted_case_insensitively() {
        let value = json!({"b": 1, "Type": 2, "a": 3, "holder": 4, "Nonce": 5});
        assert_eq!(keys(&canonicalize(&value)), ["a", "b", "holder", "Nonce", "Type"]);
    }

    #[test]
    fn test_order_independent_of_insertion() {
        let first = json!({"zeta": {"y": 1, "X": 2}, "alpha": [3, 1, 2]});
        let mut reversed = Map::new();
        reversed.insert("alpha".into(), json!([3, 1, 2]));
        reversed.insert("zeta".into(), json!({"X": 2, "y": 1}));

        assert_eq!(
            serde_json::to_string(&canonicalize(&first)).unwrap(),
            serde_json::to_string(&canonicalize(&Value::Object(reversed))).unwrap()
        );
    }

    #[test]
    fn test_idempotent() {
        let value = json!({
            "credentials": {"GOV": {"proof": {"type": "ECDSA", "nonce": 1, "holder": "0x1"}}},
            "B": null,
            "a": [{"z": 1, "a": 2}]
        });
        let once = serde_json::to_string(&canonicalize(&value)).unwrap();
        let twice = serde_json::to_string(&canonicalize(&canonicalize(&value))).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_arrays_are_left_untouched() {
        let value = json!({"list": [{"z": 1, "a": 2}, 3, "b", "a"]});
        let text = serde_json::to_string(&canonicalize(&value)).unwrap();
        assert_eq!(text, r#"{"list":[{"z":1,"a":2},3,"b","a"]}"#);
    }

    #[test]
    fn test_nested_objects_are_sorted() {
        let value = json!({"proof": {"type": "ECDSA", "nonce": 42, "holder": "0xabc"}, "id": "x"});
        assert_eq!(
            to_canonical_string(&value).unwrap(),
            r#"{"id":"x","proof":{"holder":"0xabc","nonce":42,"type":"ECDSA"}}"#
        );
    }

    #[test]
    fn test_index_like_keys_come_first() {
        let value = json!({"b": 0, "10": 0, "a": 0, "2": 0, "01": 0});
        assert_eq!(keys(&canonicalize(&value)), ["2", "10", "01", "a", "b"]);
    }

    #[test]
    fn test_equal_keys_keep_input_order() {
        let mut map = Map::new();
        map.insert("Key".into(), json!(1));
        map.insert("key".into(), json!(2));
        assert_eq!(keys(&canonicalize(&Value::Object(map))), ["Key", "key"]);
    }

    #[test]
    fn test_credential_map_uses_exact_code_unit_order() {
        let map = json!({"id_number": 0, "IDENTITY": {"b": 1, "A": 2}, "ID_NUMBER": 0, "7": 0})
            .as_object()
            .cloned()
            .unwrap();
        let sorted = canonicalize_credential_map(&map);
        assert_eq!(
            sorted.keys().collect::<Vec<_>>(),
            ["7", "IDENTITY", "ID_NUMBER", "id_number"]
        );
        // Values below the map keep the case-insensitive rule.
        assert_eq!(keys(&sorted["IDENTITY"]), ["A", "b"]);
        assert_eq!(keys(&canonicalize(&Value::Object(map))), ["7", "id_number", "ID_NUMBER", "IDENTITY"]);
    }

    #[test]
    fn test_scalars_unchanged() {
        assert_eq!(canonicalize(&json!("text")), json!("text"));
        assert_eq!(canonicalize(&json!(null)), json!(null));
        assert_eq!(canonicalize(&json!(7)), json!(7));
    }
}
