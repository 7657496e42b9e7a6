//! Structural merge of repeated WHOIS/RDAP documents.
//!
//! Multiple responses for the same identifier are folded into one accumulated
//! mapping. The merge never overwrites: new keys are inserted verbatim, maps
//! recurse, sequences concatenate, and type-mismatched values are discarded.

use serde_json::{Map, Value};

use crate::types::ParsedRecord;

/// Merge a JSON object's entries into `target`.
///
/// For each entry of `data`:
/// - a new key is inserted verbatim,
/// - two mappings recurse,
/// - two sequences concatenate (existing items first, duplicates retained),
/// - any other type pairing keeps the existing value unchanged.
pub fn merge_object(target: &mut Map<String, Value>, data: &Map<String, Value>) {
    for (key, value) in data {
        match target.get_mut(key) {
            None => {
                target.insert(key.clone(), value.clone());
            }
            Some(existing) => match (existing, value) {
                (Value::Object(existing_map), Value::Object(new_map)) => {
                    merge_object(existing_map, new_map);
                }
                (Value::Array(existing_items), Value::Array(new_items)) => {
                    existing_items.extend(new_items.iter().cloned());
                }
                // Type mismatch: the pre-existing value wins
                _ => {}
            },
        }
    }
}

/// Merge `data` into `target` at an optional key.
///
/// With a key, a mapping or sequence is merged into the value stored there
/// (created if absent); a sequence only ever appends to an existing sequence.
/// Without a key, a mapping merges into `target` itself. Scalars at this
/// level are discarded.
pub fn merge_at(target: &mut Map<String, Value>, key: Option<&str>, data: &Value) {
    match key {
        None => {
            if let Value::Object(map) = data {
                merge_object(target, map);
            }
        }
        Some(key) => match target.get_mut(key) {
            None => match data {
                Value::Object(_) | Value::Array(_) => {
                    target.insert(key.to_string(), data.clone());
                }
                _ => {}
            },
            Some(existing) => match (existing, data) {
                (Value::Object(existing_map), Value::Object(new_map)) => {
                    merge_object(existing_map, new_map);
                }
                (Value::Array(existing_items), Value::Array(new_items)) => {
                    existing_items.extend(new_items.iter().cloned());
                }
                _ => {}
            },
        },
    }
}

/// The normalizer's accumulator: repeated structural merge of RDAP documents
/// and parsed WHOIS records into one mapping.
#[derive(Debug, Clone, Default)]
pub struct AccumulatedInfo {
    map: Map<String, Value>,
}

impl AccumulatedInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one accepted RDAP document, with its `links` removed first so
    /// referral bookkeeping never lands in the record.
    pub fn absorb_document(&mut self, document: &Value) {
        if let Value::Object(object) = document {
            let mut stripped = object.clone();
            stripped.remove("links");
            merge_object(&mut self.map, &stripped);
        }
    }

    /// Merge one parsed WHOIS record.
    pub fn absorb_record(&mut self, record: &ParsedRecord) {
        let map = record.to_map();
        merge_object(&mut self.map, &map);
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.map
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_new_keys_insert_verbatim() {
        let mut target = as_map(json!({"a": 1}));
        merge_object(&mut target, &as_map(json!({"b": [1, 2], "c": {"x": true}})));

        assert_eq!(target.get("a"), Some(&json!(1)));
        assert_eq!(target.get("b"), Some(&json!([1, 2])));
        assert_eq!(target.get("c"), Some(&json!({"x": true})));
    }

    #[test]
    fn test_sequences_concatenate_in_order() {
        let mut target = as_map(json!({"status": ["active", "locked"]}));
        merge_object(&mut target, &as_map(json!({"status": ["active", "ok"]})));

        // First-then-second order, duplicates retained
        assert_eq!(
            target.get("status"),
            Some(&json!(["active", "locked", "active", "ok"]))
        );
    }

    #[test]
    fn test_mappings_recurse() {
        let mut target = as_map(json!({"entity": {"handle": "X", "ids": [1]}}));
        merge_object(
            &mut target,
            &as_map(json!({"entity": {"roles": ["registrar"], "ids": [2]}})),
        );

        assert_eq!(
            target.get("entity"),
            Some(&json!({"handle": "X", "ids": [1, 2], "roles": ["registrar"]}))
        );
    }

    #[test]
    fn test_type_mismatch_preserves_existing() {
        let mut target = as_map(json!({
            "handle": "ORIGINAL",
            "status": ["active"],
            "count": 3
        }));
        merge_object(
            &mut target,
            &as_map(json!({
                "handle": ["not", "a", "string"],
                "status": "now-a-string",
                "count": {"nested": true}
            })),
        );

        assert_eq!(target.get("handle"), Some(&json!("ORIGINAL")));
        assert_eq!(target.get("status"), Some(&json!(["active"])));
        assert_eq!(target.get("count"), Some(&json!(3)));
    }

    #[test]
    fn test_merge_at_appends_sequence_only_to_sequence() {
        let mut target = as_map(json!({"servers": ["a"], "name": "x"}));

        merge_at(&mut target, Some("servers"), &json!(["b"]));
        assert_eq!(target.get("servers"), Some(&json!(["a", "b"])));

        // Appending to a non-sequence is a no-op
        merge_at(&mut target, Some("name"), &json!(["ignored"]));
        assert_eq!(target.get("name"), Some(&json!("x")));

        // New key inserts the sequence as-is
        merge_at(&mut target, Some("fresh"), &json!([1]));
        assert_eq!(target.get("fresh"), Some(&json!([1])));
    }

    #[test]
    fn test_accumulator_strips_links_and_accumulates() {
        let mut info = AccumulatedInfo::new();
        info.absorb_document(&json!({
            "handle": "DOC1",
            "status": ["active"],
            "links": [{"rel": "self", "href": "https://rdap.example/domain/x"}]
        }));
        info.absorb_document(&json!({
            "handle": "DOC2",
            "status": ["transfer prohibited"],
            "links": [{"rel": "related", "href": "https://other.example/domain/x"}]
        }));

        assert!(info.get("links").is_none());
        // First document's scalar wins, sequences accumulate
        assert_eq!(info.get("handle"), Some(&json!("DOC1")));
        assert_eq!(
            info.get("status"),
            Some(&json!(["active", "transfer prohibited"]))
        );
    }

    #[test]
    fn test_accumulator_absorbs_whois_records() {
        let mut record = ParsedRecord::new();
        record.insert("DOMAIN NAME", "EXAMPLE.COM".to_string());
        record.insert("NAME SERVER", "ns1.example.com".to_string());
        record.insert("NAME SERVER", "ns2.example.com".to_string());

        let mut info = AccumulatedInfo::new();
        info.absorb_record(&record);

        let mut second = ParsedRecord::new();
        second.insert("NAME SERVER", "ns3.example.com".to_string());
        // List in the second record appends to the accumulated list
        second.insert("NAME SERVER", "ns4.example.com".to_string());
        info.absorb_record(&second);

        assert_eq!(info.get("DOMAIN NAME"), Some(&json!("EXAMPLE.COM")));
        assert_eq!(
            info.get("NAME SERVER"),
            Some(&json!([
                "ns1.example.com",
                "ns2.example.com",
                "ns3.example.com",
                "ns4.example.com"
            ]))
        );
    }
}
