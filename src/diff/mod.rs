//! Field-level snapshot diffing.
//!
//! Pure and deterministic; no I/O, safe to call from concurrent tasks.

use std::collections::BTreeSet;

use crate::models::{DiffMap, FieldChange, Snapshot};

/// Compare two snapshots and return the fields that differ.
///
/// Either side may be absent and is then treated as an empty snapshot.
/// Comparison is deep structural equality on the JSON values: objects
/// compare by key set regardless of insertion order, arrays compare
/// element-for-element. A key missing on one side is recorded as absent
/// (`None`), not as JSON null, so "field removed" and "field set to null"
/// stay distinguishable.
///
/// Returns `None` when nothing changed, so callers can cheaply detect a
/// no-op save.
pub fn compute_diff(previous: Option<&Snapshot>, current: Option<&Snapshot>) -> Option<DiffMap> {
    let empty = Snapshot::new();
    let prev = previous.unwrap_or(&empty);
    let curr = current.unwrap_or(&empty);

    let keys: BTreeSet<&str> = prev
        .keys()
        .map(String::as_str)
        .chain(curr.keys().map(String::as_str))
        .collect();

    let mut diff = DiffMap::new();
    for key in keys {
        let from = prev.get(key);
        let to = curr.get(key);
        if from != to {
            diff.insert(
                key.to_string(),
                FieldChange {
                    from: from.cloned(),
                    to: to.cloned(),
                },
            );
        }
    }

    if diff.is_empty() {
        None
    } else {
        Some(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn snapshot(value: Value) -> Snapshot {
        match value {
            Value::Object(map) => map,
            _ => panic!("snapshot fixtures must be JSON objects"),
        }
    }

    #[test]
    fn test_changed_and_added_fields() {
        let prev = snapshot(json!({ "a": 1, "b": 2 }));
        let curr = snapshot(json!({ "a": 1, "b": 3, "c": 4 }));

        let diff = compute_diff(Some(&prev), Some(&curr)).unwrap();

        assert_eq!(diff.len(), 2);
        assert_eq!(diff["b"].from, Some(json!(2)));
        assert_eq!(diff["b"].to, Some(json!(3)));
        assert_eq!(diff["c"].from, None);
        assert_eq!(diff["c"].to, Some(json!(4)));
    }

    #[test]
    fn test_identical_snapshots_yield_none() {
        let snap = snapshot(json!({ "name": "Ava", "tags": ["brand", "b2b"] }));
        assert!(compute_diff(Some(&snap), Some(&snap)).is_none());
    }

    #[test]
    fn test_removed_field_is_absent_not_null() {
        let prev = snapshot(json!({ "a": 1, "b": null }));
        let curr = snapshot(json!({ "a": 1 }));

        let diff = compute_diff(Some(&prev), Some(&curr)).unwrap();

        assert_eq!(diff.len(), 1);
        assert_eq!(diff["b"].from, Some(Value::Null));
        assert_eq!(diff["b"].to, None);
    }

    #[test]
    fn test_null_assignment_differs_from_removal() {
        let prev = snapshot(json!({ "a": 1 }));
        let curr = snapshot(json!({ "a": null }));

        let diff = compute_diff(Some(&prev), Some(&curr)).unwrap();
        assert_eq!(diff["a"].from, Some(json!(1)));
        assert_eq!(diff["a"].to, Some(Value::Null));
    }

    #[test]
    fn test_nested_object_key_order_is_irrelevant() {
        let prev = snapshot(json!({ "style": { "font": "Inter", "size": 12 } }));
        let curr = snapshot(json!({ "style": { "size": 12, "font": "Inter" } }));
        assert!(compute_diff(Some(&prev), Some(&curr)).is_none());
    }

    #[test]
    fn test_array_order_is_significant() {
        let prev = snapshot(json!({ "channels": ["web", "print"] }));
        let curr = snapshot(json!({ "channels": ["print", "web"] }));
        assert!(compute_diff(Some(&prev), Some(&curr)).is_some());
    }

    #[test]
    fn test_absent_sides_treated_as_empty() {
        let snap = snapshot(json!({ "a": 1 }));

        let diff = compute_diff(None, Some(&snap)).unwrap();
        assert_eq!(diff["a"].from, None);
        assert_eq!(diff["a"].to, Some(json!(1)));

        assert!(compute_diff(None, None).is_none());
    }
}
