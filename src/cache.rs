//! Lookup cache - bounded, flush-on-full
//!
//! Holds `key → value` (with a confirmed-absent marker for negative lookups)
//! and, when the value column is unique, `value → key`. Once the key side
//! reaches capacity both maps are cleared in bulk before the next insert;
//! there is no per-entry eviction.
//!
//! Scalars are normalized with [`Scalar::cache_key`] before they touch
//! either map, so `1` and `"1"` share an entry the way they share a row.

use crate::value::{Scalar, Value};
use std::collections::HashMap;
use tracing::debug;

pub struct LookupCache {
    capacity: usize,
    by_key: HashMap<Scalar, Option<Value>>,
    /// `None` when value caching is disabled for this table. Keys are kept
    /// in the form they were recorded with.
    by_value: Option<HashMap<Scalar, Scalar>>,
    flushes: u64,
}

impl LookupCache {
    pub fn new(capacity: usize, cache_values: bool) -> Self {
        Self {
            capacity,
            by_key: HashMap::new(),
            by_value: cache_values.then(HashMap::new),
            flushes: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn caches_values(&self) -> bool {
        self.by_value.is_some()
    }

    /// Number of key-side entries (the quantity bounded by capacity)
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// How many times the cache filled up and was flushed
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    /// Cached outcome for `key`: `Some(None)` is a confirmed miss.
    pub fn value(&self, key: &Scalar) -> Option<Option<&Value>> {
        self.by_key.get(&key.cache_key()).map(Option::as_ref)
    }

    pub fn key(&self, value: &Scalar) -> Option<&Scalar> {
        self.by_value.as_ref()?.get(&value.cache_key())
    }

    /// Record `key → value`, flushing first if the cache is full.
    ///
    /// `index_value` allows the reverse `value → key` entry; it is only
    /// written for scalar values, and stale reverse entries left behind by
    /// the key's previous value (or by the value's previous key) are dropped.
    pub fn insert(&mut self, key: Scalar, value: Option<Value>, index_value: bool) {
        if self.by_key.len() >= self.capacity {
            self.flush();
        }

        let id = key.cache_key();
        let reverse = match &value {
            Some(Value::Scalar(scalar)) if index_value => Some(scalar.cache_key()),
            _ => None,
        };

        if let Some(Some(Value::Scalar(previous))) = self.by_key.insert(id.clone(), value) {
            self.unlink_value(&previous, &id);
        }

        if let (Some(by_value), Some(scalar)) = (self.by_value.as_mut(), reverse) {
            if let Some(owner) = by_value.insert(scalar, key) {
                let owner = owner.cache_key();
                if owner != id {
                    self.by_key.remove(&owner);
                }
            }
        }
    }

    /// Record that `key` no longer exists and forget `value → key`.
    pub fn mark_absent(&mut self, key: Scalar, value: Option<&Scalar>) {
        if let Some(value) = value {
            self.unlink_value(value, &key.cache_key());
        }
        self.insert(key, None, false);
    }

    /// Drop both directions, independent of capacity.
    pub fn clear(&mut self) {
        self.by_key.clear();
        if let Some(by_value) = self.by_value.as_mut() {
            by_value.clear();
        }
    }

    fn flush(&mut self) {
        debug!(entries = self.by_key.len(), capacity = self.capacity, "lookup cache full, flushing");
        self.clear();
        self.flushes += 1;
    }

    /// Drop `value → key` if it still points at `id` (a normalized key).
    fn unlink_value(&mut self, value: &Scalar, id: &Scalar) {
        let value = value.cache_key();
        if let Some(by_value) = self.by_value.as_mut() {
            if by_value.get(&value).map(Scalar::cache_key).as_ref() == Some(id) {
                by_value.remove(&value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(value: &str) -> Option<Value> {
        Some(Value::from(value))
    }

    #[test]
    fn test_flush_on_full() {
        let mut cache = LookupCache::new(3, true);
        for i in 0..3 {
            cache.insert(Scalar::from(i), text(&format!("v{}", i)), true);
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.flushes(), 0);

        cache.insert(Scalar::from(3), text("v3"), true);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.flushes(), 1);
        assert!(cache.value(&Scalar::from(2)).is_none());
        assert!(cache.key(&Scalar::from("v2")).is_none());
        assert_eq!(cache.key(&Scalar::from("v3")), Some(&Scalar::from(3)));
    }

    #[test]
    fn test_absent_marker() {
        let mut cache = LookupCache::new(8, true);
        cache.insert(Scalar::from(1), None, true);
        assert_eq!(cache.value(&Scalar::from(1)), Some(None));
        assert!(cache.value(&Scalar::from(2)).is_none());
    }

    #[test]
    fn test_reverse_requires_scalar() {
        let mut cache = LookupCache::new(8, true);
        cache.insert(Scalar::from(1), Some(Value::Json(json!({"a": 1}))), true);
        cache.insert(Scalar::from(2), text("two"), false);
        assert!(cache.key(&Scalar::from("two")).is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_reverse_disabled() {
        let mut cache = LookupCache::new(8, false);
        cache.insert(Scalar::from(1), text("one"), true);
        assert!(!cache.caches_values());
        assert!(cache.key(&Scalar::from("one")).is_none());
        assert!(cache.value(&Scalar::from(1)).is_some());
    }

    #[test]
    fn test_overwrite_unlinks_previous_value() {
        let mut cache = LookupCache::new(8, true);
        cache.insert(Scalar::from(1), text("old"), true);
        cache.insert(Scalar::from(1), text("new"), true);
        assert!(cache.key(&Scalar::from("old")).is_none());
        assert_eq!(cache.key(&Scalar::from("new")), Some(&Scalar::from(1)));
    }

    #[test]
    fn test_value_moving_keys_drops_old_owner() {
        let mut cache = LookupCache::new(8, true);
        cache.insert(Scalar::from(1), text("shared"), true);
        cache.insert(Scalar::from(2), text("shared"), true);
        assert!(cache.value(&Scalar::from(1)).is_none());
        assert_eq!(cache.key(&Scalar::from("shared")), Some(&Scalar::from(2)));
    }

    #[test]
    fn test_mark_absent() {
        let mut cache = LookupCache::new(8, true);
        cache.insert(Scalar::from(1), text("one"), true);
        cache.mark_absent(Scalar::from(1), Some(&Scalar::from("one")));
        assert_eq!(cache.value(&Scalar::from(1)), Some(None));
        assert!(cache.key(&Scalar::from("one")).is_none());
    }

    #[test]
    fn test_integer_text_keys_share_an_entry() {
        let mut cache = LookupCache::new(8, true);
        cache.insert(Scalar::from(1), text("a"), true);
        assert_eq!(cache.value(&Scalar::from("1")), Some(Some(&Value::from("a"))));

        cache.insert(Scalar::from("1"), text("b"), true);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.value(&Scalar::from(1)), Some(Some(&Value::from("b"))));
        assert!(cache.key(&Scalar::from("a")).is_none());

        cache.mark_absent(Scalar::from("1"), Some(&Scalar::from("b")));
        assert_eq!(cache.value(&Scalar::from(1)), Some(None));
        assert!(cache.key(&Scalar::from("b")).is_none());
    }

    #[test]
    fn test_integer_text_values_share_an_entry() {
        let mut cache = LookupCache::new(8, true);
        cache.insert(Scalar::from(1), Some(Value::from(42i64)), true);
        cache.insert(Scalar::from(2), text("42"), true);

        // The value moved to key 2, so key 1 is forgotten
        assert!(cache.value(&Scalar::from(1)).is_none());
        assert_eq!(cache.key(&Scalar::from(42)), Some(&Scalar::from(2)));
        assert_eq!(cache.key(&Scalar::from("42")), Some(&Scalar::from(2)));
    }

    #[test]
    fn test_reverse_entry_keeps_recorded_key_form() {
        let mut cache = LookupCache::new(8, true);
        cache.insert(Scalar::from("7"), text("seven"), true);
        assert_eq!(cache.key(&Scalar::from("seven")), Some(&Scalar::from("7")));

        // Overwriting through the integer form still unlinks the old value
        cache.insert(Scalar::from(7), text("SEVEN"), true);
        assert!(cache.key(&Scalar::from("seven")).is_none());
        assert_eq!(cache.key(&Scalar::from("SEVEN")), Some(&Scalar::from(7)));
    }

    #[test]
    fn test_clear_is_not_a_flush() {
        let mut cache = LookupCache::new(8, true);
        cache.insert(Scalar::from(1), text("one"), true);
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.key(&Scalar::from("one")).is_none());
        assert_eq!(cache.flushes(), 0);
    }
}
