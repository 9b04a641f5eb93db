//! String key/value storage with optional absolute expiry timestamps.

use std::collections::HashMap;

use jiff::Timestamp;

/// A stored string value. `expiry_at` is an absolute wall-clock instant;
/// the record is live while `now < expiry_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct StringRecord {
    pub value: String,
    pub expiry_at: Option<Timestamp>,
}

/// Key → string-record map with lazy expiry: reads treat dead records as
/// absent and remove them on the spot.
#[derive(Debug, Default)]
pub struct StringStore {
    records: HashMap<String, StringRecord>,
}

impl StringStore {
    pub fn new() -> Self {
        StringStore {
            records: HashMap::new(),
        }
    }

    /// Stores a value, replacing any prior record. When `expiry_at` is
    /// `None` any existing expiry is cleared.
    pub fn set(&mut self, key: String, value: String, expiry_at: Option<Timestamp>) {
        self.records.insert(key, StringRecord { value, expiry_at });
    }

    /// Returns the live value for `key`, removing the record first when its
    /// expiry has passed.
    pub fn get(&mut self, key: &str) -> Option<String> {
        if self.expire_if_dead(key) {
            return None;
        }
        self.records.get(key).map(|record| record.value.clone())
    }

    pub fn exists(&mut self, key: &str) -> bool {
        if self.expire_if_dead(key) {
            return false;
        }
        self.records.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.records.remove(key).is_some()
    }

    /// Number of live keys.
    pub fn size(&mut self) -> usize {
        self.cleanup_expired();
        self.records.len()
    }

    /// All live keys, in arbitrary order.
    pub fn keys(&mut self) -> Vec<String> {
        self.cleanup_expired();
        self.records.keys().cloned().collect()
    }

    /// Sets an expiry on an existing live key.
    pub fn set_expiry(&mut self, key: &str, expiry_at: Timestamp) -> bool {
        if self.expire_if_dead(key) {
            return false;
        }
        match self.records.get_mut(key) {
            Some(record) => {
                record.expiry_at = Some(expiry_at);
                true
            }
            None => false,
        }
    }

    /// Removes the expiry from an existing live key, making it persistent.
    pub fn remove_expiry(&mut self, key: &str) -> bool {
        if self.expire_if_dead(key) {
            return false;
        }
        match self.records.get_mut(key) {
            Some(record) => {
                record.expiry_at = None;
                true
            }
            None => false,
        }
    }

    /// The expiry timestamp of a live key, if one is set.
    pub fn expiry_of(&mut self, key: &str) -> Option<Timestamp> {
        if self.expire_if_dead(key) {
            return None;
        }
        self.records.get(key).and_then(|record| record.expiry_at)
    }

    /// Drops every record whose expiry has passed.
    pub fn cleanup_expired(&mut self) {
        let now = Timestamp::now();
        self.records
            .retain(|_, record| !record_is_dead(record, now));
    }

    /// Removes `key` if its record exists and has expired. Returns whether
    /// a removal happened.
    fn expire_if_dead(&mut self, key: &str) -> bool {
        let now = Timestamp::now();
        let dead = self
            .records
            .get(key)
            .is_some_and(|record| record_is_dead(record, now));

        if dead {
            self.records.remove(key);
        }
        dead
    }
}

fn record_is_dead(record: &StringRecord, now: Timestamp) -> bool {
    record.expiry_at.is_some_and(|expiry_at| now >= expiry_at)
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;

    fn future(ms: i64) -> Timestamp {
        Timestamp::now()
            .checked_add(SignedDuration::from_millis(ms))
            .unwrap()
    }

    fn past(ms: i64) -> Timestamp {
        Timestamp::now()
            .checked_add(SignedDuration::from_millis(-ms))
            .unwrap()
    }

    #[test]
    fn test_set_and_get() {
        let mut store = StringStore::new();
        store.set("foo".to_string(), "bar".to_string(), None);

        assert_eq!(store.get("foo"), Some("bar".to_string()));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn test_set_replaces_value_and_clears_expiry() {
        let mut store = StringStore::new();
        store.set("foo".to_string(), "bar".to_string(), Some(future(60_000)));
        assert!(store.expiry_of("foo").is_some());

        store.set("foo".to_string(), "baz".to_string(), None);
        assert_eq!(store.get("foo"), Some("baz".to_string()));
        assert_eq!(store.expiry_of("foo"), None);
    }

    #[test]
    fn test_expired_key_reads_as_absent() {
        let mut store = StringStore::new();
        store.set("foo".to_string(), "bar".to_string(), Some(past(10)));

        assert_eq!(store.get("foo"), None);
        assert_eq!(store.exists("foo"), false);
        assert_eq!(store.size(), 0);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_size_and_keys_exclude_expired() {
        let mut store = StringStore::new();
        store.set("live".to_string(), "1".to_string(), Some(future(60_000)));
        store.set("dead".to_string(), "2".to_string(), Some(past(10)));
        store.set("forever".to_string(), "3".to_string(), None);

        assert_eq!(store.size(), 2);

        let mut keys = store.keys();
        keys.sort();
        assert_eq!(keys, vec!["forever".to_string(), "live".to_string()]);
    }

    #[test]
    fn test_expiry_management() {
        let mut store = StringStore::new();
        store.set("foo".to_string(), "bar".to_string(), None);

        assert_eq!(store.expiry_of("foo"), None);

        let expiry = future(60_000);
        assert_eq!(store.set_expiry("foo", expiry), true);
        assert_eq!(store.expiry_of("foo"), Some(expiry));

        assert_eq!(store.remove_expiry("foo"), true);
        assert_eq!(store.expiry_of("foo"), None);

        assert_eq!(store.set_expiry("missing", expiry), false);
        assert_eq!(store.remove_expiry("missing"), false);
    }

    #[test]
    fn test_remove() {
        let mut store = StringStore::new();
        store.set("foo".to_string(), "bar".to_string(), None);

        assert_eq!(store.remove("foo"), true);
        assert_eq!(store.remove("foo"), false);
        assert_eq!(store.get("foo"), None);
    }

    #[test]
    fn test_cleanup_expired() {
        let mut store = StringStore::new();
        store.set("a".to_string(), "1".to_string(), Some(past(5)));
        store.set("b".to_string(), "2".to_string(), Some(past(5)));
        store.set("c".to_string(), "3".to_string(), None);

        store.cleanup_expired();
        assert_eq!(store.size(), 1);
        assert_eq!(store.get("c"), Some("3".to_string()));
    }
}
