use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::Result;

/// Key-value persistence for recipe and plan documents.
///
/// Values are opaque strings (JSON documents in practice). Implementations
/// synchronize internally so a single handle can be shared across requests.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Keys starting with `prefix`, in ascending order.
    fn scan(&self, prefix: &str) -> Result<Vec<String>>;

    /// Values for `keys`, positionally; missing keys yield `None`.
    fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// Returns whether the key existed.
    fn del(&self, key: &str) -> Result<bool>;

    /// Write `value` only if the key currently holds `expected` (`None` meaning
    /// absent). Returns whether the write happened.
    fn compare_and_swap(&self, key: &str, expected: Option<&str>, value: &str) -> Result<bool>;
}

impl<T: KvStore + ?Sized> KvStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn scan(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).scan(prefix)
    }

    fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        (**self).mget(keys)
    }

    fn del(&self, key: &str) -> Result<bool> {
        (**self).del(key)
    }

    fn compare_and_swap(&self, key: &str, expected: Option<&str>, value: &str) -> Result<bool> {
        (**self).compare_and_swap(key, expected, value)
    }
}

/// In-process store, used for tests and `--ephemeral` sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let entries = self.entries();
        Ok(keys.iter().map(|k| entries.get(k).cloned()).collect())
    }

    fn del(&self, key: &str) -> Result<bool> {
        Ok(self.entries().remove(key).is_some())
    }

    fn compare_and_swap(&self, key: &str, expected: Option<&str>, value: &str) -> Result<bool> {
        let mut entries = self.entries();
        if entries.get(key).map(String::as_str) != expected {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_del() {
        let store = MemoryStore::new();
        assert!(store.get("a").unwrap().is_none());

        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        assert!(store.del("a").unwrap());
        assert!(!store.del("a").unwrap());
    }

    #[test]
    fn test_scan_prefix_is_ordered_and_bounded() {
        let store = MemoryStore::new();
        store.set("recipe:b", "2").unwrap();
        store.set("recipe:a", "1").unwrap();
        store.set("recipes", "x").unwrap();
        store.set("meal_plan:current", "{}").unwrap();

        let keys = store.scan("recipe:").unwrap();
        assert_eq!(keys, vec!["recipe:a", "recipe:b"]);
    }

    #[test]
    fn test_mget_positional() {
        let store = MemoryStore::new();
        store.set("a", "1").unwrap();
        let values = store
            .mget(&["a".to_string(), "missing".to_string()])
            .unwrap();
        assert_eq!(values, vec![Some("1".to_string()), None]);
    }

    #[test]
    fn test_compare_and_swap() {
        let store = MemoryStore::new();
        assert!(store.compare_and_swap("k", None, "v1").unwrap());
        assert!(!store.compare_and_swap("k", None, "v2").unwrap());
        assert!(!store.compare_and_swap("k", Some("stale"), "v2").unwrap());
        assert!(store.compare_and_swap("k", Some("v1"), "v2").unwrap());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn test_boxed_store_delegates() {
        let store: Box<dyn KvStore> = Box::new(MemoryStore::new());
        store.set("recipe:a", "1").unwrap();
        assert_eq!(store.scan("recipe:").unwrap(), vec!["recipe:a"]);
        assert!(store.compare_and_swap("recipe:a", Some("1"), "2").unwrap());
        assert_eq!(store.get("recipe:a").unwrap().as_deref(), Some("2"));
    }
}
