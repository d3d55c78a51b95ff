//! In-memory store using `DashMap`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use scenario_core::result::AppResult;
use scenario_core::traits::store::KeyValueStore;

/// Process-local key-value store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> AppResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_basic_ops() {
        let store = MemoryStore::new();

        store.set("key1", "value1").await.expect("set");
        let val = store.get("key1").await.expect("get");
        assert_eq!(val, Some("value1".to_string()));

        store.delete("key1").await.expect("delete");
        assert_eq!(store.get("key1").await.expect("get"), None);

        store.delete("missing").await.expect("delete missing");
    }

    #[tokio::test]
    async fn test_memory_store_keys_by_prefix() {
        let store = MemoryStore::new();
        store.set("a:2", "x").await.expect("set");
        store.set("a:1", "x").await.expect("set");
        store.set("b:1", "x").await.expect("set");

        let keys = store.keys("a:").await.expect("keys");
        assert_eq!(keys, vec!["a:1".to_string(), "a:2".to_string()]);
    }

    #[tokio::test]
    async fn test_memory_store_json_helpers() {
        let store = MemoryStore::new();
        store.set_json("n", &vec![1, 2, 3]).await.expect("set_json");
        let back: Option<Vec<i32>> = store.get_json("n").await.expect("get_json");
        assert_eq!(back, Some(vec![1, 2, 3]));
    }
}
