//! Upload checkpoint store keyed by normalized local path.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use scenario_core::result::AppResult;
use scenario_core::traits::store::KeyValueStore;
use scenario_entity::upload::UploadRecord;

use crate::keys;

/// Normalize a local path for use as a store key.
///
/// The path is made absolute against the current directory (without
/// resolving symlinks) and backslashes become forward slashes.
pub fn normalize_path(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    absolute.to_string_lossy().replace('\\', "/")
}

/// Typed access to [`UploadRecord`]s over a [`KeyValueStore`].
///
/// Mutations of one record are serialized through a per-key async mutex;
/// records for different paths never contend.
#[derive(Debug, Clone)]
pub struct LayerCacheStore {
    store: Arc<dyn KeyValueStore>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl LayerCacheStore {
    /// Wrap a key-value store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Acquire the write lock for a normalized path.
    pub async fn lock(&self, path: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Load the record for a normalized path.
    pub async fn load(&self, path: &str) -> AppResult<Option<UploadRecord>> {
        match self.store.get(&keys::upload_record(path)).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Write a record, replacing the previous one.
    pub async fn save(&self, record: &UploadRecord) -> AppResult<()> {
        let _guard = self.lock(&record.path).await;
        self.write(record).await
    }

    /// Read-modify-write a record under its key lock.
    ///
    /// The closure sees `None` if no record exists. Returning `None`
    /// deletes the record.
    pub async fn update<F>(&self, path: &str, f: F) -> AppResult<Option<UploadRecord>>
    where
        F: FnOnce(Option<UploadRecord>) -> Option<UploadRecord> + Send,
    {
        let _guard = self.lock(path).await;
        let current = self.load(path).await?;
        match f(current) {
            Some(record) => {
                self.write(&record).await?;
                Ok(Some(record))
            }
            None => {
                self.store.delete(&keys::upload_record(path)).await?;
                Ok(None)
            }
        }
    }

    /// Delete the record for a normalized path.
    pub async fn remove(&self, path: &str) -> AppResult<()> {
        let _guard = self.lock(path).await;
        debug!(path, "Removing upload record");
        self.store.delete(&keys::upload_record(path)).await
    }

    /// All stored records.
    pub async fn all(&self) -> AppResult<Vec<UploadRecord>> {
        let mut records = Vec::new();
        for key in self.store.keys(&keys::upload_record_prefix()).await? {
            if let Some(json) = self.store.get(&key).await? {
                records.push(serde_json::from_str(&json)?);
            }
        }
        Ok(records)
    }

    async fn write(&self, record: &UploadRecord) -> AppResult<()> {
        let json = serde_json::to_string(record)?;
        self.store.set(&keys::upload_record(&record.path), &json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use scenario_core::types::id::LayerId;
    use scenario_entity::upload::{LayerRole, PartDescriptor};

    fn store() -> LayerCacheStore {
        LayerCacheStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_normalize_path_uses_forward_slashes() {
        let normalized = normalize_path(Path::new("data\\layers\\a.tif"));
        assert!(!normalized.contains('\\'));
        assert!(normalized.ends_with("data/layers/a.tif"));
        assert!(Path::new(&normalized).is_absolute() || normalized.starts_with('/'));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = store();
        let record =
            UploadRecord::started("/data/a.tif", LayerRole::Pathway, LayerId::new(), "mp-1", 10);
        store.save(&record).await.unwrap();

        let loaded = store.load("/data/a.tif").await.unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(store.load("/data/b.tif").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_updates_do_not_lose_parts() {
        let store = store();
        let record =
            UploadRecord::started("/data/a.tif", LayerRole::Pathway, LayerId::new(), "mp-1", 10);
        store.save(&record).await.unwrap();

        let mut handles = Vec::new();
        for n in 1..=8u32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update("/data/a.tif", |r| {
                        r.map(|mut r| {
                            r.push_part(PartDescriptor {
                                part_number: n,
                                etag: format!("\"{n}\""),
                            });
                            r
                        })
                    })
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let loaded = store.load("/data/a.tif").await.unwrap().unwrap();
        assert_eq!(loaded.parts.len(), 8);
    }

    #[tokio::test]
    async fn test_update_returning_none_deletes() {
        let store = store();
        let record =
            UploadRecord::started("/data/a.tif", LayerRole::Mask, LayerId::new(), "mp-1", 10);
        store.save(&record).await.unwrap();

        store.update("/data/a.tif", |_| None).await.unwrap();
        assert!(store.load("/data/a.tif").await.unwrap().is_none());
        assert!(store.all().await.unwrap().is_empty());
    }
}
