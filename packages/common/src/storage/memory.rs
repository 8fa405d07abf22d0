use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::error::StorageError;
use super::hash::ContentHash;
use super::traits::{
    ObjectMetadata, ObjectStore, ObjectSummary, UserMetadata, normalize_key, validate_key,
};

struct StoredObject {
    data: Vec<u8>,
    metadata: ObjectMetadata,
}

/// Process-local object store. Contents vanish with the process.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, StoredObject>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .map(|entry| entry.value().metadata.key.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
        metadata: Option<&UserMetadata>,
    ) -> Result<ObjectMetadata, StorageError> {
        validate_key(key)?;

        let meta = ObjectMetadata {
            key: key.to_string(),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            content_hash: ContentHash::compute(data),
            modified_at: Utc::now(),
            user: metadata.cloned().unwrap_or_default(),
        };

        self.objects.insert(
            normalize_key(key),
            StoredObject {
                data: data.to_vec(),
                metadata: meta.clone(),
            },
        );

        Ok(meta)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .objects
            .get(&normalize_key(key))
            .map(|entry| entry.data.clone()))
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<ObjectMetadata>, StorageError> {
        Ok(self
            .objects
            .get(&normalize_key(key))
            .map(|entry| entry.metadata.clone()))
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        let prefix = normalize_key(prefix);
        let mut items: Vec<ObjectSummary> = self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| ObjectSummary {
                key: entry.metadata.key.clone(),
                size: entry.metadata.size,
                modified_at: entry.metadata.modified_at,
            })
            .collect();
        items.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(items)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.remove(&normalize_key(key)).is_some())
    }
}
