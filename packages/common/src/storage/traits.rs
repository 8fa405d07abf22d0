use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::StorageError;
use super::hash::ContentHash;

/// Free-form user metadata attached to an object at upload time.
pub type UserMetadata = BTreeMap<String, String>;

/// Metadata describing a stored object, readable without fetching its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// The key as it was written.
    pub key: String,
    pub size: u64,
    pub content_type: String,
    pub content_hash: ContentHash,
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub user: UserMetadata,
}

/// One entry of a prefix listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
}

/// Key/value blob storage addressed by string keys.
///
/// Keys compare case-insensitively. Uploading to an existing key replaces it,
/// including the spelling reported in metadata and listings.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under `key` and return the resulting metadata.
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
        metadata: Option<&UserMetadata>,
    ) -> Result<ObjectMetadata, StorageError>;

    /// Fetch an object's bytes, or `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Fetch an object's metadata without its body.
    async fn get_metadata(&self, key: &str) -> Result<Option<ObjectMetadata>, StorageError>;

    /// List objects whose key starts with `prefix`, ordered by key.
    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError>;

    /// Delete an object. Returns `false` if it did not exist.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get_metadata(key).await?.is_some())
    }
}

/// Check that a key is usable by every backend.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = |reason| {
        Err(StorageError::InvalidKey {
            key: key.to_string(),
            reason,
        })
    };

    if key.trim().is_empty() {
        return invalid("key is empty");
    }
    if key.starts_with('/') {
        return invalid("key must not start with '/'");
    }
    if key.contains('\\') || key.contains('\0') {
        return invalid("key contains a backslash or null byte");
    }
    if key.split('/').any(|segment| segment == ".." || segment == ".") {
        return invalid("key contains a relative path segment");
    }
    if key.split('/').any(str::is_empty) {
        return invalid("key contains an empty path segment");
    }
    Ok(())
}

/// Canonical form used to compare keys.
pub fn normalize_key(key: &str) -> String {
    key.to_lowercase()
}
