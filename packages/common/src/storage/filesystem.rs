use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;

use super::error::StorageError;
use super::hash::ContentHash;
use super::traits::{
    ObjectMetadata, ObjectStore, ObjectSummary, UserMetadata, normalize_key, validate_key,
};

/// Filesystem-backed object store.
///
/// Object bodies live under `{base_path}/data/{key}` and metadata sidecars under
/// `{base_path}/meta/{key}.json`, both keyed by the lowercased object key.
/// Writes go through `{base_path}/.tmp` and are renamed into place.
pub struct FilesystemObjectStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemObjectStore {
    /// Create a new filesystem object store.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(base_path.join("data")).await?;
        fs::create_dir_all(base_path.join("meta")).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    fn data_path(&self, key: &str) -> PathBuf {
        self.base_path.join("data").join(normalize_key(key))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.base_path
            .join("meta")
            .join(format!("{}.json", normalize_key(key)))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    async fn write_atomic(&self, target: &Path, data: &[u8]) -> Result<(), StorageError> {
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, target).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn read_metadata(&self, key: &str) -> Result<Option<ObjectMetadata>, StorageError> {
        match fs::read(self.meta_path(key)).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|source| {
                StorageError::CorruptMetadata {
                    key: key.to_string(),
                    source,
                }
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Collect every metadata sidecar below the `meta` directory.
    async fn all_metadata_files(&self) -> Result<Vec<PathBuf>, StorageError> {
        let mut pending = vec![self.base_path.join("meta")];
        let mut files = Vec::new();

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    files.push(entry.path());
                }
            }
        }

        Ok(files)
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
        metadata: Option<&UserMetadata>,
    ) -> Result<ObjectMetadata, StorageError> {
        validate_key(key)?;

        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let meta = ObjectMetadata {
            key: key.to_string(),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            content_hash: ContentHash::compute(data),
            modified_at: Utc::now(),
            user: metadata.cloned().unwrap_or_default(),
        };
        let meta_bytes = serde_json::to_vec(&meta).map_err(|source| {
            StorageError::CorruptMetadata {
                key: key.to_string(),
                source,
            }
        })?;

        // Body first: a sidecar never points at bytes that are not there yet.
        self.write_atomic(&self.data_path(key), data).await?;
        self.write_atomic(&self.meta_path(key), &meta_bytes).await?;

        Ok(meta)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;
        if self.read_metadata(key).await?.is_none() {
            return Ok(None);
        }
        match fs::read(self.data_path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<ObjectMetadata>, StorageError> {
        validate_key(key)?;
        self.read_metadata(key).await
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        let prefix = normalize_key(prefix);
        let mut items = Vec::new();

        for path in self.all_metadata_files().await? {
            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let meta: ObjectMetadata = match serde_json::from_slice(&bytes) {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable object metadata");
                    continue;
                }
            };
            if normalize_key(&meta.key).starts_with(&prefix) {
                items.push(ObjectSummary {
                    key: meta.key,
                    size: meta.size,
                    modified_at: meta.modified_at,
                });
            }
        }

        items.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(items)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let existed = match fs::remove_file(self.meta_path(key)).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        match fs::remove_file(self.data_path(key)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(existed)
    }
}
