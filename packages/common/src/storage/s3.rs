use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use s3::creds::Credentials;
use s3::{Bucket, Region};

use super::error::StorageError;
use super::hash::ContentHash;
use super::traits::{
    ObjectMetadata, ObjectStore, ObjectSummary, UserMetadata, normalize_key, validate_key,
};

/// Name of the user-metadata entry that carries the SHA-256 of the body.
const HASH_METADATA_KEY: &str = "sha256";

/// Connection settings for an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub path_style: bool,
}

/// Object store backed by an S3-compatible bucket.
///
/// Keys are lowercased before they reach the bucket so that lookups are
/// case-insensitive; the original key is kept in the object's metadata.
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
}

fn backend(err: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn parse_modified(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| {
        DateTime::parse_from_rfc2822(s)
            .or_else(|_| DateTime::parse_from_rfc3339(s))
            .ok()
    })
    .map(|dt| dt.with_timezone(&Utc))
    .unwrap_or_else(Utc::now)
}

impl S3ObjectStore {
    pub fn new(settings: &S3Settings) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: settings.region.clone(),
            endpoint: settings.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&settings.access_key),
            Some(&settings.secret_key),
            None,
            None,
            None,
        )
        .map_err(backend)?;

        let mut bucket = Bucket::new(&settings.bucket, region, credentials).map_err(backend)?;
        if settings.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
        metadata: Option<&UserMetadata>,
    ) -> Result<ObjectMetadata, StorageError> {
        validate_key(key)?;
        let hash = ContentHash::compute(data);
        let user = metadata.cloned().unwrap_or_default();

        let mut request = self
            .bucket
            .put_object_builder(normalize_key(key), data)
            .with_content_type(content_type)
            .with_metadata(HASH_METADATA_KEY, hash.to_hex())
            .map_err(backend)?
            .with_metadata("original-key", key)
            .map_err(backend)?;
        for (name, value) in &user {
            request = request.with_metadata(name, value).map_err(backend)?;
        }

        let response = request.execute().await.map_err(backend)?;
        if !(200..300).contains(&response.status_code()) {
            return Err(StorageError::Backend(format!(
                "upload of '{key}' returned HTTP {}",
                response.status_code()
            )));
        }

        Ok(ObjectMetadata {
            key: key.to_string(),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            content_hash: hash,
            modified_at: Utc::now(),
            user,
        })
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;
        let response = self
            .bucket
            .get_object(normalize_key(key))
            .await
            .map_err(backend)?;
        match response.status_code() {
            200 => Ok(Some(response.bytes().to_vec())),
            404 => Ok(None),
            code => Err(StorageError::Backend(format!(
                "get of '{key}' returned HTTP {code}"
            ))),
        }
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<ObjectMetadata>, StorageError> {
        validate_key(key)?;
        let (head, code) = self
            .bucket
            .head_object(normalize_key(key))
            .await
            .map_err(backend)?;
        if code == 404 {
            return Ok(None);
        }
        if !(200..300).contains(&code) {
            return Err(StorageError::Backend(format!(
                "head of '{key}' returned HTTP {code}"
            )));
        }

        let mut user: HashMap<String, String> = head.metadata.unwrap_or_default();
        let hash = user
            .remove(HASH_METADATA_KEY)
            .ok_or_else(|| StorageError::InvalidHash(format!("'{key}' has no sha256 metadata")))?;
        let original_key = user.remove("original-key").unwrap_or_else(|| key.to_string());

        Ok(Some(ObjectMetadata {
            key: original_key,
            size: head.content_length.unwrap_or_default().max(0) as u64,
            content_type: head
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            content_hash: ContentHash::from_hex(&hash)?,
            modified_at: parse_modified(head.last_modified.as_deref()),
            user: user.into_iter().collect(),
        }))
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        let pages = self
            .bucket
            .list(normalize_key(prefix), None)
            .await
            .map_err(backend)?;

        let mut items: Vec<ObjectSummary> = pages
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|object| ObjectSummary {
                modified_at: parse_modified(Some(&object.last_modified)),
                key: object.key,
                size: object.size,
            })
            .collect();
        items.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(items)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        if !self.exists(key).await? {
            return Ok(false);
        }
        let response = self
            .bucket
            .delete_object(normalize_key(key))
            .await
            .map_err(backend)?;
        Ok((200..300).contains(&response.status_code()))
    }
}
