use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use common::manifest::{
    MANIFEST_CONTENT_TYPE, build_manifest_key, file_object_key, latest_manifest_key,
};
use common::storage::{ContentHash, ObjectStore, StorageError, UserMetadata};
use common::{BuildStatus, ManifestFile};
use futures::StreamExt;
use futures::stream;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use thiserror::Error;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::PublisherConfig;
use crate::entity::{build, profile};
use crate::ledger::{BuildLedger, CompletedBuild, LedgerError};

use super::manifest::{assemble_manifest, client_version_label};
use super::scanner::{ScanEntry, ScanError, scan_profile};

/// Files above this size are hashed on the blocking pool.
const BLOCKING_HASH_THRESHOLD: usize = 1024 * 1024;

/// Parameters of one rebuild.
#[derive(Debug, Clone)]
pub struct RebuildRequest {
    pub loader_type: String,
    pub mc_version: String,
    /// Repoint every server of the profile to the new build on success.
    pub publish_to_servers: bool,
}

impl RebuildRequest {
    /// Loader and version name overlay directories, so they must be plain names.
    pub fn validate(&self) -> Result<(), RebuildError> {
        for (field, value) in [
            ("loaderType", &self.loader_type),
            ("mcVersion", &self.mc_version),
        ] {
            if value.trim().is_empty() {
                return Err(RebuildError::Validation(format!("{field} must not be blank")));
            }
            if value.contains(['/', '\\', '\0']) || value.contains("..") {
                return Err(RebuildError::Validation(format!(
                    "{field} must not contain path separators or '..'"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum RebuildError {
    #[error("{0}")]
    Validation(String),

    #[error("profile {0} not found")]
    ProfileNotFound(i32),

    #[error("profile {profile_id} already has a running build")]
    Conflict {
        profile_id: i32,
        running_build_id: Option<i32>,
    },

    #[error("build {build_id} is no longer running")]
    InvalidTransition { build_id: i32 },

    /// The database failed; the build may not reflect what happened.
    #[error("database error: {0}")]
    Persistence(#[from] DbErr),
}

impl From<LedgerError> for RebuildError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::ProfileNotFound(id) => Self::ProfileNotFound(id),
            LedgerError::BuildNotFound(build_id) => Self::InvalidTransition { build_id },
            LedgerError::Conflict {
                profile_id,
                running_build_id,
            } => Self::Conflict {
                profile_id,
                running_build_id,
            },
            LedgerError::InvalidTransition { build_id, .. } => {
                Self::InvalidTransition { build_id }
            }
            LedgerError::Db(e) => Self::Persistence(e),
        }
    }
}

/// Reasons a build ends up `Failed`. The message is stored on the build row.
#[derive(Debug, Error)]
enum PublishFailure {
    #[error("build cancelled")]
    Cancelled,

    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to upload {key}: {source}")]
    Storage {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Task(#[from] JoinError),

    /// Something else finished the build while it was uploading.
    #[error("build left Running before its manifest was published")]
    NoLongerRunning,

    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

struct Published {
    files_count: i32,
    skipped_files: i32,
    manifest_key: String,
    client_version: String,
}

/// Scans, uploads and records profile builds.
pub struct ArtifactPublisher {
    db: DatabaseConnection,
    store: Arc<dyn ObjectStore>,
    config: PublisherConfig,
}

impl ArtifactPublisher {
    pub fn new(db: DatabaseConnection, store: Arc<dyn ObjectStore>, config: PublisherConfig) -> Self {
        Self { db, store, config }
    }

    /// Build and publish a profile from its source tree.
    ///
    /// Returns the build row in its final state. Storage failures and
    /// cancellation yield a `Failed` build, not an error; the profile's
    /// pointers and `latest.json` only move when the build completes.
    #[instrument(skip(self, request, cancel), fields(loader_type = %request.loader_type, mc_version = %request.mc_version))]
    pub async fn rebuild_profile(
        &self,
        profile_id: i32,
        request: RebuildRequest,
        cancel: CancellationToken,
    ) -> Result<build::Model, RebuildError> {
        request.validate()?;

        let profile = profile::Entity::find_by_id(profile_id)
            .one(&self.db)
            .await?
            .ok_or(RebuildError::ProfileNotFound(profile_id))?;

        let ledger = BuildLedger::new(&self.db);
        let build = ledger
            .begin_build(
                profile.id,
                &request.loader_type,
                &request.mc_version,
                self.config.build_history_max,
            )
            .await?;

        let published = match self.publish(&profile, &build, &cancel).await {
            Ok(published) => published,
            Err(PublishFailure::NoLongerRunning) => {
                warn!(build_id = build.id, "Build was finished elsewhere; manifest not published");
                return ledger
                    .get_build(build.id)
                    .await?
                    .ok_or(RebuildError::InvalidTransition { build_id: build.id });
            }
            Err(failure) => {
                let message = truncate_message(&failure.to_string(), self.config.max_error_message_len);
                return match ledger.fail_build(build.id, &message).await {
                    Ok(failed) => Ok(failed),
                    Err(LedgerError::InvalidTransition { .. }) => ledger
                        .get_build(build.id)
                        .await?
                        .ok_or(RebuildError::InvalidTransition { build_id: build.id }),
                    Err(e) => Err(e.into()),
                };
            }
        };

        if published.skipped_files > 0 {
            warn!(
                build_id = build.id,
                skipped = published.skipped_files,
                "Files disappeared before they could be read"
            );
        }

        let outcome = CompletedBuild {
            files_count: published.files_count,
            manifest_key: published.manifest_key,
            client_version: published.client_version,
            skipped_files: published.skipped_files,
        };

        match ledger
            .complete_build(build.id, outcome, request.publish_to_servers)
            .await
        {
            Ok(completed) => Ok(completed),
            Err(LedgerError::Db(e)) => {
                error!(build_id = build.id, error = %e, "Failed to record completed build");
                let message = truncate_message(
                    &format!("failed to record build: {e}"),
                    self.config.max_error_message_len,
                );
                if let Err(mark_err) = ledger.fail_build(build.id, &message).await {
                    warn!(build_id = build.id, error = %mark_err, "Could not mark build as failed");
                }
                Err(RebuildError::Persistence(e))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn publish(
        &self,
        profile: &profile::Model,
        build: &build::Model,
        cancel: &CancellationToken,
    ) -> Result<Published, PublishFailure> {
        let entries = {
            let source_root = self.config.source_root.clone();
            let slug = profile.slug.clone();
            let loader_type = build.loader_type.clone();
            let mc_version = build.mc_version.clone();
            let scan = tokio::task::spawn_blocking(move || {
                scan_profile(&source_root, &slug, &loader_type, &mc_version)
            });
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PublishFailure::Cancelled),
                scanned = scan => scanned??,
            }
        };

        debug!(build_id = build.id, entries = entries.len(), "Scan finished");

        let mut uploads = stream::iter(entries)
            .map(|entry| self.publish_file(&profile.slug, build.id, entry))
            .buffered(self.config.upload_concurrency.max(1));

        let mut files = Vec::new();
        let mut skipped_files = 0;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PublishFailure::Cancelled),
                next = uploads.next() => next,
            };
            match next {
                None => break,
                Some(Ok(Some(file))) => files.push(file),
                Some(Ok(None)) => skipped_files += 1,
                Some(Err(failure)) => return Err(failure),
            }
        }
        drop(uploads);

        let files_count = files.len() as i32;
        let manifest = assemble_manifest(profile, build, files, Utc::now());
        let bytes = manifest.to_json_bytes()?;

        if cancel.is_cancelled() {
            return Err(PublishFailure::Cancelled);
        }
        let current = BuildLedger::new(&self.db).get_build(build.id).await?;
        if current.map(|b| b.status) != Some(BuildStatus::Running) {
            return Err(PublishFailure::NoLongerRunning);
        }

        let manifest_key = build_manifest_key(&profile.slug, build.id);
        self.upload(&manifest_key, &bytes, MANIFEST_CONTENT_TYPE, None)
            .await?;
        self.upload(
            &latest_manifest_key(&profile.slug),
            &bytes,
            MANIFEST_CONTENT_TYPE,
            None,
        )
        .await?;

        info!(
            build_id = build.id,
            files = files_count,
            bytes = manifest.total_size(),
            "Manifest published"
        );

        Ok(Published {
            files_count,
            skipped_files,
            manifest_key,
            client_version: client_version_label(&build.mc_version, &build.loader_type, build.id),
        })
    }

    /// Hash and upload one file. `Ok(None)` means it vanished after the scan.
    async fn publish_file(
        &self,
        slug: &str,
        build_id: i32,
        entry: ScanEntry,
    ) -> Result<Option<ManifestFile>, PublishFailure> {
        let data = match tokio::fs::read(&entry.absolute_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %entry.relative_path, "Skipping vanished file");
                return Ok(None);
            }
            Err(source) => {
                return Err(PublishFailure::Read {
                    path: entry.absolute_path,
                    source,
                });
            }
        };

        let (sha256, data) = if data.len() > BLOCKING_HASH_THRESHOLD {
            tokio::task::spawn_blocking(move || (ContentHash::compute(&data), data)).await?
        } else {
            (ContentHash::compute(&data), data)
        };

        let key = file_object_key(slug, build_id, &entry.relative_path);
        let content_type = mime_guess::from_path(&entry.relative_path)
            .first_or_octet_stream()
            .to_string();
        let metadata = UserMetadata::from([("sha256".to_string(), sha256.to_hex())]);

        self.upload(&key, &data, &content_type, Some(&metadata))
            .await?;

        Ok(Some(ManifestFile {
            path: entry.relative_path,
            sha256,
            size: data.len() as u64,
            s3_key: key,
        }))
    }

    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
        metadata: Option<&UserMetadata>,
    ) -> Result<(), PublishFailure> {
        self.store
            .upload(key, data, content_type, metadata)
            .await
            .map(|_| ())
            .map_err(|source| PublishFailure::Storage {
                key: key.to_string(),
                source,
            })
    }
}

fn truncate_message(message: &str, max_chars: usize) -> String {
    message.chars().take(max_chars).collect()
}
