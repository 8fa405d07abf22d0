use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::ContentHash;

/// Content type used for serialized manifests.
pub const MANIFEST_CONTENT_TYPE: &str = "application/json";

/// Key of the mutable pointer manifest read by installers.
pub fn latest_manifest_key(slug: &str) -> String {
    format!("manifests/{slug}/latest.json")
}

/// Key of the immutable manifest written for one build.
pub fn build_manifest_key(slug: &str, build_id: i32) -> String {
    format!("manifests/{slug}/{build_id}.json")
}

/// Key under which a packaged file's bytes are stored.
pub fn file_object_key(slug: &str, build_id: i32, relative_path: &str) -> String {
    format!("profiles/{slug}/builds/{build_id}/files/{relative_path}")
}

/// A single file entry of a published distribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFile {
    /// Path relative to the profile root, `/`-separated.
    #[schema(example = "mods/fabric-api.jar")]
    pub path: String,
    /// Lowercase hex SHA-256 of the uploaded bytes.
    #[schema(value_type = String)]
    pub sha256: ContentHash,
    pub size: u64,
    /// Object-store key holding the file content.
    #[serde(rename = "s3Key")]
    pub s3_key: String,
}

/// The installer-facing description of a build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub profile_slug: String,
    pub build_id: i32,
    pub loader_type: String,
    pub mc_version: String,
    pub client_version: String,
    pub created_at_utc: DateTime<Utc>,
    pub jvm_args_default: String,
    pub game_args_default: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_runtime_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_runtime_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_runtime_content_type: Option<String>,
    pub files: Vec<ManifestFile>,
}

impl Manifest {
    /// Serialize to the bytes stored in the object store.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}
