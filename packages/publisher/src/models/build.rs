use chrono::{DateTime, Utc};
use common::BuildStatus;
use serde::{Deserialize, Serialize};

use crate::entity::build;
use crate::pipeline::RebuildRequest;

use super::shared::Pagination;

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RebuildProfileRequest {
    #[schema(example = "fabric")]
    pub loader_type: String,
    #[schema(example = "1.20.1")]
    pub mc_version: String,
    /// Repoint every server of the profile to the new build.
    #[serde(default)]
    pub publish_to_servers: bool,
}

impl From<RebuildProfileRequest> for RebuildRequest {
    fn from(r: RebuildProfileRequest) -> Self {
        Self {
            loader_type: r.loader_type,
            mc_version: r.mc_version,
            publish_to_servers: r.publish_to_servers,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildResponse {
    #[schema(example = 12)]
    pub id: i32,
    pub profile_id: i32,
    pub loader_type: String,
    pub mc_version: String,
    pub status: BuildStatus,
    /// Present once the build completed.
    pub files_count: Option<i32>,
    pub manifest_key: Option<String>,
    pub client_version: Option<String>,
    /// Present once the build failed.
    pub error_message: Option<String>,
    /// Files that disappeared between scan and upload.
    pub skipped_files: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<build::Model> for BuildResponse {
    fn from(m: build::Model) -> Self {
        Self {
            id: m.id,
            profile_id: m.profile_id,
            loader_type: m.loader_type,
            mc_version: m.mc_version,
            status: m.status,
            files_count: m.files_count,
            manifest_key: m.manifest_key,
            client_version: m.client_version,
            error_message: m.error_message,
            skipped_files: m.skipped_files,
            created_at: m.created_at,
            started_at: m.started_at,
            finished_at: m.finished_at,
        }
    }
}

/// Query parameters for listing a profile's builds.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListBuildsParams {
    /// Filter by status (`Pending`, `Running`, `Completed`, `Failed`).
    #[param(example = "Completed")]
    pub status: Option<String>,
    /// Page number (1-indexed).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    #[param(example = 20)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct BuildListResponse {
    pub data: Vec<BuildResponse>,
    pub pagination: Pagination,
}
