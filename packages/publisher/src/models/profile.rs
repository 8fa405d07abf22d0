use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::profile;
use crate::error::AppError;

use super::shared::{double_option, validate_name, validate_slug};

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    #[schema(example = "SpiceTech")]
    pub name: String,
    #[schema(example = "spicetech")]
    pub slug: String,
    #[serde(default)]
    #[schema(example = "-Xmx6G")]
    pub jvm_args_default: String,
    #[serde(default)]
    pub game_args_default: String,
    pub java_runtime_key: Option<String>,
    pub java_runtime_sha256: Option<String>,
    pub java_runtime_content_type: Option<String>,
}

/// Partial update. Absent fields are left unchanged; runtime fields accept `null`.
#[derive(Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    /// Rejected with 409 once the profile has builds.
    pub slug: Option<String>,
    pub jvm_args_default: Option<String>,
    pub game_args_default: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub java_runtime_key: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub java_runtime_sha256: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub java_runtime_content_type: Option<Option<String>>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[schema(example = 1)]
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub jvm_args_default: String,
    pub game_args_default: String,
    pub latest_build_id: Option<i32>,
    #[schema(example = "manifests/spicetech/12.json")]
    pub latest_manifest_key: Option<String>,
    #[schema(example = "1.20.1-fabric-12")]
    pub latest_client_version: Option<String>,
    pub java_runtime_key: Option<String>,
    pub java_runtime_sha256: Option<String>,
    pub java_runtime_content_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<profile::Model> for ProfileResponse {
    fn from(m: profile::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            slug: m.slug,
            jvm_args_default: m.jvm_args_default,
            game_args_default: m.game_args_default,
            latest_build_id: m.latest_build_id,
            latest_manifest_key: m.latest_manifest_key,
            latest_client_version: m.latest_client_version,
            java_runtime_key: m.java_runtime_key,
            java_runtime_sha256: m.java_runtime_sha256,
            java_runtime_content_type: m.java_runtime_content_type,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

fn validate_runtime_sha256(sha256: Option<&str>) -> Result<(), AppError> {
    if let Some(hash) = sha256
        && (hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return Err(AppError::Validation(
            "javaRuntimeSha256 must be 64 hex characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_profile(req: &CreateProfileRequest) -> Result<(), AppError> {
    validate_name(&req.name)?;
    validate_slug(&req.slug)?;
    validate_runtime_sha256(req.java_runtime_sha256.as_deref())
}

pub fn validate_update_profile(req: &UpdateProfileRequest) -> Result<(), AppError> {
    if let Some(name) = &req.name {
        validate_name(name)?;
    }
    if let Some(slug) = &req.slug {
        validate_slug(slug)?;
    }
    validate_runtime_sha256(req.java_runtime_sha256.clone().flatten().as_deref())
}
