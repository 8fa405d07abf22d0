use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use common::manifest::{MANIFEST_CONTENT_TYPE, latest_manifest_key};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::models::shared::validate_slug;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/manifests/{slug}/latest",
    tag = "Manifests",
    operation_id = "getLatestManifest",
    summary = "Get a profile's published manifest",
    description = "Returns the stored `latest.json` document byte for byte.",
    params(("slug" = String, Path, description = "Profile slug")),
    responses(
        (status = 200, description = "Manifest", body = common::Manifest),
        (status = 400, description = "Malformed slug (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Nothing published (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn latest_manifest(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    validate_slug(&slug)?;

    let bytes = state
        .store
        .get(&latest_manifest_key(&slug))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("No manifest published for '{slug}'")))?;

    Ok(([(header::CONTENT_TYPE, MANIFEST_CONTENT_TYPE)], bytes))
}
