use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::BuildStatus;
use sea_orm::EntityTrait;
use tracing::{Instrument, info, instrument};

use crate::entity::profile;
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::ledger::BuildLedger;
use crate::models::build::*;
use crate::models::shared::{Pagination, page_bounds};
use crate::pipeline::RebuildRequest;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/profiles/{id}/rebuild",
    tag = "Builds",
    operation_id = "rebuildProfile",
    summary = "Build and publish a profile",
    description = "Scans the profile's source tree, uploads its files and publishes a new manifest. Storage failures produce a build with status `Failed`; the previous manifest stays published.",
    params(("id" = i32, Path, description = "Profile ID")),
    request_body = RebuildProfileRequest,
    responses(
        (status = 201, description = "Build finished (Completed or Failed)", body = BuildResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Profile not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "A build of this profile is running (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn rebuild_profile(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<RebuildProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Detached so a dropped connection cannot abandon a build mid-publish;
    // only process shutdown cancels it.
    let publisher = state.publisher.clone();
    let cancel = state.shutdown.child_token();
    let request: RebuildRequest = payload.into();
    let build = tokio::spawn(
        async move { publisher.rebuild_profile(id, request, cancel).await }.in_current_span(),
    )
    .await
    .map_err(|e| AppError::Internal(format!("rebuild task failed: {e}")))??;

    info!(build_id = build.id, status = %build.status, "Rebuild finished");

    Ok((StatusCode::CREATED, Json(BuildResponse::from(build))))
}

#[utoipa::path(
    get,
    path = "/profiles/{id}/builds",
    tag = "Builds",
    operation_id = "listBuilds",
    summary = "List a profile's builds",
    description = "Newest first. Only retained builds are listed.",
    params(("id" = i32, Path, description = "Profile ID"), ListBuildsParams),
    responses(
        (status = 200, description = "Builds", body = BuildListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Profile not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_builds(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(params): Query<ListBuildsParams>,
) -> Result<Json<BuildListResponse>, AppError> {
    let status = params
        .status
        .map(|s| s.parse::<BuildStatus>())
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let (page, per_page) = page_bounds(params.page, params.per_page);

    if profile::Entity::find_by_id(id).one(&state.db).await?.is_none() {
        return Err(AppError::NotFound(format!("Profile {id} not found")));
    }

    let (builds, total) = BuildLedger::new(&state.db)
        .list_builds(id, status, page, per_page)
        .await?;

    Ok(Json(BuildListResponse {
        data: builds.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/profiles/{id}/builds/latest",
    tag = "Builds",
    operation_id = "getLatestBuild",
    summary = "Get the build a profile currently publishes",
    params(("id" = i32, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Latest completed build", body = BuildResponse),
        (status = 404, description = "Unknown profile or nothing published yet (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn latest_build(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<BuildResponse>, AppError> {
    let build = BuildLedger::new(&state.db)
        .latest_build_for_profile(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {id} has no published build")))?;
    Ok(Json(build.into()))
}

#[utoipa::path(
    get,
    path = "/builds/{id}",
    tag = "Builds",
    operation_id = "getBuild",
    summary = "Get a build",
    params(("id" = i32, Path, description = "Build ID")),
    responses(
        (status = 200, description = "Build", body = BuildResponse),
        (status = 404, description = "Build not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_build(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<BuildResponse>, AppError> {
    let build = BuildLedger::new(&state.db)
        .get_build(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Build {id} not found")))?;
    Ok(Json(build.into()))
}
