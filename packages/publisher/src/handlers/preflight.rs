use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::preflight::*;
use crate::preflight::{recent_runs, record_run};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/preflight-runs",
    tag = "Preflight",
    operation_id = "createPreflightRun",
    summary = "Record a preflight run",
    description = "Stores the run and drops the oldest runs beyond the retention limit.",
    request_body = CreatePreflightRunRequest,
    responses(
        (status = 201, description = "Run recorded", body = PreflightRunResponse),
        (status = 400, description = "Empty check list (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(actor = %payload.actor, checks = payload.checks.len()))]
pub async fn create_preflight_run(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreatePreflightRunRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.actor.trim().is_empty() {
        return Err(AppError::Validation("actor must not be blank".into()));
    }

    let run = record_run(
        &state.db,
        payload.actor.trim(),
        &payload.checks,
        state.config.preflight.history_max,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(PreflightRunResponse::from(run))))
}

#[utoipa::path(
    get,
    path = "/preflight-runs",
    tag = "Preflight",
    operation_id = "listPreflightRuns",
    summary = "List recent preflight runs",
    params(ListPreflightRunsParams),
    responses(
        (status = 200, description = "Runs, newest first", body = PreflightRunListResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn list_preflight_runs(
    State(state): State<AppState>,
    Query(params): Query<ListPreflightRunsParams>,
) -> Result<Json<PreflightRunListResponse>, AppError> {
    let runs = recent_runs(&state.db, params.limit).await?;
    Ok(Json(PreflightRunListResponse {
        data: runs.into_iter().map(Into::into).collect(),
    }))
}
