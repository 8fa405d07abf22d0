use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{build, profile};
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::profile::*;
use crate::state::AppState;

async fn find_profile<C: ConnectionTrait>(conn: &C, id: i32) -> Result<profile::Model, AppError> {
    profile::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {id} not found")))
}

fn slug_conflict(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Slug is already in use".into())
        }
        _ => AppError::from(e),
    }
}

#[utoipa::path(
    post,
    path = "/profiles",
    tag = "Profiles",
    operation_id = "createProfile",
    summary = "Create a profile",
    request_body = CreateProfileRequest,
    responses(
        (status = 201, description = "Profile created", body = ProfileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Slug already in use (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(slug = %payload.slug))]
pub async fn create_profile(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_profile(&payload)?;

    let now = chrono::Utc::now();
    let model = profile::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        slug: Set(payload.slug),
        jvm_args_default: Set(payload.jvm_args_default),
        game_args_default: Set(payload.game_args_default),
        java_runtime_key: Set(payload.java_runtime_key),
        java_runtime_sha256: Set(payload.java_runtime_sha256.map(|h| h.to_lowercase())),
        java_runtime_content_type: Set(payload.java_runtime_content_type),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(slug_conflict)?;

    info!(profile_id = model.id, "Profile created");

    Ok((StatusCode::CREATED, Json(ProfileResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/profiles/{id}",
    tag = "Profiles",
    operation_id = "getProfile",
    summary = "Get a profile",
    params(("id" = i32, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 404, description = "Profile not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProfileResponse>, AppError> {
    let model = find_profile(&state.db, id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/profiles/{id}",
    tag = "Profiles",
    operation_id = "updateProfile",
    summary = "Update a profile",
    description = "Updates name, argument defaults and the bundled runtime reference. The slug can only change while the profile has no builds.",
    params(("id" = i32, Path, description = "Profile ID")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Profile not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Slug is fixed or taken (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    validate_update_profile(&payload)?;

    let txn = state.db.begin().await?;
    // Locked so a concurrent rebuild cannot start between the build count and the slug write.
    let existing = profile::Entity::find_by_id_for_update(ConnectionTrait::get_database_backend(&txn), id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {id} not found")))?;

    let mut active: profile::ActiveModel = existing.clone().into();

    if let Some(slug) = payload.slug
        && slug != existing.slug
    {
        let has_builds = build::Entity::find()
            .filter(build::Column::ProfileId.eq(id))
            .count(&txn)
            .await?
            > 0;
        if has_builds {
            return Err(AppError::Conflict(
                "Slug cannot change once the profile has builds".into(),
            ));
        }
        active.slug = Set(slug);
    }
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(jvm_args) = payload.jvm_args_default {
        active.jvm_args_default = Set(jvm_args);
    }
    if let Some(game_args) = payload.game_args_default {
        active.game_args_default = Set(game_args);
    }
    if let Some(key) = payload.java_runtime_key {
        active.java_runtime_key = Set(key);
    }
    if let Some(sha256) = payload.java_runtime_sha256 {
        active.java_runtime_sha256 = Set(sha256.map(|h| h.to_lowercase()));
    }
    if let Some(content_type) = payload.java_runtime_content_type {
        active.java_runtime_content_type = Set(content_type);
    }
    active.updated_at = Set(chrono::Utc::now());

    let updated = active.update(&txn).await.map_err(slug_conflict)?;
    txn.commit().await?;

    Ok(Json(updated.into()))
}
