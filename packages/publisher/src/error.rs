use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;

use crate::ledger::LedgerError;
use crate::pipeline::RebuildError;
use crate::preflight::PreflightError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `NOT_FOUND`,
    /// `CONFLICT`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "loaderType must not be blank")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ProfileNotFound(_) | LedgerError::BuildNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            LedgerError::Conflict { .. } | LedgerError::InvalidTransition { .. } => {
                AppError::Conflict(err.to_string())
            }
            LedgerError::Db(e) => e.into(),
        }
    }
}

impl From<RebuildError> for AppError {
    fn from(err: RebuildError) -> Self {
        match err {
            RebuildError::Validation(msg) => AppError::Validation(msg),
            RebuildError::ProfileNotFound(_) => AppError::NotFound(err.to_string()),
            RebuildError::Conflict { .. } | RebuildError::InvalidTransition { .. } => {
                AppError::Conflict(err.to_string())
            }
            RebuildError::Persistence(e) => e.into(),
        }
    }
}

impl From<PreflightError> for AppError {
    fn from(err: PreflightError) -> Self {
        match err {
            PreflightError::EmptyChecks => AppError::Validation(err.to_string()),
            PreflightError::Encode(e) => AppError::Internal(e.to_string()),
            PreflightError::Db(e) => e.into(),
        }
    }
}
