use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::entity::preflight_run;

/// Outcome of a single preflight check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CheckResult {
    #[schema(example = "java-version")]
    pub name: String,
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Java 17 found")]
    pub message: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreatePreflightRunRequest {
    #[schema(example = "launcher-7f3a")]
    pub actor: String,
    /// Must not be empty.
    pub checks: Vec<CheckResult>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreflightRunResponse {
    #[schema(example = 1)]
    pub id: i32,
    pub actor: String,
    pub created_at: DateTime<Utc>,
    pub total_checks: i32,
    pub passed: i32,
    pub warnings: i32,
    pub failed: i32,
    /// Empty when the stored payload could not be read.
    pub checks: Vec<CheckResult>,
}

impl From<preflight_run::Model> for PreflightRunResponse {
    fn from(m: preflight_run::Model) -> Self {
        let checks = match serde_json::from_str::<Vec<CheckResult>>(&m.checks_json) {
            Ok(checks) => checks,
            Err(e) => {
                warn!(run_id = m.id, error = %e, "Stored preflight checks are unreadable");
                Vec::new()
            }
        };
        Self {
            id: m.id,
            actor: m.actor,
            created_at: m.created_at,
            total_checks: m.total_checks,
            passed: m.passed,
            warnings: m.warnings,
            failed: m.failed,
            checks,
        }
    }
}

/// Query parameters for listing preflight runs.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListPreflightRunsParams {
    /// Maximum number of runs (1-100, default 20).
    #[param(example = 20)]
    pub limit: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PreflightRunListResponse {
    pub data: Vec<PreflightRunResponse>,
}
