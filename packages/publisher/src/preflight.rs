//! Recorded preflight check-lists, kept as a capped log.

use chrono::Utc;
use sea_orm::{Condition, ConnectionTrait, DbErr, Set, TransactionTrait};
use thiserror::Error;
use tracing::info;

use crate::entity::preflight_run;
use crate::history::{append_capped, newest};
use crate::models::preflight::{CheckResult, CheckStatus};

pub const DEFAULT_LIST_LIMIT: u64 = 20;
pub const MAX_LIST_LIMIT: u64 = 100;

#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("checks must not be empty")]
    EmptyChecks,

    #[error("failed to encode checks: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Db(#[from] DbErr),
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Tally {
    passed: i32,
    warnings: i32,
    failed: i32,
}

fn tally(checks: &[CheckResult]) -> Tally {
    checks.iter().fold(Tally::default(), |mut t, check| {
        match check.status {
            CheckStatus::Pass => t.passed += 1,
            CheckStatus::Warn => t.warnings += 1,
            CheckStatus::Fail => t.failed += 1,
        }
        t
    })
}

/// Store a run and trim the table to `history_max` rows.
pub async fn record_run<C>(
    conn: &C,
    actor: &str,
    checks: &[CheckResult],
    history_max: u64,
) -> Result<preflight_run::Model, PreflightError>
where
    C: ConnectionTrait + TransactionTrait,
{
    if checks.is_empty() {
        return Err(PreflightError::EmptyChecks);
    }

    let counts = tally(checks);
    let record = preflight_run::ActiveModel {
        actor: Set(actor.to_string()),
        checks_json: Set(serde_json::to_string(checks)?),
        total_checks: Set(checks.len() as i32),
        passed: Set(counts.passed),
        warnings: Set(counts.warnings),
        failed: Set(counts.failed),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let run = append_capped(conn, record, history_max, Condition::all()).await?;

    info!(
        run_id = run.id,
        actor,
        passed = run.passed,
        warnings = run.warnings,
        failed = run.failed,
        "Preflight run recorded"
    );

    Ok(run)
}

/// Most recent runs first. `limit` is clamped to 1..=100, default 20.
pub async fn recent_runs<C: ConnectionTrait>(
    conn: &C,
    limit: Option<u64>,
) -> Result<Vec<preflight_run::Model>, DbErr> {
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    newest::<preflight_run::Entity, _>(conn, Condition::all(), limit).await
}
