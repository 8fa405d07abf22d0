use chrono::{DateTime, Utc};
use common::BuildStatus;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionSession, TransactionTrait,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::entity::{build, profile, server};
use crate::history::append_capped;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("profile {0} not found")]
    ProfileNotFound(i32),

    #[error("build {0} not found")]
    BuildNotFound(i32),

    /// Another build of the same profile is still running.
    #[error("profile {profile_id} already has a running build")]
    Conflict {
        profile_id: i32,
        running_build_id: Option<i32>,
    },

    /// The build already left `Running`.
    #[error("build {build_id} is {status}, expected Running")]
    InvalidTransition { build_id: i32, status: BuildStatus },

    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Outcome fields recorded when a build completes.
#[derive(Debug, Clone)]
pub struct CompletedBuild {
    pub files_count: i32,
    pub manifest_key: String,
    pub client_version: String,
    pub skipped_files: i32,
}

pub struct BuildLedger<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait + TransactionTrait> BuildLedger<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Record a new `Running` build for a profile.
    ///
    /// Fails with [`LedgerError::Conflict`] while another build of the profile is
    /// running. The profile's history is trimmed to `history_max` builds. The
    /// published build and builds referenced by servers are kept and count
    /// towards that limit; the new build is always kept on top of them, so a
    /// limit smaller than the pinned set plus one is exceeded.
    pub async fn begin_build(
        &self,
        profile_id: i32,
        loader_type: &str,
        mc_version: &str,
        history_max: u64,
    ) -> Result<build::Model, LedgerError> {
        let txn = self.conn.begin().await?;

        let Some(profile) =
            profile::Entity::find_by_id_for_update(txn.get_database_backend(), profile_id)
                .one(&txn)
                .await?
        else {
            txn.rollback().await?;
            return Err(LedgerError::ProfileNotFound(profile_id));
        };

        let running = build::Entity::find()
            .filter(build::Column::ProfileId.eq(profile_id))
            .filter(build::Column::Status.eq(BuildStatus::Running))
            .one(&txn)
            .await?;

        if let Some(running) = running {
            txn.rollback().await?;
            return Err(LedgerError::Conflict {
                profile_id,
                running_build_id: Some(running.id),
            });
        }

        let now = Utc::now();
        let model = build::ActiveModel {
            profile_id: Set(profile_id),
            loader_type: Set(loader_type.to_string()),
            mc_version: Set(mc_version.to_string()),
            status: Set(BuildStatus::Running),
            files_count: Set(None),
            manifest_key: Set(None),
            client_version: Set(None),
            error_message: Set(None),
            skipped_files: Set(0),
            created_at: Set(now),
            started_at: Set(Some(now)),
            finished_at: Set(None),
            ..Default::default()
        };

        // The published build and the builds servers distribute are never
        // evicted, but they count against the cap.
        let mut candidates: Vec<i32> = server::Entity::find()
            .select_only()
            .column(server::Column::BuildId)
            .filter(server::Column::ProfileId.eq(profile_id))
            .filter(server::Column::BuildId.is_not_null())
            .into_tuple::<Option<i32>>()
            .all(&txn)
            .await?
            .into_iter()
            .flatten()
            .collect();
        candidates.extend(profile.latest_build_id);

        let pinned: Vec<i32> = if candidates.is_empty() {
            Vec::new()
        } else {
            build::Entity::find()
                .select_only()
                .column(build::Column::Id)
                .filter(build::Column::ProfileId.eq(profile_id))
                .filter(build::Column::Id.is_in(candidates))
                .into_tuple()
                .all(&txn)
                .await?
        };

        let cap = history_max.saturating_sub(pinned.len() as u64);
        let scope = Condition::all()
            .add(build::Column::ProfileId.eq(profile_id))
            .add(build::Column::Id.is_not_in(pinned));

        // TODO: delete the object-store prefixes of evicted builds once a cleanup job exists.
        let inserted = match append_capped(&txn, model, cap, scope).await {
            Ok(inserted) => inserted,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                txn.rollback().await?;
                return Err(LedgerError::Conflict {
                    profile_id,
                    running_build_id: None,
                });
            }
            Err(e) => return Err(e.into()),
        };

        txn.commit().await?;

        info!(
            build_id = inserted.id,
            profile_id, loader_type, mc_version, "Build started"
        );

        Ok(inserted)
    }

    /// Move a running build to `Completed` and publish it.
    ///
    /// In one transaction: the build row gets its outcome, the profile's latest
    /// pointers move to it, and, when `publish_to_servers` is set, every server
    /// of the profile is repointed.
    pub async fn complete_build(
        &self,
        build_id: i32,
        outcome: CompletedBuild,
        publish_to_servers: bool,
    ) -> Result<build::Model, LedgerError> {
        let txn = self.conn.begin().await?;
        let now = Utc::now();

        let result = build::Entity::update_many()
            .col_expr(
                build::Column::Status,
                Expr::value(BuildStatus::Completed),
            )
            .col_expr(build::Column::FilesCount, Expr::value(outcome.files_count))
            .col_expr(
                build::Column::ManifestKey,
                Expr::value(outcome.manifest_key.clone()),
            )
            .col_expr(
                build::Column::ClientVersion,
                Expr::value(outcome.client_version.clone()),
            )
            .col_expr(
                build::Column::SkippedFiles,
                Expr::value(outcome.skipped_files),
            )
            .col_expr(build::Column::FinishedAt, Expr::value(now))
            .filter(build::Column::Id.eq(build_id))
            .filter(build::Column::Status.eq(BuildStatus::Running))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            let err = transition_error(&txn, build_id).await;
            txn.rollback().await?;
            return Err(err);
        }

        let completed = build::Entity::find_by_id(build_id)
            .one(&txn)
            .await?
            .ok_or(LedgerError::BuildNotFound(build_id))?;

        profile::ActiveModel {
            id: Set(completed.profile_id),
            latest_build_id: Set(Some(completed.id)),
            latest_manifest_key: Set(Some(outcome.manifest_key)),
            latest_client_version: Set(Some(outcome.client_version)),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&txn)
        .await?;

        let mut servers_updated = 0;
        if publish_to_servers {
            servers_updated = server::Entity::update_many()
                .col_expr(server::Column::BuildId, Expr::value(completed.id))
                .col_expr(server::Column::UpdatedAt, Expr::value(now))
                .filter(server::Column::ProfileId.eq(completed.profile_id))
                .exec(&txn)
                .await?
                .rows_affected;
        }

        txn.commit().await?;

        info!(
            build_id,
            profile_id = completed.profile_id,
            files = outcome.files_count,
            servers_updated,
            "Build completed"
        );

        Ok(completed)
    }

    /// Move a running build to `Failed`. Profile pointers are not touched.
    pub async fn fail_build(
        &self,
        build_id: i32,
        error_message: &str,
    ) -> Result<build::Model, LedgerError> {
        let result = build::Entity::update_many()
            .col_expr(build::Column::Status, Expr::value(BuildStatus::Failed))
            .col_expr(
                build::Column::ErrorMessage,
                Expr::value(error_message.to_string()),
            )
            .col_expr(build::Column::FinishedAt, Expr::value(Utc::now()))
            .filter(build::Column::Id.eq(build_id))
            .filter(build::Column::Status.eq(BuildStatus::Running))
            .exec(self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(transition_error(self.conn, build_id).await);
        }

        warn!(build_id, error = error_message, "Build failed");

        build::Entity::find_by_id(build_id)
            .one(self.conn)
            .await?
            .ok_or(LedgerError::BuildNotFound(build_id))
    }

    pub async fn get_build(&self, build_id: i32) -> Result<Option<build::Model>, DbErr> {
        build::Entity::find_by_id(build_id).one(self.conn).await
    }

    /// The build the profile's latest pointer refers to, if any.
    pub async fn latest_build_for_profile(
        &self,
        profile_id: i32,
    ) -> Result<Option<build::Model>, LedgerError> {
        let profile = profile::Entity::find_by_id(profile_id)
            .one(self.conn)
            .await?
            .ok_or(LedgerError::ProfileNotFound(profile_id))?;

        let Some(build_id) = profile.latest_build_id else {
            return Ok(None);
        };

        Ok(build::Entity::find_by_id(build_id).one(self.conn).await?)
    }

    /// List a profile's builds, newest first.
    pub async fn list_builds(
        &self,
        profile_id: i32,
        status: Option<BuildStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<build::Model>, u64), DbErr> {
        let mut query = build::Entity::find().filter(build::Column::ProfileId.eq(profile_id));

        if let Some(status) = status {
            query = query.filter(build::Column::Status.eq(status));
        }

        let total = query.clone().count(self.conn).await?;

        let builds = query
            .order_by_desc(build::Column::CreatedAt)
            .order_by_desc(build::Column::Id)
            .offset(page_offset(page, per_page))
            .limit(per_page)
            .all(self.conn)
            .await?;

        Ok((builds, total))
    }

    /// Fail every build that has been `Running` since before `started_before`.
    pub async fn fail_running_builds(
        &self,
        started_before: DateTime<Utc>,
        error_message: &str,
    ) -> Result<u64, DbErr> {
        let result = build::Entity::update_many()
            .col_expr(build::Column::Status, Expr::value(BuildStatus::Failed))
            .col_expr(
                build::Column::ErrorMessage,
                Expr::value(error_message.to_string()),
            )
            .col_expr(build::Column::FinishedAt, Expr::value(Utc::now()))
            .filter(build::Column::Status.eq(BuildStatus::Running))
            .filter(build::Column::CreatedAt.lt(started_before))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected)
    }
}

/// Row offset of a 1-based page, clamped to what SQL `OFFSET` accepts.
fn page_offset(page: u64, per_page: u64) -> u64 {
    page.saturating_sub(1)
        .saturating_mul(per_page)
        .min(i64::MAX as u64)
}

async fn transition_error<C: ConnectionTrait>(conn: &C, build_id: i32) -> LedgerError {
    match build::Entity::find_by_id(build_id).one(conn).await {
        Ok(Some(existing)) => LedgerError::InvalidTransition {
            build_id,
            status: existing.status,
        },
        Ok(None) => LedgerError::BuildNotFound(build_id),
        Err(e) => LedgerError::Db(e),
    }
}
