use sea_orm::sea_query::{Index, PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, DbErr};
use tracing::{info, warn};

use crate::entity::{build, preflight_run};

/// At most one build per profile may be `Running`.
const ONE_RUNNING_BUILD_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS \
     idx_build_one_running_per_profile ON build (profile_id) WHERE status = 'Running'";

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite or partial indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    // Build history listing and eviction:
    // SELECT ... FROM build WHERE profile_id = ? ORDER BY created_at DESC
    let build_history = Index::create()
        .if_not_exists()
        .name("idx_build_profile_created")
        .table(build::Entity)
        .col(build::Column::ProfileId)
        .col(build::Column::CreatedAt)
        .to_owned();

    let preflight_history = Index::create()
        .if_not_exists()
        .name("idx_preflight_run_created_id")
        .table(preflight_run::Entity)
        .col(preflight_run::Column::CreatedAt)
        .col(preflight_run::Column::Id)
        .to_owned();

    for (name, stmt) in [
        ("idx_build_profile_created", build_history),
        ("idx_preflight_run_created_id", preflight_history),
    ] {
        let sql = match backend {
            DbBackend::Sqlite => stmt.to_string(SqliteQueryBuilder),
            _ => stmt.to_string(PostgresQueryBuilder),
        };
        match db.execute_unprepared(&sql).await {
            Ok(_) => info!("Ensured index {} exists", name),
            Err(e) => warn!("Failed to create index {}: {}", name, e),
        }
    }

    // Backs the ledger's running-build check against concurrent requests.
    // MySQL has no partial indexes; there the row lock alone applies.
    if backend != DbBackend::MySql {
        db.execute_unprepared(ONE_RUNNING_BUILD_INDEX).await?;
        info!("Ensured index idx_build_one_running_per_profile exists");
    }

    Ok(())
}
