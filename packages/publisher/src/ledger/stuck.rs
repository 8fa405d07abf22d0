use chrono::Utc;
use sea_orm::{DatabaseConnection, DbErr};
use tracing::{info, warn};

use super::BuildLedger;

pub(crate) const INTERRUPTED_BUILD_MESSAGE: &str = "build interrupted by a service restart";

/// Fail every build a previous process left `Running`.
///
/// Run once at startup, before the router accepts rebuilds. No task of this
/// process drives those builds, so they can never finish on their own.
pub async fn fail_interrupted_builds(db: &DatabaseConnection) -> Result<u64, DbErr> {
    let failed = BuildLedger::new(db)
        .fail_running_builds(Utc::now(), INTERRUPTED_BUILD_MESSAGE)
        .await?;

    if failed > 0 {
        warn!(count = failed, "Marked interrupted builds as failed");
    } else {
        info!("No interrupted builds found");
    }

    Ok(failed)
}
