use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::history::CappedLog;

/// One recorded diagnostics check-list.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "preflight_run")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub actor: String,

    /// JSON array of check results. Kept as text; readers tolerate garbage.
    #[sea_orm(column_type = "Text")]
    pub checks_json: String,

    pub total_checks: i32,
    pub passed: i32,
    pub warnings: i32,
    pub failed: i32,

    #[sea_orm(indexed)]
    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

impl CappedLog for Entity {
    fn order_column() -> Column {
        Column::CreatedAt
    }

    fn id_column() -> Column {
        Column::Id
    }

    fn id_of(model: &Model) -> i32 {
        model.id
    }
}
