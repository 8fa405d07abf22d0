use common::BuildStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::history::CappedLog;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "build")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub profile_id: i32,
    #[sea_orm(belongs_to, from = "profile_id", to = "id", on_delete = "Cascade")]
    pub profile: HasOne<super::profile::Entity>,

    pub loader_type: String,
    pub mc_version: String,

    #[sea_orm(indexed)]
    pub status: BuildStatus,

    /// Set only when `status` is Completed.
    pub files_count: Option<i32>,
    /// Set only when `status` is Completed.
    pub manifest_key: Option<String>,
    pub client_version: Option<String>,

    /// Set only when `status` is Failed.
    #[sea_orm(column_type = "Text")]
    pub error_message: Option<String>,

    /// Files listed by the scan that were gone by the time they were read.
    pub skipped_files: i32,

    pub created_at: DateTimeUtc,
    pub started_at: Option<DateTimeUtc>,
    pub finished_at: Option<DateTimeUtc>,
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
