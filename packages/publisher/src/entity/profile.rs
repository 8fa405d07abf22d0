use sea_orm::entity::prelude::*;
use sea_orm::sea_query::LockType;
use sea_orm::{DbBackend, QuerySelect, Select};
use serde::{Deserialize, Serialize};

/// A named distribution target. Builds publish into the profile's slug namespace.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profile")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    /// URL-safe identifier; fixed once any build references the profile.
    #[sea_orm(unique)]
    pub slug: String,

    #[sea_orm(column_type = "Text")]
    pub jvm_args_default: String,
    #[sea_orm(column_type = "Text")]
    pub game_args_default: String,

    /// Pointers to the most recent completed build. Written only by the build ledger.
    pub latest_build_id: Option<i32>,
    pub latest_manifest_key: Option<String>,
    pub latest_client_version: Option<String>,

    /// Optional bundled Java runtime shipped alongside the client.
    pub java_runtime_key: Option<String>,
    pub java_runtime_sha256: Option<String>,
    pub java_runtime_content_type: Option<String>,

    #[sea_orm(has_many)]
    pub builds: HasMany<super::build::Entity>,

    #[sea_orm(has_many)]
    pub servers: HasMany<super::server::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    /// `find_by_id` holding the row until the surrounding transaction ends.
    ///
    /// SQLite has no row locks; its single writer lock serializes the
    /// transaction instead.
    pub fn find_by_id_for_update(backend: DbBackend, id: i32) -> Select<Entity> {
        let query = Self::find_by_id(id);
        if backend == DbBackend::Sqlite {
            query
        } else {
            query.lock(LockType::Update)
        }
    }
}
