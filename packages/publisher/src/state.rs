use std::sync::Arc;

use common::storage::ObjectStore;
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::pipeline::ArtifactPublisher;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub store: Arc<dyn ObjectStore>,
    pub config: AppConfig,
    pub publisher: Arc<ArtifactPublisher>,
    /// Cancelled on process shutdown; rebuilds run under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        store: Arc<dyn ObjectStore>,
        config: AppConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let publisher = Arc::new(ArtifactPublisher::new(
            db.clone(),
            store.clone(),
            config.publisher.clone(),
        ));
        Self {
            db,
            store,
            config,
            publisher,
            shutdown,
        }
    }
}
