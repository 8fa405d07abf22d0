use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use ::common::storage::memory::MemoryObjectStore;
use reqwest::Client;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use publisher::config::{
    AppConfig, CorsConfig, DatabaseConfig, PreflightConfig, PublisherConfig, ServerConfig,
    StorageBackend, StorageConfig,
};
use publisher::state::AppState;

pub mod routes {
    pub const PROFILES: &str = "/api/v1/profiles";
    pub const PREFLIGHT_RUNS: &str = "/api/v1/preflight-runs";
    pub const OPENAPI: &str = "/api-docs/openapi.json";

    pub fn profile(id: i64) -> String {
        format!("/api/v1/profiles/{id}")
    }

    pub fn rebuild(id: i64) -> String {
        format!("/api/v1/profiles/{id}/rebuild")
    }

    pub fn builds(id: i64) -> String {
        format!("/api/v1/profiles/{id}/builds")
    }

    pub fn latest_build(id: i64) -> String {
        format!("/api/v1/profiles/{id}/builds/latest")
    }

    pub fn build(id: i64) -> String {
        format!("/api/v1/builds/{id}")
    }

    pub fn latest_manifest(slug: &str) -> String {
        format!("/api/v1/manifests/{slug}/latest")
    }
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub store: Arc<MemoryObjectStore>,
    /// Source root; one subdirectory per profile slug.
    pub sources: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.expect("Failed to read response body");
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(PreflightConfig::default().history_max, 50).await
    }

    pub async fn spawn_with(preflight_history_max: u64, build_history_max: u64) -> Self {
        let sources = tempfile::tempdir().expect("Failed to create source root");

        let mut database = DatabaseConfig::new("sqlite::memory:");
        database.max_connections = 1;
        database.min_connections = 1;

        let db = publisher::database::init_db(&database)
            .await
            .expect("Failed to initialize database");
        publisher::seed::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig::default(),
            },
            database,
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                ..StorageConfig::default()
            },
            publisher: PublisherConfig {
                source_root: sources.path().to_path_buf(),
                build_history_max,
                ..PublisherConfig::default()
            },
            preflight: PreflightConfig {
                history_max: preflight_history_max,
            },
        };

        let store = Arc::new(MemoryObjectStore::new());
        let state = AppState::new(db.clone(), store.clone(), config, CancellationToken::new());
        let app = publisher::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            store,
            sources,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    /// Create a profile and return its ID.
    pub async fn create_profile(&self, slug: &str) -> i64 {
        let res = self
            .post(
                routes::PROFILES,
                &json!({
                    "name": format!("Profile {slug}"),
                    "slug": slug,
                    "jvmArgsDefault": "-Xmx4G",
                }),
            )
            .await;
        assert_eq!(res.status, 201, "Profile creation failed: {}", res.text);
        res.body["id"].as_i64().expect("profile id")
    }

    /// Write a file into a profile's source tree.
    pub fn write_source(&self, slug: &str, rel: &str, body: &[u8]) -> PathBuf {
        let path = self.sources.path().join(slug).join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        path
    }

    pub async fn rebuild(&self, profile_id: i64, publish_to_servers: bool) -> TestResponse {
        self.post(
            &routes::rebuild(profile_id),
            &json!({
                "loaderType": "fabric",
                "mcVersion": "1.20.1",
                "publishToServers": publish_to_servers,
            }),
        )
        .await
    }
}
