use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Pool size. Default: 100.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connections kept open while idle. Default: 5.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default)]
    pub sqlx_logging: bool,
}

fn default_max_connections() -> u32 {
    100
}
fn default_min_connections() -> u32 {
    5
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            sqlx_logging: false,
        }
    }
}

/// Which object-store adapter to construct at startup.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Filesystem,
    S3,
}

#[derive(Debug, Deserialize, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default)]
    pub path_style: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Base directory of the filesystem backend. Default: "./data/objects".
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    /// Largest object the filesystem backend accepts. Default: 2 GiB.
    #[serde(default = "default_max_object_size")]
    pub max_object_size: u64,
    pub s3: Option<S3Config>,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data/objects")
}
fn default_max_object_size() -> u64 {
    2 * 1024 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Filesystem,
            path: default_storage_path(),
            max_object_size: default_max_object_size(),
            s3: None,
        }
    }
}

/// Settings of the build-and-publish pipeline.
#[derive(Debug, Deserialize, Clone)]
pub struct PublisherConfig {
    /// Directory holding one source tree per profile slug. Default: "./sources".
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,
    /// Files hashed and uploaded concurrently. Default: 8.
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,
    /// Builds retained per profile. Default: 50.
    #[serde(default = "default_build_history_max")]
    pub build_history_max: u64,
    /// Failure messages stored on a build are cut to this many characters. Default: 2000.
    #[serde(default = "default_max_error_message_len")]
    pub max_error_message_len: usize,
}

fn default_source_root() -> PathBuf {
    PathBuf::from("./sources")
}
fn default_upload_concurrency() -> usize {
    8
}
fn default_build_history_max() -> u64 {
    50
}
fn default_max_error_message_len() -> usize {
    2000
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            upload_concurrency: default_upload_concurrency(),
            build_history_max: default_build_history_max(),
            max_error_message_len: default_max_error_message_len(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PreflightConfig {
    /// Preflight runs retained. Default: 200.
    #[serde(default = "default_preflight_history_max")]
    pub history_max: u64,
}

fn default_preflight_history_max() -> u64 {
    200
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            history_max: default_preflight_history_max(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub preflight: PreflightConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("PUBLISHER_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "sqlite://publisher.db?mode=rwc")?
            .set_default("storage.backend", "filesystem")?
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., PUBLISHER__STORAGE__BACKEND=s3)
            .add_source(Environment::with_prefix("PUBLISHER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
