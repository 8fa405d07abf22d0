pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod history;
pub mod ledger;
pub mod models;
pub mod pipeline;
pub mod preflight;
pub mod routes;
pub mod seed;
pub mod state;
pub mod storage;

use std::time::Duration;

use axum::Json;
use axum::http::HeaderValue;
use axum::routing::get;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Profile Publisher API",
        version = "1.0.0",
        description = "Builds client profiles from source trees and publishes their manifests"
    ),
    tags(
        (name = "Profiles", description = "Profile administration"),
        (name = "Builds", description = "Rebuilds and build history"),
        (name = "Manifests", description = "Published manifests"),
        (name = "Preflight", description = "Recorded preflight check runs"),
    ),
)]
struct ApiDoc;

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age));

    if origins.is_empty() {
        layer
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes())
        .split_for_parts();

    router
        .route(
            "/api-docs/openapi.json",
            get(move || std::future::ready(Json(api.clone()))),
        )
        .with_state(state)
        .layer(cors)
}
