use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(profile_routes())
        .merge(build_routes())
        .routes(routes!(handlers::manifest::latest_manifest))
        .routes(routes!(
            handlers::preflight::create_preflight_run,
            handlers::preflight::list_preflight_runs
        ))
}

fn profile_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::profile::create_profile))
        .routes(routes!(
            handlers::profile::get_profile,
            handlers::profile::update_profile
        ))
}

fn build_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::build::rebuild_profile))
        .routes(routes!(handlers::build::list_builds))
        .routes(routes!(handlers::build::latest_build))
        .routes(routes!(handlers::build::get_build))
}
