//! Axum router construction.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::routes;

/// URL prefix under which finished artifacts are served.
pub const ARTIFACTS_PREFIX: &str = "/uploads/videos";

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit =
        usize::try_from(ctx.config.server.max_upload_bytes).unwrap_or(usize::MAX);

    let api = Router::new()
        .route("/jobs", get(routes::jobs::list_jobs))
        .route("/jobs/{id}", get(routes::jobs::get_job))
        .route("/events", get(routes::events::recent_events))
        .route("/events/stream", get(routes::events::events_stream))
        .route("/tools", get(routes::tools::list_tools));

    let artifacts = ServeDir::new(&ctx.config.storage.output_dir);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/upload",
            post(routes::upload::upload_video).layer(DefaultBodyLimit::max(body_limit)),
        )
        .nest("/api", api)
        .nest_service(ARTIFACTS_PREFIX, artifacts)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
