use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest("/api/v1", api_routes(app_state.clone()).layer(cors))
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

fn api_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public = Router::new().route(
        "/levels/progress",
        get(handlers::levels::get_level_progress),
    );

    // Identity is optional at the middleware level; handlers that need it
    // reject with 401 through the CurrentUser extractor.
    let learner = Router::new()
        .route("/profile", get(handlers::profile::get_profile))
        .route("/lessons", get(handlers::lessons::list_lessons))
        .route("/lessons/{lesson_id}", get(handlers::lessons::get_lesson))
        .route(
            "/lessons/{lesson_id}/problem-attempts",
            get(handlers::lessons::problem_attempts),
        )
        .route(
            "/lessons/{lesson_id}/submit",
            post(handlers::lessons::submit_answer),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::optional_auth_middleware,
        ));

    public.merge(learner)
}
