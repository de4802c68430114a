use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod frontend;
pub mod model;
pub mod prompts;
pub mod relay;
pub mod speech;
pub mod upstream;

use api::AppState;

/// Full HTTP surface: relay and speech API, client views, CORS and access logs.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(api::api_router())
        .merge(frontend::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
