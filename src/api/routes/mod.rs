pub mod chat;
pub mod documents;
pub mod extraction;
pub mod health;
pub mod session;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::middleware::request_logger;
use crate::api::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors(&state.config.config.cors.allowed_origins);
    let body_limit = state.config.config.server.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api/v1", api_v1_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_logger))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/session",
            get(session::get_session).delete(session::reset_session),
        )
        .route("/session/provider", put(session::set_provider))
        .route("/session/credentials", post(session::set_credentials))
        .route("/status", get(session::get_status))
        .route("/documents", post(documents::upload_document))
        .route("/documents/process", post(documents::process_document))
        .route("/documents/search", post(documents::search_documents))
        .route("/chat", post(chat::ask))
        .route("/chat/history", get(chat::history))
        .route("/summary", post(chat::summarize))
        .route(
            "/extraction",
            post(extraction::run_extraction).get(extraction::get_extraction),
        )
        .route("/extraction/export", get(extraction::export_extraction))
}
