//! Router assembly: page and fragment routes, health, static files, HTTP tracing,
//! and the canned backend when mock mode is on.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::mock::mock_router;
use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - the page at `/` and htmx fragment routes under `/ui/...`
/// - liveness at `/api/v1/health`
/// - canned `/api/*` backend routes when `mock_backend` is set
/// - static assets from `static_dir` as the fallback
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new(&state.config.static_dir);
    let mock = state.config.mock_backend;

    let app = Router::new()
        .route("/", get(http::ui_index))
        .route("/ui/provider", post(http::ui_provider))
        .route("/ui/model", post(http::ui_model))
        .route("/ui/validation-provider", post(http::ui_validation_provider))
        .route("/ui/form", post(http::ui_form))
        .route("/ui/submit", post(http::ui_submit))
        .route("/ui/quiz", post(http::ui_quiz))
        .route("/ui/quiz/apply", post(http::ui_apply_quiz))
        .route("/api/v1/health", get(http::http_health))
        .with_state(state);

    let app = if mock { app.merge(mock_router()) } else { app };

    app.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
    .fallback_service(static_service)
}
