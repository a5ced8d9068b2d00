use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, put, MethodRouter},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;
use service::repository::UserRepository;

use crate::errors::JsonApiError;

pub mod users;

/// Shared handler state. The repository is injected so tests can pass an in-memory store.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn route_not_found() -> JsonApiError {
    JsonApiError::new(StatusCode::NOT_FOUND, "route not found")
}

async fn method_not_allowed() -> JsonApiError {
    JsonApiError::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}

/// Known path, unsupported method: answer 405 in the envelope instead of an empty body.
fn enveloped(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(method_not_allowed)
}

/// Build the full application router
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", enveloped(get(users::list_users).post(users::create_user)))
        .route(
            "/users/:id",
            enveloped(get(users::get_user).put(users::update_user).delete(users::delete_user)),
        )
        .route("/users/:id/reset", enveloped(put(users::reset_user)))
        .route("/login", enveloped(get(users::login)))
        .fallback(route_not_found)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(
                    DefaultOnRequest::new()
                        .level(Level::INFO),
                )
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                // 5xx responses are logged at ERROR
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR),
                ),
        )
}
