//! HTTP surface: the REST API, the EDL endpoint firewalls pull, and the
//! MCP JSON-RPC endpoint.
//!
//! Handlers are thin adapters over the service layer; every mutation goes
//! through the same validation pipeline the MCP tools use. Errors map to
//! status codes here and nowhere else.

pub mod handlers;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::error;

use crate::config::Config;
use crate::service::ServiceError;
use crate::store::Store;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header a caller uses to attribute mutations to a person or system.
pub const ACTOR_HEADER: &str = "x-edld-user";

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<Config>,
}

/// Service errors carried up to the HTTP boundary.
pub struct AppError(ServiceError);

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::InvalidFormat(_) | ServiceError::ExclusionBlocked { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServiceError::TypeMismatch { .. } | ServiceError::Duplicate { .. } => {
                StatusCode::CONFLICT
            }
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::BuiltinProtected(_) => StatusCode::FORBIDDEN,
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error discriminant.
    fn code(&self) -> &'static str {
        match &self.0 {
            ServiceError::InvalidFormat(_) => "invalid_format",
            ServiceError::ExclusionBlocked { .. } => "exclusion_blocked",
            ServiceError::TypeMismatch { .. } => "type_mismatch",
            ServiceError::NotFound { .. } => "not_found",
            ServiceError::Duplicate { .. } => "duplicate",
            ServiceError::BuiltinProtected(_) => "builtin_protected",
            ServiceError::InvalidRequest(_) => "invalid_request",
            ServiceError::Storage(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Storage details stay in the log, not the response body.
        let message = if let ServiceError::Storage(err) = &self.0 {
            error!(error = %err, "storage error while handling request");
            "internal storage error".to_string()
        } else {
            self.0.to_string()
        };
        let body = json!({ "error": { "code": self.code(), "message": message } });
        (status, Json(body)).into_response()
    }
}

/// Who performed a mutation, from the actor header. Defaults to `api`.
pub(crate) fn performed_by(headers: &HeaderMap) -> String {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("api")
        .to_string()
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::stats::health))
        .route("/edl/{slug}", get(handlers::edl::render_edl))
        .route(
            "/api/lists",
            get(handlers::lists::list_all).post(handlers::lists::create),
        )
        .route(
            "/api/lists/{slug}",
            get(handlers::lists::get_one)
                .patch(handlers::lists::update)
                .delete(handlers::lists::remove),
        )
        .route("/api/lists/{slug}/iocs", get(handlers::iocs::page))
        .route("/api/iocs", post(handlers::iocs::add))
        .route("/api/iocs/search", get(handlers::iocs::search))
        .route("/api/iocs/bulk", post(handlers::iocs::bulk_add))
        .route("/api/iocs/bulk-remove", post(handlers::iocs::bulk_remove))
        .route("/api/iocs/{id}", delete(handlers::iocs::delete))
        .route(
            "/api/iocs/{id}/lists/{slug}",
            delete(handlers::iocs::remove_from_list),
        )
        .route("/api/iocs/{id}/comments", post(handlers::iocs::comment))
        .route("/api/iocs/{id}/audit", get(handlers::iocs::audit))
        .route(
            "/api/exclusions",
            get(handlers::exclusions::list_all)
                .post(handlers::exclusions::add)
                .delete(handlers::exclusions::remove),
        )
        .route(
            "/api/exclusions/preview",
            post(handlers::exclusions::preview),
        )
        .route("/api/stats/dashboard", get(handlers::stats::dashboard))
        .route("/mcp", post(crate::mcp::handle_http))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
