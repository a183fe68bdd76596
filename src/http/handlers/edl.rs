//! The EDL endpoint. This is what a firewall actually polls, so it speaks
//! plaintext, not JSON, and its 404 body is empty.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use super::super::{AppError, AppState};
use crate::service::edl;

/// GET /edl/:slug - Newline-separated canonical values, sorted.
pub(crate) async fn render_edl(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    match edl::render(&state.store, &slug)? {
        Some(body) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}
