//! Health and dashboard handlers.

use axum::{Json, extract::State};
use serde::Serialize;

use super::super::{AppError, AppState};
use crate::model::AuditEntry;
use crate::store::{exclusions, iocs, lists};

const RECENT_ACTIVITY_LIMIT: usize = 10;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// GET /health
pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub(crate) struct ListStat {
    slug: String,
    name: String,
    ioc_count: i64,
}

#[derive(Serialize)]
pub(crate) struct DashboardResponse {
    total_iocs: i64,
    total_lists: usize,
    total_exclusions: i64,
    builtin_exclusions: i64,
    lists: Vec<ListStat>,
    recent_activity: Vec<AuditEntry>,
}

/// GET /api/stats/dashboard - Counts and recent activity in one query pass.
pub(crate) async fn dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, AppError> {
    let response = state
        .store
        .with(|conn| {
            let all_lists = lists::all_with_counts(conn)?;
            Ok(DashboardResponse {
                total_iocs: iocs::total_count(conn)?,
                total_lists: all_lists.len(),
                total_exclusions: exclusions::total_count(conn)?,
                builtin_exclusions: exclusions::builtin_count(conn)?,
                lists: all_lists
                    .into_iter()
                    .map(|(list, ioc_count)| ListStat {
                        slug: list.slug,
                        name: list.name,
                        ioc_count,
                    })
                    .collect(),
                recent_activity: iocs::recent_audit(conn, RECENT_ACTIVITY_LIMIT)?,
            })
        })
        .map_err(crate::service::ServiceError::from)?;
    Ok(Json(response))
}
