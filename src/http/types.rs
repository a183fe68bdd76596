//! Request and response bodies for the REST API.

use serde::{Deserialize, Serialize};

use crate::model::ListType;
use crate::service::list::ListSummary;

#[derive(Debug, Deserialize)]
pub struct CreateListRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub list_type: ListType,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateListRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// A list as the API reports it: summary plus its EDL URL when a base URL
/// is configured.
#[derive(Debug, Serialize)]
pub struct ListEnvelope {
    #[serde(flatten)]
    pub summary: ListSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edl_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddIocRequest {
    pub value: String,
    #[serde(default)]
    pub lists: Vec<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkAddRequest {
    pub values: Vec<String>,
    pub list: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkRemoveRequest {
    pub values: Vec<String>,
    #[serde(default)]
    pub list: Option<String>,
    #[serde(default)]
    pub all_lists: bool,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default)]
    pub list: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddExclusionRequest {
    pub value: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub purge: bool,
}

#[derive(Debug, Deserialize)]
pub struct PreviewExclusionRequest {
    pub value: String,
}

/// `DELETE /api/exclusions?value=...` - the value rides in the query string
/// because CIDR patterns contain `/`.
#[derive(Debug, Deserialize)]
pub struct RemoveExclusionQuery {
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: bool,
}
