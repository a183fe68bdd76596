//! Parameter and result types for the MCP tool set.

use serde::{Deserialize, Serialize};

use crate::model::ListType;

#[derive(Debug, Deserialize)]
pub struct BlockIocParams {
    pub value: String,
    #[serde(default)]
    pub lists: Vec<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnblockIocParams {
    pub value: String,
    #[serde(default)]
    pub list: Option<String>,
    #[serde(default)]
    pub all_lists: bool,
}

#[derive(Debug, Deserialize)]
pub struct BulkBlockParams {
    pub values: Vec<String>,
    pub list: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkUnblockParams {
    pub values: Vec<String>,
    #[serde(default)]
    pub list: Option<String>,
    #[serde(default)]
    pub all_lists: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchIocParams {
    pub query: String,
    #[serde(default)]
    pub list: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct GetListParams {
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateListParams {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub list_type: ListType,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateListParams {
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteListParams {
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct ListIocsParams {
    pub list: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateIocParams {
    pub value: String,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewExclusionParams {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct AddExclusionParams {
    pub value: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub purge: bool,
}

#[derive(Debug, Deserialize)]
pub struct RemoveExclusionParams {
    pub value: String,
}

/// Generic acknowledgement for tools whose effect is the message.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
