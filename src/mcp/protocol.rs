//! MCP protocol handler.
//!
//! Implements the JSON-RPC based MCP protocol: initialize, tools/list,
//! tools/call, ping. Tool results come back as MCP `content` text blocks
//! carrying pretty-printed JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::http::AppState;
use crate::service::{ServiceError, ServiceResult};

use super::tools;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// A JSON-RPC request.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// A JSON-RPC response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// JSON-RPC error codes.
pub(crate) const PARSE_ERROR: i32 = -32700;
pub(crate) const INVALID_REQUEST: i32 = -32600;
pub(crate) const METHOD_NOT_FOUND: i32 = -32601;
pub(crate) const INVALID_PARAMS: i32 = -32602;
pub(crate) const INTERNAL_ERROR: i32 = -32603;

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

fn error_code(err: &ServiceError) -> i32 {
    match err {
        ServiceError::Storage(_) => INTERNAL_ERROR,
        _ => INVALID_PARAMS,
    }
}

/// Handle a raw JSON string, parse it, dispatch, and return the response
/// JSON. `None` means the message was a notification and gets no reply.
pub fn handle_message(state: &AppState, message: &str, performed_by: &str) -> Option<String> {
    let request: JsonRpcRequest = match serde_json::from_str(message) {
        Ok(req) => req,
        Err(e) => {
            error!("failed to parse JSON-RPC request: {}", e);
            let resp = JsonRpcResponse::error(None, PARSE_ERROR, "Parse error");
            return serde_json::to_string(&resp).ok();
        }
    };

    if request.jsonrpc != "2.0" {
        let resp = JsonRpcResponse::error(
            request.id.clone(),
            INVALID_REQUEST,
            "Invalid JSON-RPC version, expected 2.0",
        );
        return serde_json::to_string(&resp).ok();
    }

    let response = handle_request(state, &request, performed_by)?;
    serde_json::to_string(&response).ok()
}

/// Handle a single parsed request. Notifications return `None`.
pub fn handle_request(
    state: &AppState,
    request: &JsonRpcRequest,
    performed_by: &str,
) -> Option<JsonRpcResponse> {
    debug!(method = %request.method, performed_by, "handling MCP request");
    let id = request.id.clone();

    match request.method.as_str() {
        "initialize" => Some(handle_initialize(id)),
        "initialized" => None, // Notification, no response.
        "ping" => Some(JsonRpcResponse::success(id, json!({}))),
        "tools/list" => Some(handle_tools_list(id)),
        "tools/call" => Some(handle_tools_call(state, id, &request.params, performed_by)),
        _ => {
            if id.is_some() {
                Some(JsonRpcResponse::error(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", request.method),
                ))
            } else {
                None // Don't respond to unknown notifications.
            }
        }
    }
}

fn handle_initialize(id: Option<Value>) -> JsonRpcResponse {
    JsonRpcResponse::success(
        id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": "edld",
                "version": env!("CARGO_PKG_VERSION")
            }
        }),
    )
}

fn handle_tools_list(id: Option<Value>) -> JsonRpcResponse {
    JsonRpcResponse::success(id, json!({ "tools": tool_descriptors() }))
}

fn parse_params<T: serde::de::DeserializeOwned>(tool: &str, args: Value) -> ServiceResult<T> {
    serde_json::from_value(args)
        .map_err(|e| ServiceError::InvalidRequest(format!("invalid {tool} params: {e}")))
}

fn handle_tools_call(
    state: &AppState,
    id: Option<Value>,
    params: &Option<Value>,
    performed_by: &str,
) -> JsonRpcResponse {
    let Some(params) = params else {
        return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params for tools/call");
    };
    let Some(tool_name) = params.get("name").and_then(|n| n.as_str()) else {
        return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing tool name in params");
    };
    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    let outcome: ServiceResult<Value> = match tool_name {
        "block_ioc" => {
            parse_params(tool_name, args).and_then(|p| tools::block_ioc(state, p, performed_by))
        }
        "unblock_ioc" => {
            parse_params(tool_name, args).and_then(|p| tools::unblock_ioc(state, p, performed_by))
        }
        "bulk_block_ioc" => parse_params(tool_name, args)
            .and_then(|p| tools::bulk_block_ioc(state, p, performed_by)),
        "bulk_unblock_ioc" => parse_params(tool_name, args)
            .and_then(|p| tools::bulk_unblock_ioc(state, p, performed_by)),
        "search_ioc" => parse_params(tool_name, args).and_then(|p| tools::search_ioc(state, p)),
        "list_lists" => tools::list_lists(state),
        "get_list" => parse_params(tool_name, args).and_then(|p| tools::get_list(state, p)),
        "create_list" => parse_params(tool_name, args).and_then(|p| tools::create_list(state, p)),
        "update_list" => parse_params(tool_name, args).and_then(|p| tools::update_list(state, p)),
        "delete_list" => parse_params(tool_name, args).and_then(|p| tools::delete_list(state, p)),
        "list_iocs" => parse_params(tool_name, args).and_then(|p| tools::list_iocs(state, p)),
        "update_ioc" => {
            parse_params(tool_name, args).and_then(|p| tools::update_ioc(state, p, performed_by))
        }
        "list_exclusions" => tools::list_exclusions(state),
        "preview_exclusion" => {
            parse_params(tool_name, args).and_then(|p| tools::preview_exclusion(state, p))
        }
        "add_exclusion" => {
            parse_params(tool_name, args).and_then(|p| tools::add_exclusion(state, p, performed_by))
        }
        "remove_exclusion" => parse_params(tool_name, args)
            .and_then(|p| tools::remove_exclusion(state, p, performed_by)),
        _ => {
            return JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Unknown tool: {tool_name}"),
            );
        }
    };

    match outcome {
        Ok(result) => {
            let text =
                serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string());
            JsonRpcResponse::success(
                id,
                json!({
                    "content": [{
                        "type": "text",
                        "text": text
                    }]
                }),
            )
        }
        Err(e) => JsonRpcResponse::error(id, error_code(&e), e.to_string()),
    }
}

fn value_schema(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn values_schema(description: &str) -> Value {
    json!({ "type": "array", "items": { "type": "string" }, "description": description })
}

fn tool_descriptors() -> Vec<Value> {
    vec![
        json!({
            "name": "block_ioc",
            "description": "Validate an indicator (IP, CIDR, domain, wildcard domain, or file hash) and add it to one or more blocklists. Rejected if it matches an exclusion rule.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "value": value_schema("The indicator to block"),
                    "lists": values_schema("Slugs of lists to add it to"),
                    "comment": value_schema("Optional note recorded in the audit history")
                },
                "required": ["value"]
            }
        }),
        json!({
            "name": "unblock_ioc",
            "description": "Remove an indicator from one list, or from everywhere with all_lists (which deletes it entirely).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "value": value_schema("The indicator to unblock"),
                    "list": value_schema("List slug to remove it from"),
                    "all_lists": { "type": "boolean", "description": "Remove from every list and delete the record" }
                },
                "required": ["value"]
            }
        }),
        json!({
            "name": "bulk_block_ioc",
            "description": "Validate and add up to 500 indicators to one list in a single call. Returns an accepted/skipped/failed tally; bad entries never abort the batch.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "values": values_schema("Indicators to block"),
                    "list": value_schema("Slug of the target list"),
                    "comment": value_schema("Optional note applied to every accepted indicator")
                },
                "required": ["values", "list"]
            }
        }),
        json!({
            "name": "bulk_unblock_ioc",
            "description": "Remove up to 500 indicators from one list or from all lists. Returns removed/not_found.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "values": values_schema("Indicators to remove"),
                    "list": value_schema("List slug to remove from"),
                    "all_lists": { "type": "boolean", "description": "Remove from every list and delete the records" }
                },
                "required": ["values"]
            }
        }),
        json!({
            "name": "search_ioc",
            "description": "Substring search over stored indicators, optionally scoped to one list. Each match includes its list memberships and recent comments.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": value_schema("Substring to search for"),
                    "list": value_schema("Restrict to this list slug"),
                    "limit": { "type": "integer", "description": "Maximum matches to return" }
                },
                "required": ["query"]
            }
        }),
        json!({
            "name": "list_lists",
            "description": "All blocklists with their indicator counts.",
            "inputSchema": { "type": "object", "properties": {} }
        }),
        json!({
            "name": "get_list",
            "description": "One blocklist by slug, with its indicator count.",
            "inputSchema": {
                "type": "object",
                "properties": { "slug": value_schema("List slug") },
                "required": ["slug"]
            }
        }),
        json!({
            "name": "create_list",
            "description": "Create a blocklist. list_type constrains what it accepts: ip (IPs and CIDRs), domain (domains and wildcards), hash, or mixed.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "name": value_schema("Display name; the slug is derived from it"),
                    "description": value_schema("What this list is for"),
                    "list_type": { "type": "string", "enum": ["ip", "domain", "hash", "mixed"], "description": "Type constraint (default mixed)" },
                    "tags": values_schema("Free-form tags")
                },
                "required": ["name"]
            }
        }),
        json!({
            "name": "update_list",
            "description": "Update a list's name, description, or tags. Renaming regenerates the slug and moves the EDL URL.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "slug": value_schema("Current list slug"),
                    "name": value_schema("New display name"),
                    "description": value_schema("New description"),
                    "tags": values_schema("Replacement tags")
                },
                "required": ["slug"]
            }
        }),
        json!({
            "name": "delete_list",
            "description": "Delete a blocklist. Its indicators survive on other lists.",
            "inputSchema": {
                "type": "object",
                "properties": { "slug": value_schema("List slug") },
                "required": ["slug"]
            }
        }),
        json!({
            "name": "list_iocs",
            "description": "One page of a list's indicators, sorted by value.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "list": value_schema("List slug"),
                    "limit": { "type": "integer", "description": "Page size" },
                    "offset": { "type": "integer", "description": "Page start" }
                },
                "required": ["list"]
            }
        }),
        json!({
            "name": "update_ioc",
            "description": "Append a comment to an indicator's audit history. The value and type are immutable.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "value": value_schema("The indicator"),
                    "comment": value_schema("Comment to append")
                },
                "required": ["value", "comment"]
            }
        }),
        json!({
            "name": "list_exclusions",
            "description": "All exclusion rules grouped by type, built-in and custom.",
            "inputSchema": { "type": "object", "properties": {} }
        }),
        json!({
            "name": "preview_exclusion",
            "description": "Show which stored indicators a proposed exclusion pattern would block, without saving it.",
            "inputSchema": {
                "type": "object",
                "properties": { "value": value_schema("Proposed pattern: IP, CIDR, domain, or *.wildcard") },
                "required": ["value"]
            }
        }),
        json!({
            "name": "add_exclusion",
            "description": "Add a custom exclusion rule. With purge, indicators it already covers are deleted in the same transaction.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "value": value_schema("Pattern: IP, CIDR, domain, or *.wildcard"),
                    "reason": value_schema("Why this is excluded"),
                    "purge": { "type": "boolean", "description": "Also delete indicators the rule covers" }
                },
                "required": ["value"]
            }
        }),
        json!({
            "name": "remove_exclusion",
            "description": "Remove a custom exclusion rule. Built-in rules cannot be removed.",
            "inputSchema": {
                "type": "object",
                "properties": { "value": value_schema("Rule value") },
                "required": ["value"]
            }
        }),
    ]
}
