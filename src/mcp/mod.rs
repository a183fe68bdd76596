//! MCP (Model Context Protocol) server surface.
//!
//! Exposes the full tool set over JSON-RPC at `POST /mcp`, so an LLM agent
//! can manage lists, indicators, and exclusions through the same service
//! layer the REST API uses. Mutations are attributed as `mcp:<key-name>`
//! when the caller sends an API key name, `mcp` otherwise.

pub mod protocol;
pub mod tools;
pub mod types;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::http::AppState;

/// Header carrying the caller's key name for audit attribution.
pub const KEY_HEADER: &str = "x-edld-key";

fn mcp_actor(headers: &HeaderMap) -> String {
    headers
        .get(KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|key| format!("mcp:{key}"))
        .unwrap_or_else(|| "mcp".to_string())
}

/// POST /mcp - One JSON-RPC message per request. Notifications get an
/// empty 202 since there is nothing to say back.
pub(crate) async fn handle_http(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let performed_by = mcp_actor(&headers);
    match protocol::handle_message(&state, &body, &performed_by) {
        Some(response) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            response,
        )
            .into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};

    use super::protocol::handle_message;
    use crate::config::Config;
    use crate::http::AppState;
    use crate::model::ListType;
    use crate::service::list;
    use crate::store::Store;

    fn make_state() -> AppState {
        AppState {
            store: Store::memory().unwrap(),
            config: Arc::new(Config::default()),
        }
    }

    fn call(state: &AppState, msg: &str) -> Value {
        let resp = handle_message(state, msg, "mcp").unwrap();
        serde_json::from_str(&resp).unwrap()
    }

    #[test]
    fn initialize_returns_capabilities() {
        let state = make_state();
        let parsed = call(
            &state,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        );
        assert_eq!(parsed["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(parsed["result"]["serverInfo"]["name"], "edld");
        assert!(parsed["result"]["capabilities"]["tools"].is_object());
    }

    #[test]
    fn ping_returns_empty_object() {
        let state = make_state();
        let parsed = call(&state, r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
        assert_eq!(parsed["result"], json!({}));
    }

    #[test]
    fn tools_list_names_every_tool() {
        let state = make_state();
        let parsed = call(&state, r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#);
        let tools = parsed["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 16);
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        for name in [
            "block_ioc",
            "unblock_ioc",
            "bulk_block_ioc",
            "search_ioc",
            "create_list",
            "add_exclusion",
        ] {
            assert!(names.contains(&name), "missing tool {name}");
        }
    }

    #[test]
    fn block_and_search_round_trip() {
        let state = make_state();
        list::create(&state.store, "Bad IPs", None, ListType::Ip, &[]).unwrap();

        let parsed = call(
            &state,
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"block_ioc","arguments":{"value":"203.0.113.7","lists":["badips"]}}}"#,
        );
        let text = parsed["result"]["content"][0]["text"].as_str().unwrap();
        let outcome: Value = serde_json::from_str(text).unwrap();
        assert_eq!(outcome["created"], true);
        assert_eq!(outcome["added_to"][0], "badips");

        let parsed = call(
            &state,
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"search_ioc","arguments":{"query":"203.0.113"}}}"#,
        );
        let text = parsed["result"]["content"][0]["text"].as_str().unwrap();
        let matches: Value = serde_json::from_str(text).unwrap();
        assert_eq!(matches[0]["value"], "203.0.113.7");
    }

    #[test]
    fn invalid_value_maps_to_invalid_params() {
        let state = make_state();
        let parsed = call(
            &state,
            r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"block_ioc","arguments":{"value":"not an ioc!!"}}}"#,
        );
        assert_eq!(parsed["error"]["code"], -32602);
    }

    #[test]
    fn unknown_tool_returns_method_not_found() {
        let state = make_state();
        let parsed = call(
            &state,
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"nonexistent","arguments":{}}}"#,
        );
        assert_eq!(parsed["error"]["code"], -32601);
    }

    #[test]
    fn invalid_json_returns_parse_error() {
        let state = make_state();
        let parsed = call(&state, "not json");
        assert_eq!(parsed["error"]["code"], -32700);
    }

    #[test]
    fn wrong_version_is_invalid_request() {
        let state = make_state();
        let parsed = call(&state, r#"{"jsonrpc":"1.0","id":8,"method":"ping"}"#);
        assert_eq!(parsed["error"]["code"], -32600);
    }

    #[test]
    fn initialized_notification_gets_no_response() {
        let state = make_state();
        let resp = handle_message(&state, r#"{"jsonrpc":"2.0","method":"initialized"}"#, "mcp");
        assert!(resp.is_none());
    }
}
