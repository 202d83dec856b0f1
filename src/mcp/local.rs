//! Methods answered by the bridge itself
//!
//! `initialize` and `resources/list` are synthesized locally; everything else goes to the remote.

use serde_json::{json, Value};

use crate::mcp::rpc::{json_rpc_result, request_id};

pub const SUPPORTED_PROTOCOL_VERSION: &str = "2025-03-26";
pub const SERVER_NAME: &str = "erpnext-fac";
pub const SERVER_VERSION: &str = "1.0.0";

pub fn handle_local(request: &Value) -> Option<Value> {
    let id = request_id(request);

    match request.get("method").and_then(Value::as_str)? {
        "initialize" => Some(json_rpc_result(id, initialize_result())),
        "resources/list" => Some(json_rpc_result(id, json!({ "resources": [] }))),
        _ => None,
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": SUPPORTED_PROTOCOL_VERSION,
        "capabilities": {
            "tools": {},
            "prompts": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION
        }
    })
}
