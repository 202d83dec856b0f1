//! JSON-RPC response builders and envelope normalization
//!
//! Turns whatever the remote endpoint returns into a well-formed JSON-RPC 2.0
//! response correlated with the originating request.

use serde_json::{json, Map, Value};

pub const JSONRPC_VERSION: &str = "2.0";

/// Returns the request id when it is present and not `null`.
///
/// `0` and `""` count as present ids.
pub fn request_id(request: &Value) -> Option<Value> {
    request.get("id").filter(|id| !id.is_null()).cloned()
}

pub fn json_rpc_error(id: Option<Value>, code: i64, message: &str) -> Value {
    json_rpc_error_with_data(id, code, message, None)
}

pub fn json_rpc_error_with_data(
    id: Option<Value>,
    code: i64,
    message: &str,
    data: Option<Value>,
) -> Value {
    let mut error = Map::new();
    error.insert("code".to_string(), json!(code));
    error.insert("message".to_string(), Value::String(message.to_string()));
    if let Some(data) = data {
        error.insert("data".to_string(), data);
    }

    let mut response = Map::new();
    response.insert(
        "jsonrpc".to_string(),
        Value::String(JSONRPC_VERSION.to_string()),
    );
    if let Some(id) = id {
        response.insert("id".to_string(), id);
    }
    response.insert("error".to_string(), Value::Object(error));
    Value::Object(response)
}

/// Builds a result response, leaving `id` out when the request carried none.
pub fn json_rpc_result(id: Option<Value>, result: Value) -> Value {
    let mut response = Map::new();
    response.insert(
        "jsonrpc".to_string(),
        Value::String(JSONRPC_VERSION.to_string()),
    );
    if let Some(id) = id {
        response.insert("id".to_string(), id);
    }
    response.insert("result".to_string(), result);
    Value::Object(response)
}

/// Frappe wraps method responses as `{"message": ...}`.
pub fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("message") => {
            map.remove("message").unwrap_or(Value::Null)
        }
        other => other,
    }
}

pub fn normalize_response(body: Value, id: Option<&Value>) -> Value {
    let mut map = match body {
        Value::Object(map) if map.contains_key("result") || map.contains_key("error") => map,
        bare => return wrap_result(bare, id),
    };

    map.entry("jsonrpc")
        .or_insert_with(|| Value::String(JSONRPC_VERSION.to_string()));
    if let Some(id) = id {
        map.entry("id").or_insert_with(|| id.clone());
    }
    Value::Object(map)
}

fn wrap_result(result: Value, id: Option<&Value>) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id.cloned().unwrap_or(Value::Null),
        "result": result
    })
}
