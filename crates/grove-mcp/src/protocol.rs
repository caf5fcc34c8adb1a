//! Wire types for the line-oriented JSON-RPC protocol.
//!
//! One JSON object per line in each direction. Tool calls come in two
//! shapes: the tool name used directly as `method`, or a generic dispatch
//! method carrying `{tool, parameters}`.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const JSONRPC_VERSION: &str = "2.0";

/// Default method name for the dispatch wire shape.
pub const DEFAULT_DISPATCH_METHOD: &str = "tool_call_request";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }

    /// Serializes to a single line (no trailing newline).
    pub fn to_line(&self) -> Result<String, ClientError> {
        serde_json::to_string(self)
            .map_err(|e| ClientError::Protocol(format!("failed to encode request: {}", e)))
    }
}

/// How a tool call is laid out on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum WireShape {
    /// `{"method": "<tool>", "params": {...}}`
    #[default]
    Direct,

    /// `{"method": "<dispatch>", "params": {"tool": "<tool>", "parameters": {...}}}`
    Dispatch { method: String },
}

impl WireShape {
    pub fn dispatch() -> Self {
        Self::Dispatch {
            method: DEFAULT_DISPATCH_METHOD.to_string(),
        }
    }

    /// Returns the `(method, params)` pair for a tool call.
    pub fn encode(&self, tool: &str, params: Value) -> (String, Value) {
        match self {
            Self::Direct => (tool.to_string(), params),
            Self::Dispatch { method } => (
                method.clone(),
                json!({
                    "tool": tool,
                    "parameters": params,
                }),
            ),
        }
    }
}

/// Returns the first line of `output` that parses as a JSON object.
///
/// Servers launched through a container runtime may print banners or log
/// lines before the response, so anything that is not an object is skipped.
pub fn first_json_object(output: &str) -> Option<Value> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .find(Value::is_object)
}

/// Unwraps a `{result}` / `{error}` envelope.
pub fn unwrap_envelope(method: &str, response: Value) -> Result<Value, ClientError> {
    let Value::Object(mut map) = response else {
        return Err(ClientError::Protocol(format!(
            "response to {} is not an object",
            method
        )));
    };

    if let Some(error) = map.remove("error").filter(|e| !e.is_null()) {
        return Err(ClientError::Tool {
            tool: method.to_string(),
            payload: error,
        });
    }

    map.remove("result").ok_or_else(|| {
        ClientError::Protocol(format!(
            "response to {} has neither result nor error",
            method
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_line_shape() {
        let req = JsonRpcRequest::new(7, "read_graph", Some(json!({})));
        let line = req.to_line().unwrap();

        assert!(!line.contains('\n'));
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["jsonrpc"], "2.0");
        assert_eq!(v["id"], 7);
        assert_eq!(v["method"], "read_graph");
        assert_eq!(v["params"], json!({}));
    }

    #[test]
    fn test_request_without_params_omits_key() {
        let line = JsonRpcRequest::new(1, "listTools", None).to_line().unwrap();
        assert!(!line.contains("params"));
    }

    #[test]
    fn test_wire_shapes() {
        let params = json!({"query": "demo"});

        let (method, p) = WireShape::Direct.encode("search_nodes", params.clone());
        assert_eq!(method, "search_nodes");
        assert_eq!(p, params);

        let (method, p) = WireShape::dispatch().encode("search_nodes", params.clone());
        assert_eq!(method, "tool_call_request");
        assert_eq!(p, json!({"tool": "search_nodes", "parameters": {"query": "demo"}}));
    }

    #[test]
    fn test_first_json_object_skips_noise() {
        let out = "starting server...\n[1, 2]\n{bad json\n{\"result\": {}}\n{\"second\": 1}\n";
        assert_eq!(first_json_object(out), Some(json!({"result": {}})));
    }

    #[test]
    fn test_first_json_object_none() {
        assert_eq!(first_json_object("Error: boom\n"), None);
        assert_eq!(first_json_object(""), None);
    }

    #[test]
    fn test_unwrap_result() {
        let out = unwrap_envelope("x", json!({"id": 1, "result": {"ok": true}})).unwrap();
        assert_eq!(out, json!({"ok": true}));
    }

    #[test]
    fn test_unwrap_error_is_tool_error() {
        let err = unwrap_envelope("create_entities", json!({"error": {"code": -1}})).unwrap_err();
        match err {
            ClientError::Tool { tool, payload } => {
                assert_eq!(tool, "create_entities");
                assert_eq!(payload, json!({"code": -1}));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unwrap_neither_is_protocol_error() {
        let err = unwrap_envelope("x", json!({"id": 1})).unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }
}
