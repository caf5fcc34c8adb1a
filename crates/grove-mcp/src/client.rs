//! Request/response client and the tool-invocation seam.

use crate::error::ClientError;
use crate::protocol::{unwrap_envelope, JsonRpcRequest, WireShape};
use crate::transport::Transport;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Protocol version announced in the handshake.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Anything that can invoke a named tool on the store.
///
/// The synchronizer and query layers only depend on this, so tests can
/// swap in a recording implementation.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn call_tool(&self, tool: &str, params: Value) -> Result<Value, ClientError>;
}

/// Assigns ids and unwraps response envelopes over a [`Transport`].
pub struct RpcClient {
    transport: Box<dyn Transport>,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(0),
        }
    }

    /// Sends a request and returns the raw response object.
    pub async fn send(&self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(id, method, params);
        self.transport.round_trip(&request).await
    }

    /// Sends a request and returns its `result`, or the `error` as
    /// [`ClientError::Tool`].
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        let response = self.send(method, params).await?;
        unwrap_envelope(method, response)
    }

    pub fn describe(&self) -> String {
        self.transport.describe()
    }
}

/// Client for the memory store.
pub struct McpClient {
    rpc: RpcClient,
    wire: WireShape,
}

impl McpClient {
    pub fn new(transport: Box<dyn Transport>, wire: WireShape) -> Self {
        Self {
            rpc: RpcClient::new(transport),
            wire,
        }
    }

    pub fn describe(&self) -> String {
        self.rpc.describe()
    }

    /// Announces the client and returns the server's reply.
    pub async fn handshake(&self) -> Result<Value, ClientError> {
        info!("Handshake via {}", self.rpc.describe());
        self.rpc
            .request(
                "handshake",
                Some(json!({
                    "version": PROTOCOL_VERSION,
                    "capabilities": { "transports": ["stdio"] },
                })),
            )
            .await
    }

    pub async fn server_info(&self) -> Result<Value, ClientError> {
        self.rpc.request("server_info_request", Some(json!({}))).await
    }

    pub async fn list_tools(&self) -> Result<Value, ClientError> {
        self.rpc.request("listTools", None).await
    }
}

#[async_trait]
impl ToolInvoker for McpClient {
    async fn call_tool(&self, tool: &str, params: Value) -> Result<Value, ClientError> {
        let (method, params) = self.wire.encode(tool, params);
        debug!("call_tool {} as {}", tool, method);
        self.rpc
            .request(&method, Some(params))
            .await
            .map_err(|e| match e {
                // Report the tool, not the dispatch method.
                ClientError::Tool { payload, .. } => ClientError::Tool {
                    tool: tool.to_string(),
                    payload,
                },
                other => other,
            })
    }
}

/// Logs each call instead of sending it.
///
/// Reads come back empty, so a dry-run reset has nothing to delete.
#[derive(Debug, Default)]
pub struct DryRunInvoker;

#[async_trait]
impl ToolInvoker for DryRunInvoker {
    async fn call_tool(&self, tool: &str, params: Value) -> Result<Value, ClientError> {
        match tool {
            "read_graph" | "search_nodes" | "open_nodes" => {
                info!("[dry-run] {} {}", tool, params);
                Ok(json!({ "entities": [], "relations": [] }))
            }
            _ => {
                let body = serde_json::to_string_pretty(&params)
                    .map_err(|e| ClientError::Protocol(e.to_string()))?;
                info!("[dry-run] {} {}", tool, body);
                Ok(Value::Null)
            }
        }
    }
}
