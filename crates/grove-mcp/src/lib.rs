//! Grove MCP - client for the knowledge-graph memory store
//!
//! Speaks newline-delimited JSON-RPC to a memory server, either by spawning
//! one process per request (the usual `docker exec -i` setup) or over a
//! persistent stdio channel.
//!
//! Higher layers depend on [`ToolInvoker`], not on a concrete client.

mod client;
mod error;
mod protocol;
mod transport;

pub use client::{DryRunInvoker, McpClient, RpcClient, ToolInvoker, PROTOCOL_VERSION};
pub use error::ClientError;
pub use protocol::{
    first_json_object, unwrap_envelope, JsonRpcRequest, WireShape, DEFAULT_DISPATCH_METHOD,
    JSONRPC_VERSION,
};
pub use transport::{
    discover_container, SpawnTransport, StdioTransport, Transport, DEFAULT_TIMEOUT,
};
