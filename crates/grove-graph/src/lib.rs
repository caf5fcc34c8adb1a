//! Grove Graph - getting batches into the store and reading them back
//!
//! - [`BatchSynchronizer`] submits a walked project in two phases,
//!   entities then relations, in bounded chunks.
//! - [`GraphQuery`] issues the read tools and decodes their results.
//! - [`KnowledgeGraph`] indexes a result locally for display.
//!
//! Everything talks to the store through [`grove_mcp::ToolInvoker`].
//!
//! # Example
//!
//! ```no_run
//! use grove_graph::{BatchSynchronizer, GraphQuery};
//! use grove_mcp::DryRunInvoker;
//!
//! # async fn run(batch: grove_core::GraphBatch) -> Result<(), Box<dyn std::error::Error>> {
//! let invoker = DryRunInvoker;
//! let report = BatchSynchronizer::new(&invoker, 10).sync(&batch).await?;
//! println!("{} entities in {} batches", report.entities, report.entity_batches);
//!
//! let projects = GraphQuery::new(&invoker).list_projects().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod graph;
mod query;
mod render;
mod sync;

pub use error::{BatchPhase, SyncError};
pub use graph::KnowledgeGraph;
pub use query::{GraphQuery, GraphView};
pub use render::{
    render_entity, render_summary, render_unresolved, OBSERVATION_WIDTH, SHOWN_OBSERVATIONS,
};
pub use sync::{BatchSynchronizer, SyncReport, DEFAULT_BATCH_SIZE};

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use grove_mcp::{ClientError, ToolInvoker};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records every call and answers reads from a fixed graph.
    #[derive(Default)]
    pub struct RecordingInvoker {
        calls: Mutex<Vec<(String, Value)>>,
        graph: Option<Value>,
        /// Tool name to the 1-based call number that fails.
        failures: HashMap<String, usize>,
    }

    impl RecordingInvoker {
        pub fn with_graph(mut self, graph: Value) -> Self {
            self.graph = Some(graph);
            self
        }

        pub fn fail_on(mut self, tool: &str, nth: usize) -> Self {
            self.failures.insert(tool.to_string(), nth);
            self
        }

        pub fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolInvoker for RecordingInvoker {
        async fn call_tool(&self, tool: &str, params: Value) -> Result<Value, ClientError> {
            let nth = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((tool.to_string(), params));
                calls.iter().filter(|(t, _)| t == tool).count()
            };

            if self.failures.get(tool) == Some(&nth) {
                return Err(ClientError::Tool {
                    tool: tool.to_string(),
                    payload: json!({"message": "rejected"}),
                });
            }

            match tool {
                "read_graph" | "search_nodes" | "open_nodes" => Ok(self
                    .graph
                    .clone()
                    .unwrap_or_else(|| json!({"entities": [], "relations": []}))),
                _ => Ok(json!({})),
            }
        }
    }
}
