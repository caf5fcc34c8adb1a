//! Two-phase batch synchronization.
//!
//! Entities go first, in contiguous chunks, then relations. Calls are
//! awaited one at a time so a relation batch is never in flight before
//! the last entity batch has returned.

use crate::error::{BatchPhase, SyncError};
use crate::query::GraphView;
use grove_core::{GraphBatch, Relation};
use grove_mcp::{ClientError, ToolInvoker};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::{debug, info};

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Counts from a completed sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub entities: usize,
    pub relations: usize,
    pub entity_batches: usize,
    pub relation_batches: usize,
}

pub struct BatchSynchronizer<'a> {
    invoker: &'a dyn ToolInvoker,
    batch_size: usize,
    known: HashSet<String>,
}

impl<'a> BatchSynchronizer<'a> {
    pub fn new(invoker: &'a dyn ToolInvoker, batch_size: usize) -> Self {
        Self {
            invoker,
            batch_size: batch_size.max(1),
            known: HashSet::new(),
        }
    }

    /// Names already present in the store that relations may point at.
    pub fn with_known_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Deletes every entity in the store with a single `delete_entities` call.
    ///
    /// Returns the number of names deleted. Nothing is sent when the store
    /// is already empty.
    pub async fn reset(&self) -> Result<usize, SyncError> {
        let graph = self
            .invoker
            .call_tool("read_graph", json!({}))
            .await
            .and_then(GraphView::from_result)
            .map_err(SyncError::Reset)?;

        let names: Vec<String> = graph.entities.into_iter().map(|e| e.name).collect();
        if names.is_empty() {
            info!("Reset: graph already empty");
            return Ok(0);
        }

        info!("Reset: deleting {} entities", names.len());
        self.invoker
            .call_tool("delete_entities", json!({ "entityNames": names }))
            .await
            .map_err(SyncError::Reset)?;
        Ok(names.len())
    }

    /// Submits `batch`: all entity chunks, then all relation chunks.
    pub async fn sync(&self, batch: &GraphBatch) -> Result<SyncReport, SyncError> {
        self.validate(batch)?;

        let entity_batches = self
            .submit(BatchPhase::Entities, "entities", &batch.entities)
            .await?;
        let relation_batches = self
            .submit(BatchPhase::Relations, "relations", &batch.relations)
            .await?;

        Ok(SyncReport {
            entities: batch.entities.len(),
            relations: batch.relations.len(),
            entity_batches,
            relation_batches,
        })
    }

    fn validate(&self, batch: &GraphBatch) -> Result<(), SyncError> {
        let names: HashSet<&str> = batch.entity_names().collect();
        let exists = |name: &str| names.contains(name) || self.known.contains(name);

        for Relation { from, to, .. } in &batch.relations {
            for endpoint in [from, to] {
                if !exists(endpoint) {
                    return Err(SyncError::DanglingRelation {
                        from: from.clone(),
                        to: to.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    async fn submit<T: Serialize>(
        &self,
        phase: BatchPhase,
        key: &str,
        items: &[T],
    ) -> Result<usize, SyncError> {
        let total = items.len().div_ceil(self.batch_size);
        let mut submitted = 0;

        for (index, chunk) in items.chunks(self.batch_size).enumerate() {
            info!(
                "Submitting {} batch {}/{} ({} items)",
                phase,
                index + 1,
                total,
                chunk.len()
            );
            let fail = |source: ClientError| SyncError::Batch {
                phase,
                index,
                size: chunk.len(),
                submitted,
                source,
            };

            let payload = serde_json::to_value(chunk)
                .map_err(|e| fail(ClientError::Protocol(format!("failed to encode batch: {}", e))))?;
            let mut params = serde_json::Map::new();
            params.insert(key.to_string(), payload);

            let result = self
                .invoker
                .call_tool(phase.tool(), Value::Object(params))
                .await
                .map_err(fail)?;
            debug!("{} batch {} result: {}", phase, index, result);
            submitted += 1;
        }

        Ok(submitted)
    }
}
