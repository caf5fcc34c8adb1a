use grove_mcp::ClientError;
use thiserror::Error;

/// Which half of a two-phase sync a batch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Entities,
    Relations,
}

impl BatchPhase {
    pub fn tool(&self) -> &'static str {
        match self {
            Self::Entities => "create_entities",
            Self::Relations => "create_relations",
        }
    }
}

impl std::fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entities => write!(f, "entities"),
            Self::Relations => write!(f, "relations"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    /// A chunk failed. Earlier chunks stay in the store.
    #[error(
        "{phase} batch {index} ({size} items) failed after {submitted} successful batches: {source}"
    )]
    Batch {
        phase: BatchPhase,
        index: usize,
        size: usize,
        submitted: usize,
        #[source]
        source: ClientError,
    },

    #[error("relation {from} -> {to} references unknown entity {missing}")]
    DanglingRelation {
        from: String,
        to: String,
        missing: String,
    },

    #[error("reset failed: {0}")]
    Reset(#[source] ClientError),
}
