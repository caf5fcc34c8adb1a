//! Plain-text presentation of query results.
//!
//! Each observation is cut at 100 characters. Only two observations per
//! entity are shown unless `verbose` is set.

use crate::graph::KnowledgeGraph;
use grove_core::{Entity, Relation};
use std::fmt::Write;

pub const SHOWN_OBSERVATIONS: usize = 2;
pub const OBSERVATION_WIDTH: usize = 100;

fn clip(observation: &str) -> String {
    match observation.char_indices().nth(OBSERVATION_WIDTH) {
        Some((cut, _)) => format!("{}...", &observation[..cut]),
        None => observation.to_string(),
    }
}

/// Renders one entity with its observations and relations.
pub fn render_entity(entity: &Entity, relations: &[Relation], verbose: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Entity: {}", entity.name);
    let _ = writeln!(out, "Type: {}", entity.entity_type);

    if !entity.observations.is_empty() {
        let _ = writeln!(out, "Observations:");
        for (i, obs) in entity.observations.iter().enumerate() {
            if verbose || i < SHOWN_OBSERVATIONS {
                let _ = writeln!(out, "  - {}", clip(obs));
            } else {
                let more = entity.observations.len() - SHOWN_OBSERVATIONS;
                let _ = writeln!(out, "  - ... ({} more observations)", more);
                break;
            }
        }
    }

    if !relations.is_empty() {
        let _ = writeln!(out, "Relations:");
        for rel in relations {
            let _ = writeln!(out, "  - {} {} {}", rel.from, rel.relation_type, rel.to);
        }
    }

    out
}

/// Relations whose endpoints were not in the result.
pub fn render_unresolved(relations: &[Relation]) -> String {
    let mut out = String::new();
    if relations.is_empty() {
        return out;
    }
    let _ = writeln!(
        out,
        "{} relations reference entities not in the graph:",
        relations.len()
    );
    for rel in relations {
        let _ = writeln!(out, "  - {} {} {}", rel.from, rel.relation_type, rel.to);
    }
    out
}

/// Entity totals grouped by type.
pub fn render_summary(graph: &KnowledgeGraph) -> String {
    let mut out = String::new();
    if graph.node_count() == 0 {
        out.push_str("Knowledge graph is empty\n");
        return out;
    }

    let _ = writeln!(
        out,
        "Knowledge graph contains {} entities:",
        graph.node_count()
    );
    for (entity_type, count) in graph.counts_by_type() {
        let _ = writeln!(out, "- {}: {} entities", entity_type, count);
    }
    out
}
