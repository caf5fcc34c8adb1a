//! Local view over a query result.
//!
//! Wraps petgraph with a name index so the CLI can walk relations and
//! group entities without further round trips to the store.

use crate::query::GraphView;
use grove_core::{Entity, EntityType, Relation};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<Entity, String>,

    /// Entity name to node.
    name_index: HashMap<String, NodeIndex>,

    /// Relations whose endpoints were not part of the view.
    unresolved: Vec<Relation>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_view(view: GraphView) -> Self {
        let mut graph = Self::new();
        for entity in view.entities {
            graph.add_entity(entity);
        }
        for relation in view.relations {
            graph.add_relation(relation);
        }
        graph
    }

    /// Adds an entity. A second entity with the same name is ignored.
    pub fn add_entity(&mut self, entity: Entity) -> NodeIndex {
        if let Some(&index) = self.name_index.get(&entity.name) {
            debug!("Duplicate entity {}", entity.name);
            return index;
        }
        let name = entity.name.clone();
        let index = self.graph.add_node(entity);
        self.name_index.insert(name, index);
        index
    }

    /// Adds a relation, or records it as unresolved if an endpoint is missing.
    pub fn add_relation(&mut self, relation: Relation) {
        let from = self.name_index.get(&relation.from).copied();
        let to = self.name_index.get(&relation.to).copied();
        match (from, to) {
            (Some(from), Some(to)) => {
                self.graph.add_edge(from, to, relation.relation_type);
            }
            _ => self.unresolved.push(relation),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Entity> {
        let index = self.name_index.get(name)?;
        self.graph.node_weight(*index)
    }

    /// Entities in insertion order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.graph.node_weights()
    }

    pub fn unresolved(&self) -> &[Relation] {
        &self.unresolved
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<(&str, &Entity)> {
        let Some(&index) = self.name_index.get(name) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(index, direction)
            .filter_map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                Some((edge.id(), edge.weight().as_str(), self.graph.node_weight(other)?))
            })
            .collect();
        // petgraph yields newest edges first.
        edges.sort_by_key(|(id, _, _)| *id);
        edges.into_iter().map(|(_, kind, e)| (kind, e)).collect()
    }

    /// `(relationType, target)` for each relation leaving `name`.
    pub fn outgoing(&self, name: &str) -> Vec<(&str, &Entity)> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// `(relationType, source)` for each relation arriving at `name`.
    pub fn incoming(&self, name: &str) -> Vec<(&str, &Entity)> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Resolved relations touching `name`: incoming first, then outgoing.
    pub fn relations_of(&self, name: &str) -> Vec<Relation> {
        let incoming = self.incoming(name).into_iter().map(|(kind, from)| Relation {
            from: from.name.clone(),
            to: name.to_string(),
            relation_type: kind.to_string(),
        });
        let outgoing = self.outgoing(name).into_iter().map(|(kind, to)| Relation {
            from: name.to_string(),
            to: to.name.clone(),
            relation_type: kind.to_string(),
        });
        incoming.chain(outgoing).collect()
    }

    /// Entity counts per type, in order of first appearance.
    pub fn counts_by_type(&self) -> Vec<(EntityType, usize)> {
        let mut counts: Vec<(EntityType, usize)> = Vec::new();
        for entity in self.entities() {
            match counts.iter_mut().find(|(t, _)| *t == entity.entity_type) {
                Some((_, n)) => *n += 1,
                None => counts.push((entity.entity_type.clone(), 1)),
            }
        }
        counts
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
