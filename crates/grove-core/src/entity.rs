//! Entity and relation records.
//!
//! These are the two record shapes the knowledge store understands. They
//! serialize to the store's wire names (`entityType`, `relationType`) so a
//! batch can be handed to `create_entities` / `create_relations` as-is.

use serde::{Deserialize, Serialize};

/// The type tag of an entity.
///
/// The set Grove emits is closed, but the store may hold entities written by
/// other tools, so unknown tags survive a round trip through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    Project,
    Directory,
    File,
    Component,
    ConfigFile,
    Other(String),
}

impl EntityType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Project => "Project",
            Self::Directory => "Directory",
            Self::File => "File",
            Self::Component => "Component",
            Self::ConfigFile => "ConfigFile",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for EntityType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Project" => Self::Project,
            "Directory" => Self::Directory,
            "File" => Self::File,
            "Component" => Self::Component,
            "ConfigFile" => Self::ConfigFile,
            _ => Self::Other(s),
        }
    }
}

impl From<EntityType> for String {
    fn from(t: EntityType) -> Self {
        match t {
            EntityType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The relation tags Grove emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Parent directory or project holds a directory or file.
    Contains,

    /// Parent owns a promoted component (e.g. a dev-container folder).
    Has,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Has => "has",
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named node in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Globally unique name, used as the join key for relations.
    pub name: String,

    #[serde(rename = "entityType")]
    pub entity_type: EntityType,

    /// Free-text facts, in insertion order.
    #[serde(default)]
    pub observations: Vec<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
            observations: Vec::new(),
        }
    }

    /// Appends an observation, keeping insertion order.
    pub fn observe(&mut self, observation: impl Into<String>) {
        self.observations.push(observation.into());
    }

    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        self.observe(observation);
        self
    }
}

/// A directed, typed edge between two entities identified by name.
///
/// The relation type is kept as a free-form string because the store accepts
/// any tag and older graphs use upper-case variants (`CONTAINS`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub from: String,
    pub to: String,
    #[serde(rename = "relationType")]
    pub relation_type: String,
}

impl Relation {
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            relation_type: kind.as_str().to_string(),
        }
    }
}

/// Entities and relations produced for one scope, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphBatch {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
}

impl GraphBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends another batch, preserving the order of both.
    pub fn extend(&mut self, other: GraphBatch) {
        self.entities.extend(other.entities);
        self.relations.extend(other.relations);
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_wire_names() {
        let entity = Entity::new("demo", EntityType::Project).with_observation("Name: demo");
        let json = serde_json::to_value(&entity).unwrap();

        assert_eq!(json["name"], "demo");
        assert_eq!(json["entityType"], "Project");
        assert_eq!(json["observations"][0], "Name: demo");
    }

    #[test]
    fn test_unknown_entity_type_survives() {
        let json = serde_json::json!({
            "name": "alice",
            "entityType": "Person",
        });
        let entity: Entity = serde_json::from_value(json).unwrap();

        assert_eq!(entity.entity_type, EntityType::Other("Person".into()));
        assert!(entity.observations.is_empty());
        assert_eq!(serde_json::to_value(&entity).unwrap()["entityType"], "Person");
    }

    #[test]
    fn test_relation_wire_names() {
        let rel = Relation::new("demo", "demo/src", RelationKind::Contains);
        let json = serde_json::to_value(&rel).unwrap();

        assert_eq!(json["from"], "demo");
        assert_eq!(json["to"], "demo/src");
        assert_eq!(json["relationType"], "contains");
    }
}
