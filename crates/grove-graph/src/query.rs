//! Read-only queries against the store.

use grove_core::{Entity, EntityType, Relation};
use grove_mcp::{ClientError, ToolInvoker};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// Entities and relations returned by a read tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphView {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl GraphView {
    /// Decodes a tool result.
    ///
    /// Accepts the graph object itself, or an MCP content list whose first
    /// text item holds the graph as JSON. `null` decodes as an empty view.
    pub fn from_result(result: Value) -> Result<Self, ClientError> {
        if result.is_null() {
            return Ok(Self::default());
        }

        let text = result
            .get("content")
            .and_then(Value::as_array)
            .and_then(|items| items.iter().find_map(|i| i.get("text")?.as_str()));
        let decoded = match text {
            Some(text) => serde_json::from_str(text),
            None => serde_json::from_value(result),
        };

        decoded.map_err(|e| ClientError::Protocol(format!("unexpected graph shape: {}", e)))
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Relations with `name` at either end, in store order.
    pub fn relations_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Relation> + 'a {
        self.relations
            .iter()
            .filter(move |r| r.from == name || r.to == name)
    }
}

/// Issues read tools and decodes their results.
pub struct GraphQuery<'a> {
    invoker: &'a dyn ToolInvoker,
}

impl<'a> GraphQuery<'a> {
    pub fn new(invoker: &'a dyn ToolInvoker) -> Self {
        Self { invoker }
    }

    async fn read(&self, tool: &str, params: Value) -> Result<GraphView, ClientError> {
        let result = self.invoker.call_tool(tool, params).await?;
        let view = GraphView::from_result(result)?;
        debug!(
            "{} returned {} entities, {} relations",
            tool,
            view.entities.len(),
            view.relations.len()
        );
        Ok(view)
    }

    /// `search_nodes`; results are passed through as the store returns them.
    pub async fn search(&self, query: &str) -> Result<GraphView, ClientError> {
        self.read("search_nodes", json!({ "query": query })).await
    }

    /// `open_nodes` for exact names.
    pub async fn open(&self, names: &[String]) -> Result<GraphView, ClientError> {
        self.read("open_nodes", json!({ "names": names })).await
    }

    /// `read_graph`
    pub async fn read_all(&self) -> Result<GraphView, ClientError> {
        self.read("read_graph", json!({})).await
    }

    /// Every `Project` entity in the store, sorted by name.
    pub async fn list_projects(&self) -> Result<Vec<Entity>, ClientError> {
        let mut projects: Vec<Entity> = self
            .read_all()
            .await?
            .entities
            .into_iter()
            .filter(|e| e.entity_type == EntityType::Project)
            .collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingInvoker;

    fn graph() -> Value {
        json!({
            "entities": [
                {"name": "web", "entityType": "Project", "observations": ["Name: web"]},
                {"name": "web/app.ts", "entityType": "File", "observations": []},
                {"name": "api", "entityType": "Project", "observations": []}
            ],
            "relations": [
                {"from": "web", "to": "web/app.ts", "relationType": "contains"}
            ]
        })
    }

    #[tokio::test]
    async fn test_search_sends_query() {
        let invoker = RecordingInvoker::default().with_graph(graph());
        let view = GraphQuery::new(&invoker).search("web").await.unwrap();

        assert_eq!(view.entities.len(), 3);
        let calls = invoker.calls();
        assert_eq!(calls[0].0, "search_nodes");
        assert_eq!(calls[0].1, json!({"query": "web"}));
    }

    #[tokio::test]
    async fn test_open_sends_names() {
        let invoker = RecordingInvoker::default().with_graph(graph());
        GraphQuery::new(&invoker)
            .open(&["web".to_string()])
            .await
            .unwrap();

        let calls = invoker.calls();
        assert_eq!(calls[0].0, "open_nodes");
        assert_eq!(calls[0].1, json!({"names": ["web"]}));
    }

    #[tokio::test]
    async fn test_list_projects_filters_and_sorts() {
        let invoker = RecordingInvoker::default().with_graph(graph());
        let projects = GraphQuery::new(&invoker).list_projects().await.unwrap();

        let names: Vec<&str> = projects.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["api", "web"]);
        assert_eq!(invoker.calls()[0].0, "read_graph");
    }

    #[test]
    fn test_content_wrapped_result() {
        let text = serde_json::to_string(&graph()).unwrap();
        let wrapped = json!({"content": [{"type": "text", "text": text}]});

        let view = GraphView::from_result(wrapped).unwrap();
        assert_eq!(view.entities[0].name, "web");
        assert_eq!(view.relations.len(), 1);
    }

    #[test]
    fn test_missing_keys_default_empty() {
        let view = GraphView::from_result(json!({})).unwrap();
        assert!(view.is_empty());
        assert!(GraphView::from_result(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_bad_shape_is_protocol_error() {
        let err = GraphView::from_result(json!({"entities": "nope"})).unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[test]
    fn test_relations_of() {
        let view = GraphView::from_result(graph()).unwrap();
        assert_eq!(view.relations_of("web/app.ts").count(), 1);
        assert_eq!(view.relations_of("api").count(), 0);
    }
}
