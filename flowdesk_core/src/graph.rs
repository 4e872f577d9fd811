//! The pipeline graph as seen from the connector editor.
//!
//! The editor never owns graph nodes. It reads snapshots through a
//! [`GraphOwner`] and asks the owner to merge [`GraphPatch`]es keyed by node id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::api::PipelineApi;
use crate::error::SyncError;
use crate::model::ConnectorRuntimeState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ConnectorRuntimeState>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            to: Vec::new(),
            state: None,
            extra: Map::new(),
        }
    }
}

/// A partial node update: `{id, fields...}` merged shallowly onto the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPatch {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl GraphPatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    pub fn set(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub objects: Vec<GraphNode>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: Vec<GraphNode>,
}

impl Graph {
    pub fn new(nodes: Vec<GraphNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn find_node_by_id(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Merges `patch` onto its node. Returns `false` when no node has that id.
    pub fn apply_patch(&mut self, patch: &GraphPatch) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == patch.id) else {
            return false;
        };
        let mut merged = match serde_json::to_value(&*node) {
            Ok(Value::Object(map)) => map,
            _ => return false,
        };
        for (key, value) in &patch.fields {
            if key != "id" {
                merged.insert(key.clone(), value.clone());
            }
        }
        match serde_json::from_value::<GraphNode>(Value::Object(merged)) {
            Ok(updated) => {
                *node = updated;
                true
            }
            Err(e) => {
                debug!(target: "flowdesk.graph", node = %patch.id, "graph patch rejected: {}", e);
                false
            }
        }
    }
}

/// Whoever owns the pipeline graph the editor reflects changes into.
#[async_trait]
pub trait GraphOwner: Send + Sync {
    async fn graph(&self) -> Graph;
    async fn apply_patch(&self, patch: GraphPatch);
    async fn refresh(&self) -> Result<(), SyncError>;
}

/// A graph held in memory, mainly for testing and detached sessions.
pub struct InMemoryGraph {
    graph: Mutex<Graph>,
    refreshes: AtomicUsize,
}

impl InMemoryGraph {
    pub fn new(nodes: Vec<GraphNode>) -> Self {
        Self {
            graph: Mutex::new(Graph::new(nodes)),
            refreshes: AtomicUsize::new(0),
        }
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryGraph {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl GraphOwner for InMemoryGraph {
    async fn graph(&self) -> Graph {
        self.graph.lock().map(|g| g.clone()).unwrap_or_default()
    }

    async fn apply_patch(&self, patch: GraphPatch) {
        if let Ok(mut graph) = self.graph.lock() {
            if !graph.apply_patch(&patch) {
                debug!(target: "flowdesk.graph", node = %patch.id, "patch for unknown node ignored");
            }
        }
    }

    async fn refresh(&self) -> Result<(), SyncError> {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// The graph of one backend pipeline; `refresh` re-fetches it.
pub struct PipelineGraph {
    api: Arc<dyn PipelineApi>,
    pipeline_id: String,
    graph: Mutex<Graph>,
}

impl PipelineGraph {
    pub async fn load(api: Arc<dyn PipelineApi>, pipeline_id: &str) -> Result<Self, SyncError> {
        let owner = Self {
            api,
            pipeline_id: pipeline_id.to_string(),
            graph: Mutex::new(Graph::default()),
        };
        owner.refresh().await?;
        Ok(owner)
    }
}

#[async_trait]
impl GraphOwner for PipelineGraph {
    async fn graph(&self) -> Graph {
        self.graph.lock().map(|g| g.clone()).unwrap_or_default()
    }

    async fn apply_patch(&self, patch: GraphPatch) {
        if let Ok(mut graph) = self.graph.lock() {
            graph.apply_patch(&patch);
        }
    }

    async fn refresh(&self) -> Result<(), SyncError> {
        let pipeline = self
            .api
            .fetch_pipeline(&self.pipeline_id)
            .await?
            .into_result()
            .ok_or_else(|| SyncError::NotFound(format!("pipeline {}", self.pipeline_id)))?;
        let mut graph = self
            .graph
            .lock()
            .map_err(|e| SyncError::Config(format!("graph lock poisoned: {}", e)))?;
        *graph = Graph::new(pipeline.objects);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_merges_shallowly() {
        let mut source = GraphNode::new("c1", "source", "com.example.Source");
        source.extra.insert("x".into(), json!(1));
        let mut graph = Graph::new(vec![source, GraphNode::new("t1", "orders", "topic")]);

        let patch = GraphPatch::new("c1")
            .set("to", json!(["t1"]))
            .set("state", json!("RUNNING"));
        assert!(graph.apply_patch(&patch));

        let node = graph.find_node_by_id("c1").unwrap();
        assert_eq!(node.to, vec!["t1".to_string()]);
        assert_eq!(node.state, Some(ConnectorRuntimeState::Running));
        assert_eq!(node.name, "source");
        assert_eq!(node.extra.get("x"), Some(&json!(1)));
    }

    #[test]
    fn test_patch_for_unknown_node() {
        let mut graph = Graph::default();
        assert!(!graph.apply_patch(&GraphPatch::new("missing").set("to", json!([]))));
        assert!(graph.find_node_by_id("missing").is_none());
    }

    #[test]
    fn test_patch_wire_format() {
        let patch = GraphPatch::new("c1").set("to", json!(["t1"]));
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"id": "c1", "to": ["t1"]})
        );
    }

    #[tokio::test]
    async fn test_in_memory_owner() {
        let owner = InMemoryGraph::new(vec![GraphNode::new("c1", "source", "source")]);
        owner
            .apply_patch(GraphPatch::new("c1").set("to", json!(["t9"])))
            .await;
        owner.refresh().await.unwrap();
        let graph = owner.graph().await;
        assert_eq!(graph.find_node_by_id("c1").unwrap().to, vec!["t9".to_string()]);
        assert_eq!(owner.refresh_count(), 1);
    }
}
