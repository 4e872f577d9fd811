use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::PipelineApi;
use crate::graph::{Graph, GraphOwner, GraphPatch};
use crate::model::ConnectorConfig;
use crate::store::TopicMap;

/// Pushes a config snapshot to the backend and reflects its topic link in the graph.
pub struct Persister {
    api: Arc<dyn PipelineApi>,
    graph: Arc<dyn GraphOwner>,
}

impl Persister {
    pub fn new(api: Arc<dyn PipelineApi>, graph: Arc<dyn GraphOwner>) -> Self {
        Self { api, graph }
    }

    /// Returns whether the backend confirmed the update. No retries.
    pub async fn persist(
        &self,
        connector_id: &str,
        config: &ConnectorConfig,
        topics: &TopicMap,
    ) -> bool {
        let (settings, topic_id) = topics.to_persisted(config);
        if topic_id.is_none() {
            debug!(
                target: "flowdesk.persister",
                connector = connector_id,
                topic = config.topic_name(),
                "topic unresolved, saving with an empty id"
            );
        }

        match self.api.update_connector(connector_id, &settings).await {
            Ok(envelope) if envelope.is_success() => {
                info!(target: "flowdesk.persister", connector = connector_id, "connector saved");
                let graph = self.graph.graph().await;
                if let Some(patch) = topic_patch(&graph, connector_id, topic_id.as_deref()) {
                    self.graph.apply_patch(patch).await;
                }
                true
            }
            Ok(envelope) => {
                warn!(
                    target: "flowdesk.persister",
                    connector = connector_id,
                    "save rejected: {}",
                    envelope.message().unwrap_or("no success flag")
                );
                false
            }
            Err(e) => {
                warn!(target: "flowdesk.persister", connector = connector_id, "save failed: {}", e);
                false
            }
        }
    }
}

/// The patch linking `connector_id`'s node to its topic. `None` if the node is not in the graph.
pub fn topic_patch(graph: &Graph, connector_id: &str, topic_id: Option<&str>) -> Option<GraphPatch> {
    graph.find_node_by_id(connector_id)?;
    let to: Vec<&str> = topic_id.into_iter().collect();
    Some(GraphPatch::new(connector_id).set("to", json!(to)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphNode;

    #[test]
    fn test_topic_patch() {
        let graph = Graph::new(vec![GraphNode::new("c1", "source", "source")]);
        let patch = topic_patch(&graph, "c1", Some("t-1")).unwrap();
        assert_eq!(patch.fields.get("to"), Some(&json!(["t-1"])));

        let cleared = topic_patch(&graph, "c1", None).unwrap();
        assert_eq!(cleared.fields.get("to"), Some(&json!([])));

        assert!(topic_patch(&graph, "other", Some("t-1")).is_none());
    }
}
