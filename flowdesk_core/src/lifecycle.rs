use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::PipelineApi;
use crate::graph::{GraphOwner, GraphPatch};
use crate::model::ConnectorRuntimeState;
use crate::notify::{pipeline_edit_path, Navigator, Notifier, CONNECTOR_DELETION_SUCCESS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Start,
    Stop,
}

/// Start/stop/delete against the backend. Failures leave local state untouched.
pub struct LifecycleController {
    api: Arc<dyn PipelineApi>,
    graph: Arc<dyn GraphOwner>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl LifecycleController {
    pub fn new(
        api: Arc<dyn PipelineApi>,
        graph: Arc<dyn GraphOwner>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            api,
            graph,
            notifier,
            navigator,
        }
    }

    /// Returns the new runtime state when the backend confirmed the action.
    pub async fn trigger(
        &self,
        connector_id: &str,
        action: LifecycleAction,
    ) -> Option<ConnectorRuntimeState> {
        let response = match action {
            LifecycleAction::Start => self.api.start_connector(connector_id).await,
            LifecycleAction::Stop => self.api.stop_connector(connector_id).await,
        };
        let envelope = match response {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(target: "flowdesk.lifecycle", connector = connector_id, ?action, "request failed: {}", e);
                return None;
            }
        };
        if !envelope.is_success() {
            return None;
        }

        let state = envelope.result().and_then(|c| c.state)?;
        info!(target: "flowdesk.lifecycle", connector = connector_id, %state, "connector state changed");
        self.graph
            .apply_patch(GraphPatch::new(connector_id).set("state", json!(state)))
            .await;
        Some(state)
    }

    /// Deletes the connector, then refreshes the graph and navigates back to its pipeline.
    pub async fn delete(&self, connector_id: &str, connector_name: &str, pipeline_id: &str) -> bool {
        match self.api.delete_connector(connector_id).await {
            Ok(envelope) if envelope.is_success() => {}
            Ok(_) => return false,
            Err(e) => {
                warn!(target: "flowdesk.lifecycle", connector = connector_id, "delete failed: {}", e);
                return false;
            }
        }

        self.notifier
            .notify_success(&format!("{} {}", CONNECTOR_DELETION_SUCCESS, connector_name));
        if let Err(e) = self.graph.refresh().await {
            warn!(target: "flowdesk.lifecycle", pipeline = pipeline_id, "graph refresh failed: {}", e);
        }
        self.navigator.navigate(&pipeline_edit_path(pipeline_id));
        true
    }
}
