use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::PipelineApi;
use crate::definitions::ConnectorDefinition;
use crate::error::SyncError;
use crate::model::{ConnectorConfig, ConnectorRuntimeState, Envelope, PersistedSettings, TopicRef};
use crate::store::TopicMap;

/// Everything the editor needs before it accepts the first edit.
#[derive(Debug, Clone)]
pub struct LoadedConnector {
    pub connector_id: String,
    pub name: Option<String>,
    pub definition: ConnectorDefinition,
    pub config: ConnectorConfig,
    pub runtime_state: ConnectorRuntimeState,
    pub topics: Vec<TopicRef>,
}

pub struct MetadataLoader {
    api: Arc<dyn PipelineApi>,
}

impl MetadataLoader {
    pub fn new(api: Arc<dyn PipelineApi>) -> Self {
        Self { api }
    }

    /// Fetches the worker's field definitions, the connector's persisted
    /// settings and the known topics, and builds the initial editable config.
    pub async fn load_metadata(
        &self,
        connector_id: &str,
        worker_cluster: &str,
    ) -> Result<LoadedConnector, SyncError> {
        let (worker, connector, topics) = futures::join!(
            self.api.fetch_worker(worker_cluster),
            self.api.fetch_connector(connector_id),
            self.api.fetch_topics(),
        );

        let worker = accepted(worker?, || format!("worker {}", worker_cluster))?;
        let connector = accepted(connector?, || format!("connector {}", connector_id))?;
        // Deployments without a topics route still load; nothing will resolve.
        let topics = match topics {
            Ok(envelope) => envelope.into_result().unwrap_or_default(),
            Err(e) if e.is_not_found() => {
                warn!(target: "flowdesk.loader", "topic list unavailable: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let class_name = connector.class_name().ok_or_else(|| {
            SyncError::NotFound(format!("connector class of {}", connector_id))
        })?;
        let definition = worker.definition_for(class_name).cloned().ok_or_else(|| {
            SyncError::NotFound(format!(
                "connector class {} on worker {}",
                class_name, worker.name
            ))
        })?;

        debug!(
            target: "flowdesk.loader",
            connector = connector_id,
            fields = definition.definitions.len(),
            topics = topics.len(),
            "connector metadata loaded"
        );

        let topic_map = TopicMap::new(topics.clone());
        let config = with_defaults(&definition, topic_map.to_editable(connector.settings));

        Ok(LoadedConnector {
            connector_id: connector.id,
            name: connector.name,
            definition,
            config,
            runtime_state: connector.state.unwrap_or_default(),
            topics,
        })
    }
}

/// A refused read is `Rejected`; a read that succeeded with nothing in it is `NotFound`.
fn accepted<T>(envelope: Envelope<T>, what: impl Fn() -> String) -> Result<T, SyncError> {
    if envelope.is_rejected() {
        let reason = envelope.message().unwrap_or("no reason given").to_string();
        return Err(SyncError::Rejected(format!("{}: {}", what(), reason)));
    }
    envelope
        .into_result()
        .ok_or_else(|| SyncError::NotFound(what()))
}

/// Name of the topic the connector is persisted against; empty when none matches.
pub fn resolve_topic_name(topics: &[TopicRef], settings: &PersistedSettings) -> String {
    settings
        .topic_ids()
        .first()
        .and_then(|id| topics.iter().find(|t| &t.id == id))
        .map(|t| t.name.clone())
        .unwrap_or_default()
}

/// Fills keys the connector has no setting for from the definitions' defaults.
fn with_defaults(definition: &ConnectorDefinition, config: ConnectorConfig) -> ConnectorConfig {
    let mut map = config.into_map();
    for field in &definition.definitions {
        if let Some(default) = &field.default_value {
            map.entry(field.key.clone())
                .or_insert_with(|| default.clone());
        }
    }
    ConnectorConfig::from_map(map)
}
