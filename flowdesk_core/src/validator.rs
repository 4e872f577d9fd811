use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::PipelineApi;
use crate::model::ConnectorConfig;
use crate::notify::{Notifier, TEST_SUCCESS};
use crate::store::TopicMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_success: bool,
}

/// Runs the backend's "test connection" check against the current config.
///
/// Never fails: transport errors and unresolved topics report `is_success = false`.
pub struct Validator {
    api: Arc<dyn PipelineApi>,
    notifier: Arc<dyn Notifier>,
}

impl Validator {
    pub fn new(api: Arc<dyn PipelineApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    pub async fn validate(&self, config: &ConnectorConfig, topics: &TopicMap) -> ValidationReport {
        let (settings, topic_id) = topics.to_persisted(config);
        if topic_id.is_none() {
            debug!(
                target: "flowdesk.validator",
                topic = config.topic_name(),
                "topic does not resolve to an id, skipping validation"
            );
            return ValidationReport { is_success: false };
        }

        match self.api.validate_connector(&settings).await {
            Ok(envelope) if envelope.is_success() => {
                self.notifier.notify_success(TEST_SUCCESS);
                ValidationReport { is_success: true }
            }
            Ok(envelope) => {
                debug!(
                    target: "flowdesk.validator",
                    message = envelope.message().unwrap_or_default(),
                    "validation reported failure"
                );
                ValidationReport { is_success: false }
            }
            Err(e) => {
                warn!(target: "flowdesk.validator", "validation request failed: {}", e);
                ValidationReport { is_success: false }
            }
        }
    }
}
