//! Wire and editor data types shared by every component.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::definitions::ConnectorDefinition;

/// Reserved key holding the connector's topic (a name while editing, an id on the wire).
pub const TOPICS_KEY: &str = "topics";

/// Setting that names the connector class on persisted settings.
pub const CLASS_KEY: &str = "connector.class";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicRef {
    pub id: String,
    pub name: String,
}

impl TopicRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The editable form of a connector's settings. `topics` holds a topic *name*.
///
/// Only [`crate::store::TopicMap`] converts between this and [`PersistedSettings`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorConfig(Map<String, Value>);

impl ConnectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The selected topic name, empty when none is selected.
    pub fn topic_name(&self) -> &str {
        self.0
            .get(TOPICS_KEY)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }

    pub fn rows(&self, column_key: &str) -> Option<&Vec<Value>> {
        self.0.get(column_key).and_then(|v| v.as_array())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Returns a copy with `key` replaced.
    pub(crate) fn with(&self, key: &str, value: Value) -> Self {
        let mut map = self.0.clone();
        map.insert(key.to_string(), value);
        Self(map)
    }
}

impl FromIterator<(String, Value)> for ConnectorConfig {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Connector settings as the backend stores them. `topics` holds topic *ids*.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedSettings(Map<String, Value>);

impl PersistedSettings {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Topic ids, accepting either a single id string or an array of ids.
    pub fn topic_ids(&self) -> Vec<String> {
        match self.0.get(TOPICS_KEY) {
            Some(Value::String(id)) if !id.is_empty() => vec![id.clone()],
            Some(Value::Array(ids)) => ids
                .iter()
                .filter_map(|v| v.as_str())
                .filter(|id| !id.is_empty())
                .map(|id| id.to_string())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        self.0.get(CLASS_KEY).and_then(|v| v.as_str())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectorRuntimeState {
    Stopped,
    Running,
    Failed,
    /// Anything the backend reports that the editor has no name for.
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ConnectorRuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectorRuntimeState::Unknown => "UNKNOWN",
            ConnectorRuntimeState::Stopped => "STOPPED",
            ConnectorRuntimeState::Running => "RUNNING",
            ConnectorRuntimeState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Outcome of a backend call: `{data: {result, isSuccess}}`.
///
/// Response bodies come in several shapes; [`Envelope::from_body`] folds them
/// all into this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: EnvelopeData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeData<T> {
    #[serde(default = "Option::default")]
    pub result: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn success(result: T) -> Self {
        Self {
            data: EnvelopeData {
                result: Some(result),
                is_success: Some(true),
                message: None,
            },
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            data: EnvelopeData {
                result: None,
                is_success: Some(false),
                message: Some(message.into()),
            },
        }
    }

    /// Builds the envelope from a 2xx response body.
    ///
    /// Accepts `{data: {result, isSuccess}}`, a bare `{result, isSuccess}`, or
    /// the resource itself, which counts as a confirmed success.
    pub fn from_body(body: Value) -> Result<Self, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        if let Some(data) = body.get("data").filter(|d| is_envelope_data(d)) {
            let data = serde_json::from_value(data.clone())?;
            return Ok(Self { data });
        }
        if is_envelope_data(&body) {
            let data = serde_json::from_value(body)?;
            return Ok(Self { data });
        }
        Ok(Self::success(serde_json::from_value(body)?))
    }

    /// A missing `isSuccess` counts as failure.
    pub fn is_success(&self) -> bool {
        self.data.is_success.unwrap_or(false)
    }

    /// True only when the backend said `isSuccess: false`.
    pub fn is_rejected(&self) -> bool {
        self.data.is_success == Some(false)
    }

    pub fn result(&self) -> Option<&T> {
        self.data.result.as_ref()
    }

    pub fn into_result(self) -> Option<T> {
        self.data.result
    }

    pub fn message(&self) -> Option<&str> {
        self.data.message.as_deref()
    }
}

fn is_envelope_data(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|o| o.contains_key("isSuccess") || o.contains_key("result"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerInfo {
    pub name: String,
    #[serde(default)]
    pub connectors: Vec<ConnectorDefinition>,
}

impl WorkerInfo {
    pub fn definition_for(&self, class_name: &str) -> Option<&ConnectorDefinition> {
        self.connectors.iter().find(|c| c.class_name == class_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default)]
    pub settings: PersistedSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ConnectorRuntimeState>,
}

impl ConnectorInfo {
    pub fn class_name(&self) -> Option<&str> {
        self.class_name
            .as_deref()
            .or_else(|| self.settings.class_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_topic_ids_accepts_string_or_array() {
        let single = PersistedSettings::from_map(
            json!({"topics": "t-1"}).as_object().unwrap().clone(),
        );
        assert_eq!(single.topic_ids(), vec!["t-1".to_string()]);

        let many = PersistedSettings::from_map(
            json!({"topics": ["t-1", "t-2"]}).as_object().unwrap().clone(),
        );
        assert_eq!(many.topic_ids().len(), 2);

        let empty = PersistedSettings::from_map(
            json!({"topics": ""}).as_object().unwrap().clone(),
        );
        assert!(empty.topic_ids().is_empty());
    }

    #[test]
    fn test_envelope_from_body_shapes() {
        let bare: Envelope<ConnectorInfo> =
            Envelope::from_body(json!({"isSuccess": true, "result": {"id": "c1", "settings": {}}}))
                .unwrap();
        assert!(bare.is_success());
        assert_eq!(bare.result().unwrap().id, "c1");

        let raw: Envelope<ConnectorInfo> =
            Envelope::from_body(json!({"id": "c1", "state": "RUNNING", "settings": {}})).unwrap();
        assert!(raw.is_success());
        assert_eq!(raw.result().unwrap().state, Some(ConnectorRuntimeState::Running));

        let wrapped: Envelope<ConnectorInfo> =
            Envelope::from_body(json!({"data": {"isSuccess": false, "message": "nope"}})).unwrap();
        assert!(wrapped.is_rejected());
        assert_eq!(wrapped.message(), Some("nope"));

        let topics: Envelope<Vec<TopicRef>> =
            Envelope::from_body(json!([{"id": "t-1", "name": "orders"}])).unwrap();
        assert_eq!(topics.result().unwrap().len(), 1);

        assert!(Envelope::<ConnectorInfo>::from_body(json!({"name": "no id"})).is_err());
    }

    #[test]
    fn test_envelope_success_rules() {
        let env: Envelope<ConnectorInfo> =
            serde_json::from_value(json!({"data": {"result": {"id": "c1"}}})).unwrap();
        assert!(!env.is_rejected());
        // No isSuccess means failure for side-effect gating.
        assert!(!env.is_success());
        assert_eq!(env.result().unwrap().id, "c1");

        let env: Envelope<ConnectorInfo> =
            serde_json::from_value(json!({"data": {"isSuccess": true}})).unwrap();
        assert!(env.is_success());
        assert!(env.result().is_none());
    }

    #[test]
    fn test_runtime_state_wire_format() {
        let state: ConnectorRuntimeState = serde_json::from_value(json!("RUNNING")).unwrap();
        assert_eq!(state, ConnectorRuntimeState::Running);
        let state: ConnectorRuntimeState = serde_json::from_value(json!("PAUSED")).unwrap();
        assert_eq!(state, ConnectorRuntimeState::Unknown);
        assert_eq!(ConnectorRuntimeState::Failed.to_string(), "FAILED");

        let info: ConnectorInfo =
            serde_json::from_value(json!({"id": "c1", "state": "REBALANCING"})).unwrap();
        assert_eq!(info.state, Some(ConnectorRuntimeState::Unknown));
    }

    #[test]
    fn test_connector_class_falls_back_to_setting() {
        let info: ConnectorInfo = serde_json::from_value(json!({
            "id": "c1",
            "settings": {"connector.class": "com.example.Source"}
        }))
        .unwrap();
        assert_eq!(info.class_name(), Some("com.example.Source"));
    }
}
