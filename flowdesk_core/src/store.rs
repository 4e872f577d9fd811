//! Editor state: the connector's editable config plus topic name/id mappings.

use serde_json::Value;

use crate::definitions::ConnectorDefinition;
use crate::loader::resolve_topic_name;
use crate::model::{ConnectorConfig, PersistedSettings, TopicRef, TOPICS_KEY};

/// Bidirectional topic id/name lookup over the cluster's known topics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicMap {
    topics: Vec<TopicRef>,
}

impl TopicMap {
    pub fn new(topics: Vec<TopicRef>) -> Self {
        Self { topics }
    }

    pub fn topics(&self) -> &[TopicRef] {
        &self.topics
    }

    pub fn name_for_id(&self, id: &str) -> Option<&str> {
        self.topics
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.name.as_str())
    }

    /// The id of the single topic called `name`. Unknown and ambiguous names resolve to `None`.
    pub fn id_for_name(&self, name: &str) -> Option<&str> {
        if name.is_empty() {
            return None;
        }
        let mut matches = self.topics.iter().filter(|t| t.name == name);
        match (matches.next(), matches.next()) {
            (Some(topic), None) => Some(topic.id.as_str()),
            _ => None,
        }
    }

    /// Load boundary: persisted topic id becomes an editable name (empty when unknown).
    pub fn to_editable(&self, settings: PersistedSettings) -> ConnectorConfig {
        let name = resolve_topic_name(&self.topics, &settings);
        let mut map = settings.into_map();
        map.insert(TOPICS_KEY.to_string(), Value::String(name));
        ConnectorConfig::from_map(map)
    }

    /// Save boundary: the editable topic name becomes an id.
    ///
    /// An unresolved name is written as an empty id rather than rejected; the
    /// resolved id is returned alongside so callers can tell the two apart.
    pub fn to_persisted(&self, config: &ConnectorConfig) -> (PersistedSettings, Option<String>) {
        let topic_id = self
            .id_for_name(config.topic_name())
            .map(|id| id.to_string());
        let mut map = config.as_map().clone();
        map.insert(
            TOPICS_KEY.to_string(),
            Value::String(topic_id.clone().unwrap_or_default()),
        );
        (PersistedSettings::from_map(map), topic_id)
    }
}

/// Holds what the editor shows. No I/O happens here.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    definition: Option<ConnectorDefinition>,
    config: Option<ConnectorConfig>,
    known_topics: TopicMap,
    // Set when the caller pushed a topic list since the last clear; that list
    // is newer than whatever the in-flight load fetched.
    topics_pushed: bool,
    topic_names: Vec<String>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn populate(
        &mut self,
        definition: ConnectorDefinition,
        config: ConnectorConfig,
        known_topics: TopicMap,
    ) {
        self.definition = Some(definition);
        self.config = Some(config);
        if !self.topics_pushed {
            self.known_topics = known_topics;
        }
    }

    /// Drops the connector-specific part; pipeline topic names survive.
    pub fn clear(&mut self) {
        self.definition = None;
        self.config = None;
        self.topics_pushed = false;
    }

    pub fn is_loaded(&self) -> bool {
        self.definition.is_some() && self.config.is_some()
    }

    pub fn definition(&self) -> Option<&ConnectorDefinition> {
        self.definition.as_ref()
    }

    pub fn config(&self) -> Option<&ConnectorConfig> {
        self.config.as_ref()
    }

    pub fn replace_config(&mut self, config: ConnectorConfig) {
        self.config = Some(config);
    }

    pub fn known_topics(&self) -> &TopicMap {
        &self.known_topics
    }

    pub fn set_known_topics(&mut self, topics: Vec<TopicRef>) {
        self.known_topics = TopicMap::new(topics);
        self.topics_pushed = true;
    }

    /// Names offered in the topic picker.
    pub fn topic_names(&self) -> &[String] {
        &self.topic_names
    }

    pub fn set_pipeline_topics(&mut self, topics: &[TopicRef]) {
        self.topic_names = topics.iter().map(|t| t.name.clone()).collect();
    }

    /// Keys of required fields that are absent or empty in the current config.
    pub fn missing_required(&self) -> Vec<String> {
        let (Some(def), Some(config)) = (&self.definition, &self.config) else {
            return Vec::new();
        };
        def.definitions
            .iter()
            .filter(|field| field.required)
            .filter(|field| match config.get(&field.key) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(Value::Array(rows)) => rows.is_empty(),
                Some(_) => false,
            })
            .map(|field| field.key.clone())
            .collect()
    }
}
