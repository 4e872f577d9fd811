#![allow(dead_code)]

use async_trait::async_trait;
use flowdesk_core::graph::Pipeline;
use flowdesk_core::model::{ConnectorInfo, WorkerInfo};
use flowdesk_core::{
    Collaborators, ConnectorRuntimeState, Envelope, GraphNode, InMemoryGraph, MemoryNotifier,
    PersistedSettings, PipelineApi, SyncError, SyncHandle, SyncOrchestrator, TopicRef,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CLASS: &str = "io.flowdesk.source.perf.PerfSource";
pub const WORKER: &str = "wk00";
pub const PIPELINE: &str = "p-1";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FetchWorker(String),
    FetchConnector(String),
    Update(String, PersistedSettings),
    Delete(String),
    Start(String),
    Stop(String),
    Validate(PersistedSettings),
    FetchTopics,
    FetchPipeline(String),
}

/// A backend that records every call. Each call takes `latency` of (paused) tokio time.
pub struct MockApi {
    pub latency: Duration,
    pub topics: Mutex<Vec<TopicRef>>,
    pub connectors: Mutex<Vec<ConnectorInfo>>,
    pub update_ok: AtomicBool,
    pub validate_ok: AtomicBool,
    pub delete_ok: AtomicBool,
    /// When false the worker request fails the way a 5xx does.
    pub worker_ok: AtomicBool,
    /// When false the topics route answers 404.
    pub topics_route: AtomicBool,
    calls: Mutex<Vec<Call>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            latency: Duration::from_millis(50),
            topics: Mutex::new(vec![
                TopicRef::new("t-1", "orders"),
                TopicRef::new("t-2", "payments"),
            ]),
            connectors: Mutex::new(vec![connector("c1", "perf"), connector("c2", "perf-2")]),
            update_ok: AtomicBool::new(true),
            validate_ok: AtomicBool::new(true),
            delete_ok: AtomicBool::new(true),
            worker_ok: AtomicBool::new(true),
            topics_route: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn without_connectors(self) -> Self {
        self.connectors.lock().unwrap().clear();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(String, PersistedSettings)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Update(id, settings) => Some((id, settings)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    async fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
        tokio::time::sleep(self.latency).await;
    }

    fn find(&self, id: &str) -> Option<ConnectorInfo> {
        self.connectors
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    fn with_state(&self, id: &str, state: ConnectorRuntimeState) -> Envelope<ConnectorInfo> {
        match self.find(id) {
            Some(mut info) => {
                info.state = Some(state);
                Envelope::success(info)
            }
            None => Envelope::failure("no such connector"),
        }
    }
}

#[async_trait]
impl PipelineApi for MockApi {
    async fn fetch_worker(&self, cluster_name: &str) -> Result<Envelope<WorkerInfo>, SyncError> {
        self.record(Call::FetchWorker(cluster_name.to_string())).await;
        if cluster_name != WORKER {
            return Err(SyncError::NotFound(format!("worker {}", cluster_name)));
        }
        if !self.worker_ok.load(Ordering::SeqCst) {
            return Ok(Envelope::failure("500 Internal Server Error"));
        }
        Ok(Envelope::success(worker()))
    }

    async fn fetch_connector(
        &self,
        connector_id: &str,
    ) -> Result<Envelope<ConnectorInfo>, SyncError> {
        self.record(Call::FetchConnector(connector_id.to_string()))
            .await;
        self.find(connector_id)
            .map(Envelope::success)
            .ok_or_else(|| SyncError::NotFound(format!("connector {}", connector_id)))
    }

    async fn update_connector(
        &self,
        connector_id: &str,
        settings: &PersistedSettings,
    ) -> Result<Envelope<ConnectorInfo>, SyncError> {
        self.record(Call::Update(connector_id.to_string(), settings.clone()))
            .await;
        if !self.update_ok.load(Ordering::SeqCst) {
            return Ok(Envelope::failure("update rejected"));
        }
        let mut connectors = self.connectors.lock().unwrap();
        match connectors.iter_mut().find(|c| c.id == connector_id) {
            Some(info) => {
                info.settings = settings.clone();
                Ok(Envelope::success(info.clone()))
            }
            None => Err(SyncError::NotFound(format!("connector {}", connector_id))),
        }
    }

    async fn delete_connector(&self, connector_id: &str) -> Result<Envelope<Value>, SyncError> {
        self.record(Call::Delete(connector_id.to_string())).await;
        if self.delete_ok.load(Ordering::SeqCst) {
            Ok(Envelope::success(json!({})))
        } else {
            Ok(Envelope::failure("delete rejected"))
        }
    }

    async fn start_connector(
        &self,
        connector_id: &str,
    ) -> Result<Envelope<ConnectorInfo>, SyncError> {
        self.record(Call::Start(connector_id.to_string())).await;
        Ok(self.with_state(connector_id, ConnectorRuntimeState::Running))
    }

    async fn stop_connector(
        &self,
        connector_id: &str,
    ) -> Result<Envelope<ConnectorInfo>, SyncError> {
        self.record(Call::Stop(connector_id.to_string())).await;
        Ok(self.with_state(connector_id, ConnectorRuntimeState::Stopped))
    }

    async fn validate_connector(
        &self,
        settings: &PersistedSettings,
    ) -> Result<Envelope<Value>, SyncError> {
        self.record(Call::Validate(settings.clone())).await;
        if self.validate_ok.load(Ordering::SeqCst) {
            Ok(Envelope::success(json!({})))
        } else {
            Ok(Envelope::failure("connection refused"))
        }
    }

    async fn fetch_topics(&self) -> Result<Envelope<Vec<TopicRef>>, SyncError> {
        self.record(Call::FetchTopics).await;
        if !self.topics_route.load(Ordering::SeqCst) {
            return Err(SyncError::NotFound("topics".to_string()));
        }
        Ok(Envelope::success(self.topics.lock().unwrap().clone()))
    }

    async fn fetch_pipeline(&self, pipeline_id: &str) -> Result<Envelope<Pipeline>, SyncError> {
        self.record(Call::FetchPipeline(pipeline_id.to_string()))
            .await;
        Ok(Envelope::success(Pipeline {
            id: pipeline_id.to_string(),
            name: "pipeline".to_string(),
            objects: vec![GraphNode::new("c2", "perf-2", "source")],
        }))
    }
}

pub fn worker() -> WorkerInfo {
    serde_json::from_value(json!({
        "name": WORKER,
        "connectors": [{
            "className": CLASS,
            "definitions": [
                {"key": "name", "displayName": "Name", "valueType": "STRING", "required": true},
                {"key": "instances", "displayName": "Instances", "valueType": "NUMBER", "defaultValue": 1},
                {"key": "topics", "displayName": "Topics", "valueType": "STRING", "required": true},
                {"key": "columns", "displayName": "Columns", "valueType": "TABLE",
                 "tableKeys": ["name", "type"]}
            ]
        }]
    }))
    .unwrap()
}

pub fn connector(id: &str, name: &str) -> ConnectorInfo {
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "className": CLASS,
        "state": "STOPPED",
        "settings": {
            "connector.class": CLASS,
            "name": name,
            "topics": ["t-1"],
            "columns": [{"name": "a", "type": "int"}, {"name": "b", "type": "str"}]
        }
    }))
    .unwrap()
}

pub struct Harness {
    pub api: Arc<MockApi>,
    pub graph: Arc<InMemoryGraph>,
    pub notifier: Arc<MemoryNotifier>,
    pub handle: SyncHandle,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_api(MockApi::new())
    }

    pub fn with_api(api: MockApi) -> Self {
        let api = Arc::new(api);
        let graph = Arc::new(InMemoryGraph::new(vec![
            GraphNode::new("c1", "perf", "source"),
            GraphNode::new("c2", "perf-2", "source"),
        ]));
        let notifier = Arc::new(MemoryNotifier::new());
        let handle = SyncOrchestrator::spawn(
            Collaborators {
                api: api.clone(),
                graph: graph.clone(),
                notifier: notifier.clone(),
                navigator: notifier.clone(),
            },
            Duration::from_millis(1000),
        );
        Self {
            api,
            graph,
            notifier,
            handle,
        }
    }
}
