//! The editor's synchronization loop.
//!
//! One task owns all editor state. Callers talk to it through a cloneable
//! [`SyncHandle`]; network work runs in spawned tasks that post completion
//! events back into the loop. Every completion carries the session number it
//! was started under, and a new connector identity starts a new session, so
//! results for a connector that is no longer selected are dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::PipelineApi;
use crate::debounce::{self, Debouncer};
use crate::definitions::ConnectorDefinition;
use crate::error::SyncError;
use crate::graph::GraphOwner;
use crate::lifecycle::{LifecycleAction, LifecycleController};
use crate::loader::{LoadedConnector, MetadataLoader};
use crate::model::{ConnectorConfig, ConnectorRuntimeState, TopicRef};
use crate::mutator::Mutation;
use crate::notify::{Navigator, Notifier};
use crate::persister::Persister;
use crate::store::{ConfigStore, TopicMap};
use crate::validator::{ValidationReport, Validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Loading,
    Ready,
    Editing,
    Saving,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Loading => "loading",
            Phase::Ready => "ready",
            Phase::Editing => "editing",
            Phase::Saving => "saving",
        };
        f.write_str(s)
    }
}

/// What the loop publishes after every step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorStatus {
    pub phase: Phase,
    pub dirty: bool,
    pub validating: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,
}

impl Default for EditorStatus {
    fn default() -> Self {
        Self {
            phase: Phase::Loading,
            dirty: false,
            validating: false,
            load_error: None,
        }
    }
}

impl EditorStatus {
    /// Loaded with nothing pending.
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Ready
    }
}

/// Which connector the editor is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorTarget {
    pub connector_id: String,
    pub worker_cluster: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<String>,
}

impl ConnectorTarget {
    pub fn new(connector_id: impl Into<String>, worker_cluster: impl Into<String>) -> Self {
        Self {
            connector_id: connector_id.into(),
            worker_cluster: worker_cluster.into(),
            pipeline_id: None,
        }
    }

    pub fn in_pipeline(mut self, pipeline_id: impl Into<String>) -> Self {
        self.pipeline_id = Some(pipeline_id.into());
        self
    }
}

/// A read-only copy of the editor state.
#[derive(Debug, Clone, Serialize)]
pub struct EditorSnapshot {
    pub connector_id: Option<String>,
    pub connector_name: Option<String>,
    pub pipeline_id: Option<String>,
    pub phase: Phase,
    pub dirty: bool,
    pub validating: bool,
    pub runtime_state: ConnectorRuntimeState,
    pub definition: Option<ConnectorDefinition>,
    pub config: Option<ConnectorConfig>,
    pub topic_names: Vec<String>,
    pub missing_required: Vec<String>,
    pub load_error: Option<String>,
    pub last_saved_at: Option<DateTime<Utc>>,
}

/// The injected collaborators.
#[derive(Clone)]
pub struct Collaborators {
    pub api: Arc<dyn PipelineApi>,
    pub graph: Arc<dyn GraphOwner>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
}

type Reply<T> = oneshot::Sender<Result<T, SyncError>>;

enum Command {
    Select {
        target: ConnectorTarget,
        reply: Reply<()>,
    },
    Reload {
        reply: Reply<()>,
    },
    Edit {
        mutation: Mutation,
        reply: Reply<()>,
    },
    PipelineTopics(Vec<TopicRef>),
    KnownTopics(Vec<TopicRef>),
    Validate {
        reply: Reply<ValidationReport>,
    },
    Lifecycle {
        action: LifecycleAction,
        reply: Reply<Option<ConnectorRuntimeState>>,
    },
    Delete {
        reply: Reply<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<EditorSnapshot>,
    },
    Shutdown,
}

enum Event {
    Loaded {
        session: u64,
        result: Result<LoadedConnector, SyncError>,
    },
    Saved {
        session: u64,
        edit_seq: u64,
        ok: bool,
    },
    Validated {
        session: u64,
    },
    StateChanged {
        session: u64,
        state: ConnectorRuntimeState,
    },
    Deleted {
        session: u64,
    },
}

pub struct SyncOrchestrator {
    loader: Arc<MetadataLoader>,
    persister: Arc<Persister>,
    validator: Arc<Validator>,
    lifecycle: Arc<LifecycleController>,

    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<Event>,
    events: mpsc::UnboundedReceiver<Event>,
    status: watch::Sender<EditorStatus>,

    store: ConfigStore,
    target: Option<ConnectorTarget>,
    connector_name: Option<String>,
    runtime_state: ConnectorRuntimeState,
    phase: Phase,
    session: u64,
    dirty: bool,
    // Bumped on every accepted edit; a save clears dirty only if no edit
    // landed after its snapshot was taken.
    edit_seq: u64,
    saving: bool,
    save_deferred: bool,
    validating: bool,
    load_error: Option<String>,
    last_saved_at: Option<DateTime<Utc>>,
    debouncer: Debouncer,
}

impl SyncOrchestrator {
    pub fn new(collaborators: Collaborators, debounce: Duration) -> (Self, SyncHandle) {
        let Collaborators {
            api,
            graph,
            notifier,
            navigator,
        } = collaborators;
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let (status, status_rx) = watch::channel(EditorStatus::default());

        let orchestrator = Self {
            loader: Arc::new(MetadataLoader::new(api.clone())),
            persister: Arc::new(Persister::new(api.clone(), graph.clone())),
            validator: Arc::new(Validator::new(api.clone(), notifier.clone())),
            lifecycle: Arc::new(LifecycleController::new(api, graph, notifier, navigator)),
            commands,
            events_tx,
            events,
            status,
            store: ConfigStore::new(),
            target: None,
            connector_name: None,
            runtime_state: ConnectorRuntimeState::Unknown,
            phase: Phase::Loading,
            session: 0,
            dirty: false,
            edit_seq: 0,
            saving: false,
            save_deferred: false,
            validating: false,
            load_error: None,
            last_saved_at: None,
            debouncer: Debouncer::new(debounce),
        };
        let handle = SyncHandle {
            commands: commands_tx,
            status: status_rx,
        };
        (orchestrator, handle)
    }

    /// Starts the loop on the current runtime.
    pub fn spawn(collaborators: Collaborators, debounce: Duration) -> SyncHandle {
        let (orchestrator, handle) = Self::new(collaborators, debounce);
        tokio::spawn(orchestrator.run());
        handle
    }

    /// Runs until `shutdown` or until every handle is dropped.
    ///
    /// Completion events are drained before new commands, so a caller that
    /// got a reply always observes the state change that came with it.
    pub async fn run(mut self) {
        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                biased;
                Some(event) = self.events.recv() => self.handle_event(event),
                _ = debounce::sleep_until(deadline) => self.on_debounce_due(),
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
            }
            self.publish();
        }
        debug!(target: "flowdesk.orchestrator", "orchestrator stopped");
    }

    fn publish(&self) {
        let status = EditorStatus {
            phase: self.phase,
            dirty: self.dirty,
            validating: self.validating,
            load_error: self.load_error.clone(),
        };
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Select { target, reply } => {
                if self.target.as_ref() == Some(&target) {
                    debug!(target: "flowdesk.orchestrator", connector = %target.connector_id, "connector already selected");
                } else {
                    self.target = Some(target);
                    self.begin_load();
                    self.publish();
                }
                let _ = reply.send(Ok(()));
            }
            Command::Reload { reply } => {
                let result = if self.target.is_some() {
                    self.begin_load();
                    self.publish();
                    Ok(())
                } else {
                    Err(SyncError::NotReady("no connector selected".to_string()))
                };
                let _ = reply.send(result);
            }
            Command::Edit { mutation, reply } => {
                let result = self.on_edit(&mutation);
                self.publish();
                let _ = reply.send(result);
            }
            Command::PipelineTopics(topics) => self.store.set_pipeline_topics(&topics),
            Command::KnownTopics(topics) => self.store.set_known_topics(topics),
            Command::Validate { reply } => self.on_validate(reply),
            Command::Lifecycle { action, reply } => self.on_lifecycle(action, reply),
            Command::Delete { reply } => self.on_delete(reply),
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            // handled by the loop
            Command::Shutdown => {}
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Loaded { session, result } => {
                if session != self.session {
                    debug!(target: "flowdesk.orchestrator", session, "dropping stale load");
                    return;
                }
                self.on_loaded(result);
            }
            Event::Saved {
                session,
                edit_seq,
                ok,
            } => {
                if session != self.session {
                    debug!(target: "flowdesk.orchestrator", session, "dropping stale save result");
                    return;
                }
                self.on_saved(edit_seq, ok);
            }
            Event::Validated { session } => {
                if session == self.session {
                    self.validating = false;
                }
            }
            Event::StateChanged { session, state } => {
                if session == self.session {
                    self.runtime_state = state;
                }
            }
            Event::Deleted { session } => {
                if session == self.session {
                    info!(target: "flowdesk.orchestrator", "connector deleted, editor unbound");
                    self.target = None;
                    self.reset_session();
                }
            }
        }
    }

    /// Forgets everything tied to the current connector and starts a new session.
    fn reset_session(&mut self) {
        self.session += 1;
        if self.debouncer.cancel() && self.dirty {
            debug!(target: "flowdesk.orchestrator", "pending save cancelled");
        }
        self.store.clear();
        self.phase = Phase::Loading;
        self.dirty = false;
        self.edit_seq = 0;
        self.saving = false;
        self.save_deferred = false;
        self.validating = false;
        self.load_error = None;
        self.last_saved_at = None;
        self.connector_name = None;
        self.runtime_state = ConnectorRuntimeState::Unknown;
    }

    fn begin_load(&mut self) {
        let Some(target) = self.target.clone() else {
            return;
        };
        self.reset_session();

        let session = self.session;
        let loader = self.loader.clone();
        let events = self.events_tx.clone();
        debug!(target: "flowdesk.orchestrator", session, connector = %target.connector_id, "loading connector");
        tokio::spawn(async move {
            let result = loader
                .load_metadata(&target.connector_id, &target.worker_cluster)
                .await;
            let _ = events.send(Event::Loaded { session, result });
        });
    }

    fn on_loaded(&mut self, result: Result<LoadedConnector, SyncError>) {
        match result {
            Ok(loaded) => {
                info!(
                    target: "flowdesk.orchestrator",
                    connector = %loaded.connector_id,
                    state = %loaded.runtime_state,
                    "connector ready"
                );
                self.connector_name = loaded.name;
                self.runtime_state = loaded.runtime_state;
                self.store.populate(
                    loaded.definition,
                    loaded.config,
                    TopicMap::new(loaded.topics),
                );
                self.load_error = None;
                self.phase = Phase::Ready;
            }
            Err(e) => {
                warn!(target: "flowdesk.orchestrator", "load failed: {}", e);
                self.load_error = Some(e.to_string());
            }
        }
    }

    fn on_edit(&mut self, mutation: &Mutation) -> Result<(), SyncError> {
        let connector_id = match (&self.target, self.phase) {
            (Some(target), phase) if phase != Phase::Loading => target.connector_id.clone(),
            _ => return Err(SyncError::NotReady("connector is still loading".to_string())),
        };
        let config = self
            .store
            .config()
            .ok_or_else(|| SyncError::NotReady("no config loaded".to_string()))?;

        mutation.check(config)?;
        let updated = mutation.apply(config);
        self.store.replace_config(updated);

        self.dirty = true;
        self.edit_seq += 1;
        self.debouncer.schedule(&connector_id);
        if self.phase != Phase::Saving {
            self.phase = Phase::Editing;
        }
        Ok(())
    }

    fn on_debounce_due(&mut self) {
        let Some(connector_id) = self.debouncer.take_due(Instant::now()) else {
            return;
        };
        let current = self.target.as_ref().map(|t| t.connector_id.as_str());
        if current != Some(connector_id.as_str()) {
            debug!(target: "flowdesk.orchestrator", connector = %connector_id, "debounce fired for a connector no longer selected");
            return;
        }
        if !self.dirty {
            return;
        }
        if self.saving {
            self.save_deferred = true;
            return;
        }
        self.start_save(connector_id);
    }

    fn start_save(&mut self, connector_id: String) {
        let Some(config) = self.store.config().cloned() else {
            return;
        };
        let topics = self.store.known_topics().clone();
        let session = self.session;
        let edit_seq = self.edit_seq;
        let persister = self.persister.clone();
        let events = self.events_tx.clone();

        self.saving = true;
        self.phase = Phase::Saving;
        debug!(target: "flowdesk.orchestrator", connector = %connector_id, edit_seq, "saving");
        tokio::spawn(async move {
            let ok = persister.persist(&connector_id, &config, &topics).await;
            let _ = events.send(Event::Saved {
                session,
                edit_seq,
                ok,
            });
        });
    }

    fn on_saved(&mut self, edit_seq: u64, ok: bool) {
        self.saving = false;
        if ok {
            self.last_saved_at = Some(Utc::now());
            if edit_seq == self.edit_seq {
                self.dirty = false;
            }
        }

        if std::mem::take(&mut self.save_deferred) && self.dirty {
            if let Some(target) = &self.target {
                let connector_id = target.connector_id.clone();
                self.start_save(connector_id);
                return;
            }
        }

        self.phase = if self.debouncer.is_pending() {
            Phase::Editing
        } else {
            Phase::Ready
        };
    }

    fn on_validate(&mut self, reply: Reply<ValidationReport>) {
        if self.validating {
            let _ = reply.send(Err(SyncError::Busy("validation already running".to_string())));
            return;
        }
        let Some(config) = self.store.config().cloned() else {
            let _ = reply.send(Err(SyncError::NotReady("no config loaded".to_string())));
            return;
        };
        let topics = self.store.known_topics().clone();
        let session = self.session;
        let validator = self.validator.clone();
        let events = self.events_tx.clone();

        self.validating = true;
        tokio::spawn(async move {
            let report = validator.validate(&config, &topics).await;
            let _ = events.send(Event::Validated { session });
            let _ = reply.send(Ok(report));
        });
    }

    fn on_lifecycle(&mut self, action: LifecycleAction, reply: Reply<Option<ConnectorRuntimeState>>) {
        let Some(target) = &self.target else {
            let _ = reply.send(Err(SyncError::NotReady("no connector selected".to_string())));
            return;
        };
        let connector_id = target.connector_id.clone();
        let session = self.session;
        let lifecycle = self.lifecycle.clone();
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let state = lifecycle.trigger(&connector_id, action).await;
            if let Some(state) = state {
                let _ = events.send(Event::StateChanged { session, state });
            }
            let _ = reply.send(Ok(state));
        });
    }

    fn on_delete(&mut self, reply: Reply<bool>) {
        let Some(target) = &self.target else {
            let _ = reply.send(Err(SyncError::NotReady("no connector selected".to_string())));
            return;
        };
        let Some(pipeline_id) = target.pipeline_id.clone() else {
            let _ = reply.send(Err(SyncError::InvalidInput(
                "deleting a connector needs its pipeline id".to_string(),
            )));
            return;
        };
        let connector_id = target.connector_id.clone();
        let name = self
            .connector_name
            .clone()
            .unwrap_or_else(|| connector_id.clone());
        let session = self.session;
        let lifecycle = self.lifecycle.clone();
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let deleted = lifecycle.delete(&connector_id, &name, &pipeline_id).await;
            if deleted {
                let _ = events.send(Event::Deleted { session });
            }
            let _ = reply.send(Ok(deleted));
        });
    }

    fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            connector_id: self.target.as_ref().map(|t| t.connector_id.clone()),
            connector_name: self.connector_name.clone(),
            pipeline_id: self.target.as_ref().and_then(|t| t.pipeline_id.clone()),
            phase: self.phase,
            dirty: self.dirty,
            validating: self.validating,
            runtime_state: self.runtime_state,
            definition: self.store.definition().cloned(),
            config: self.store.config().cloned(),
            topic_names: self.store.topic_names().to_vec(),
            missing_required: self.store.missing_required(),
            load_error: self.load_error.clone(),
            last_saved_at: self.last_saved_at,
        }
    }
}

/// Cloneable front door to a running [`SyncOrchestrator`].
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<EditorStatus>,
}

impl SyncHandle {
    fn send(&self, command: Command) -> Result<(), SyncError> {
        self.commands.send(command).map_err(|_| SyncError::Closed)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SyncError> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx))?;
        rx.await.map_err(|_| SyncError::Closed)
    }

    /// Binds the editor to a connector. A different target discards unsaved
    /// edits of the current one and reloads. Returns once loading has begun.
    pub async fn select_connector(&self, target: ConnectorTarget) -> Result<(), SyncError> {
        self.request(|reply| Command::Select { target, reply }).await?
    }

    /// Loads the current connector again, dropping unsaved edits.
    pub async fn reload(&self) -> Result<(), SyncError> {
        self.request(|reply| Command::Reload { reply }).await?
    }

    pub async fn edit(&self, mutation: Mutation) -> Result<(), SyncError> {
        self.request(|reply| Command::Edit { mutation, reply }).await?
    }

    pub async fn set_field(&self, key: &str, value: Value) -> Result<(), SyncError> {
        self.edit(Mutation::SetField {
            key: key.to_string(),
            value,
        })
        .await
    }

    /// Topics of the pipeline being edited; only the topic picker changes.
    pub fn update_pipeline_topics(&self, topics: Vec<TopicRef>) -> Result<(), SyncError> {
        self.send(Command::PipelineTopics(topics))
    }

    /// The cluster-wide id/name mapping used at the save and validate boundaries.
    pub fn update_known_topics(&self, topics: Vec<TopicRef>) -> Result<(), SyncError> {
        self.send(Command::KnownTopics(topics))
    }

    pub async fn validate(&self) -> Result<ValidationReport, SyncError> {
        self.request(|reply| Command::Validate { reply }).await?
    }

    pub async fn start(&self) -> Result<Option<ConnectorRuntimeState>, SyncError> {
        self.request(|reply| Command::Lifecycle {
            action: LifecycleAction::Start,
            reply,
        })
        .await?
    }

    pub async fn stop(&self) -> Result<Option<ConnectorRuntimeState>, SyncError> {
        self.request(|reply| Command::Lifecycle {
            action: LifecycleAction::Stop,
            reply,
        })
        .await?
    }

    pub async fn delete(&self) -> Result<bool, SyncError> {
        self.request(|reply| Command::Delete { reply }).await?
    }

    pub async fn snapshot(&self) -> Result<EditorSnapshot, SyncError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub fn status(&self) -> EditorStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EditorStatus> {
        self.status.clone()
    }

    /// Waits for the first load to finish. A failed load is returned as `NotReady`.
    pub async fn wait_until_ready(&self) -> Result<(), SyncError> {
        self.wait_for(|status| match (&status.phase, &status.load_error) {
            (Phase::Loading, Some(e)) => Some(Err(SyncError::NotReady(e.clone()))),
            (Phase::Loading, None) => None,
            _ => Some(Ok(())),
        })
        .await?
    }

    /// Waits until no edit is pending and no save is in flight.
    pub async fn wait_until_idle(&self) -> Result<EditorStatus, SyncError> {
        self.wait_for(|status| status.is_idle().then(|| status.clone()))
            .await
    }

    async fn wait_for<T>(&self, check: impl Fn(&EditorStatus) -> Option<T>) -> Result<T, SyncError> {
        let mut rx = self.status.clone();
        loop {
            if let Some(done) = check(&rx.borrow_and_update()) {
                return Ok(done);
            }
            rx.changed().await.map_err(|_| SyncError::Closed)?;
        }
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}
