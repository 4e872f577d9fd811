// src/lib.rs
pub mod api;
pub mod debounce;
pub mod definitions;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod loader;
pub mod model;
pub mod mutator;
pub mod notify;
pub mod orchestrator;
pub mod persister;
pub mod settings;
pub mod store;
pub mod validator;

pub use crate::api::{ApiRoutes, HttpPipelineApi, PipelineApi};
pub use crate::definitions::{ConnectorDefinition, FieldDefinition, FieldKind};
pub use crate::error::{Result, SyncError};
pub use crate::graph::{Graph, GraphNode, GraphOwner, GraphPatch, InMemoryGraph, PipelineGraph};
pub use crate::model::{ConnectorConfig, ConnectorRuntimeState, Envelope, PersistedSettings, TopicRef};
pub use crate::mutator::Mutation;
pub use crate::notify::{MemoryNotifier, Navigator, Notifier, TracingNotifier};
pub use crate::orchestrator::{
    Collaborators, ConnectorTarget, EditorSnapshot, EditorStatus, Phase, SyncHandle,
    SyncOrchestrator,
};
pub use crate::settings::{Settings, SettingsFile};
pub use crate::validator::ValidationReport;
