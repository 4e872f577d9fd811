use std::sync::Mutex;
use tracing::info;

pub const TEST_SUCCESS: &str = "Test has passed!";
pub const CONNECTOR_DELETION_SUCCESS: &str = "Successfully deleted the connector:";

/// Receives user-facing success messages. Only called after a confirmed success.
pub trait Notifier: Send + Sync {
    fn notify_success(&self, message: &str);
}

/// Moves the user somewhere else, e.g. back to the pipeline after a delete.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

pub fn pipeline_edit_path(pipeline_id: &str) -> String {
    format!("/pipelines/edit/{}", pipeline_id)
}

/// Logs notifications through `tracing`.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_success(&self, message: &str) {
        info!(target: "flowdesk.notify", "{}", message);
    }
}

impl Navigator for TracingNotifier {
    fn navigate(&self, path: &str) {
        info!(target: "flowdesk.notify", path, "navigate");
    }
}

/// Records messages and navigation targets in memory, mainly for testing.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<String>>,
    paths: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify_success(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

impl Navigator for MemoryNotifier {
    fn navigate(&self, path: &str) {
        if let Ok(mut paths) = self.paths.lock() {
            paths.push(path.to_string());
        }
    }
}
