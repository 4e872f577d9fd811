use crate::cli::{Cli, OutputFormat};
use crate::commands::{CommandError, Result};
use flowdesk_core::{
    Collaborators, ConnectorTarget, Graph, GraphOwner, HttpPipelineApi, InMemoryGraph, Navigator,
    Notifier, PipelineApi, PipelineGraph, Settings, SettingsFile, SyncHandle, SyncOrchestrator,
    TopicRef,
};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::sync::Arc;
use tracing::debug;

/// Graph nodes of this kind are the pipeline's topics.
const TOPIC_NODE_KIND: &str = "topic";

pub fn settings_file(cli: &Cli) -> SettingsFile {
    cli.config
        .clone()
        .map(SettingsFile::new)
        .unwrap_or_default()
}

/// File, then `FLOWDESK_*` environment, then command-line flags.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = settings_file(cli).load()?.apply_env()?;
    if let Some(base_url) = &cli.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(worker) = &cli.worker {
        settings.worker_cluster = Some(worker.clone());
    }
    settings.validate()?;
    Ok(settings)
}

pub fn spinner(output: OutputFormat, message: impl Into<String>) -> ProgressBar {
    if output != OutputFormat::Pretty {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.into());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

/// Prints notifications to stderr so structured output on stdout stays clean.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify_success(&self, message: &str) {
        eprintln!("{} {}", "✓".green().bold(), message);
    }
}

impl Navigator for ConsoleNotifier {
    fn navigate(&self, path: &str) {
        eprintln!("{} {}", "→".dimmed(), path.cyan());
    }
}

/// An editor bound to one connector for the lifetime of a command.
pub struct Session {
    pub handle: SyncHandle,
    pub connector_id: String,
    output: OutputFormat,
}

impl Session {
    pub async fn open(cli: &Cli, connector_id: &str) -> Result<Self> {
        let settings = load_settings(cli)?;
        let worker = settings.worker_cluster.clone().ok_or_else(|| {
            CommandError::InvalidConfig(
                "no worker cluster set; pass --worker or set worker_cluster in the config file"
                    .to_string(),
            )
        })?;

        let api: Arc<dyn PipelineApi> =
            Arc::new(HttpPipelineApi::new(&settings.base_url, settings.routes.clone())?);
        let (graph, topics): (Arc<dyn GraphOwner>, Vec<TopicRef>) = match &cli.pipeline {
            Some(pipeline_id) => {
                let graph = PipelineGraph::load(api.clone(), pipeline_id).await?;
                let topics = pipeline_topics(&graph.graph().await);
                (Arc::new(graph), topics)
            }
            None => (Arc::new(InMemoryGraph::default()), Vec::new()),
        };

        let console = Arc::new(ConsoleNotifier);
        let handle = SyncOrchestrator::spawn(
            Collaborators {
                api,
                graph,
                notifier: console.clone(),
                navigator: console,
            },
            settings.debounce(),
        );
        debug!(topics = topics.len(), "pipeline topics");
        handle.update_pipeline_topics(topics)?;

        let mut target = ConnectorTarget::new(connector_id, worker);
        if let Some(pipeline_id) = &cli.pipeline {
            target = target.in_pipeline(pipeline_id.clone());
        }

        let spinner = spinner(cli.output, format!("Loading connector {}...", connector_id));
        handle.select_connector(target).await?;
        let ready = handle.wait_until_ready().await;
        spinner.finish_and_clear();
        ready?;

        Ok(Self {
            handle,
            connector_id: connector_id.to_string(),
            output: cli.output,
        })
    }

    /// Blocks until the debounced save has run. Fails when it left changes unsaved.
    pub async fn wait_for_save(&self) -> Result<()> {
        let spinner = spinner(self.output, "Saving...");
        let status = self.handle.wait_until_idle().await;
        spinner.finish_and_clear();
        if status?.dirty {
            return Err(CommandError::SaveFailed(self.connector_id.clone()));
        }
        Ok(())
    }

    pub fn close(self) {
        self.handle.shutdown();
    }
}

fn pipeline_topics(graph: &Graph) -> Vec<TopicRef> {
    graph
        .nodes()
        .iter()
        .filter(|node| node.kind == TOPIC_NODE_KIND)
        .map(|node| TopicRef::new(node.id.clone(), node.name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdesk_core::GraphNode;

    #[test]
    fn test_pipeline_topics_from_graph() {
        let graph = Graph::new(vec![
            GraphNode::new("t-1", "orders", "topic"),
            GraphNode::new("c1", "perf", "source"),
        ]);
        assert_eq!(pipeline_topics(&graph), vec![TopicRef::new("t-1", "orders")]);
    }
}
