//! Backend REST calls used by the editor.

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::graph::Pipeline;
use crate::model::{ConnectorInfo, Envelope, PersistedSettings, TopicRef, WorkerInfo};

/// One async method per backend call. Transport failures are `Err`; a
/// request the backend refused (including a 5xx) comes back as an envelope
/// with `isSuccess=false`.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    async fn fetch_worker(&self, cluster_name: &str) -> Result<Envelope<WorkerInfo>, SyncError>;

    async fn fetch_connector(&self, connector_id: &str)
        -> Result<Envelope<ConnectorInfo>, SyncError>;

    async fn update_connector(
        &self,
        connector_id: &str,
        settings: &PersistedSettings,
    ) -> Result<Envelope<ConnectorInfo>, SyncError>;

    async fn delete_connector(&self, connector_id: &str) -> Result<Envelope<Value>, SyncError>;

    async fn start_connector(&self, connector_id: &str)
        -> Result<Envelope<ConnectorInfo>, SyncError>;

    async fn stop_connector(&self, connector_id: &str)
        -> Result<Envelope<ConnectorInfo>, SyncError>;

    async fn validate_connector(
        &self,
        settings: &PersistedSettings,
    ) -> Result<Envelope<Value>, SyncError>;

    async fn fetch_topics(&self) -> Result<Envelope<Vec<TopicRef>>, SyncError>;

    async fn fetch_pipeline(&self, pipeline_id: &str) -> Result<Envelope<Pipeline>, SyncError>;
}

/// Resource paths, relative to the backend base URL. Deployment-specific.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiRoutes {
    pub workers: String,
    pub connectors: String,
    pub validate: String,
    pub topics: String,
    pub pipelines: String,
}

impl Default for ApiRoutes {
    fn default() -> Self {
        Self {
            workers: "/api/workers".to_string(),
            connectors: "/api/connectors".to_string(),
            validate: "/api/validate/connector".to_string(),
            topics: "/api/topics".to_string(),
            pipelines: "/api/pipelines".to_string(),
        }
    }
}

pub struct HttpPipelineApi {
    client: reqwest::Client,
    base_url: String,
    routes: ApiRoutes,
}

impl HttpPipelineApi {
    pub fn new(base_url: &str, routes: ApiRoutes) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("flowdesk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpPipelineApi {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            routes,
        })
    }

    fn url(&self, route: &str, id: Option<&str>, action: Option<&str>) -> String {
        let mut url = format!("{}{}", self.base_url, route);
        if let Some(id) = id {
            url.push('/');
            url.push_str(&urlencoding::encode(id));
        }
        if let Some(action) = action {
            url.push('/');
            url.push_str(action);
        }
        url
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<Envelope<T>, SyncError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(target: "flowdesk.api", %status, "{}", what);

        if status == StatusCode::NOT_FOUND {
            return Err(SyncError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(target: "flowdesk.api", %status, "{} failed: {}", what, body);
            return Ok(Envelope::failure(format!("{}: {}", status, body)));
        }

        let bytes = response.bytes().await?;
        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(Envelope::from_body(body)?)
    }
}

#[async_trait]
impl PipelineApi for HttpPipelineApi {
    async fn fetch_worker(&self, cluster_name: &str) -> Result<Envelope<WorkerInfo>, SyncError> {
        let url = self.url(&self.routes.workers, Some(cluster_name), None);
        self.send(self.client.get(url), &format!("worker {}", cluster_name))
            .await
    }

    async fn fetch_connector(
        &self,
        connector_id: &str,
    ) -> Result<Envelope<ConnectorInfo>, SyncError> {
        let url = self.url(&self.routes.connectors, Some(connector_id), None);
        self.send(self.client.get(url), &format!("connector {}", connector_id))
            .await
    }

    async fn update_connector(
        &self,
        connector_id: &str,
        settings: &PersistedSettings,
    ) -> Result<Envelope<ConnectorInfo>, SyncError> {
        let url = self.url(&self.routes.connectors, Some(connector_id), None);
        self.send(
            self.client.put(url).json(settings),
            &format!("connector {}", connector_id),
        )
        .await
    }

    async fn delete_connector(&self, connector_id: &str) -> Result<Envelope<Value>, SyncError> {
        let url = self.url(&self.routes.connectors, Some(connector_id), None);
        self.send(self.client.delete(url), &format!("connector {}", connector_id))
            .await
    }

    async fn start_connector(
        &self,
        connector_id: &str,
    ) -> Result<Envelope<ConnectorInfo>, SyncError> {
        let url = self.url(&self.routes.connectors, Some(connector_id), Some("start"));
        self.send(self.client.put(url), &format!("connector {}", connector_id))
            .await
    }

    async fn stop_connector(
        &self,
        connector_id: &str,
    ) -> Result<Envelope<ConnectorInfo>, SyncError> {
        let url = self.url(&self.routes.connectors, Some(connector_id), Some("stop"));
        self.send(self.client.put(url), &format!("connector {}", connector_id))
            .await
    }

    async fn validate_connector(
        &self,
        settings: &PersistedSettings,
    ) -> Result<Envelope<Value>, SyncError> {
        let url = self.url(&self.routes.validate, None, None);
        self.send(self.client.put(url).json(settings), "connector validation")
            .await
    }

    async fn fetch_topics(&self) -> Result<Envelope<Vec<TopicRef>>, SyncError> {
        let url = self.url(&self.routes.topics, None, None);
        self.send(self.client.get(url), "topics").await
    }

    async fn fetch_pipeline(&self, pipeline_id: &str) -> Result<Envelope<Pipeline>, SyncError> {
        let url = self.url(&self.routes.pipelines, Some(pipeline_id), None);
        self.send(self.client.get(url), &format!("pipeline {}", pipeline_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_url_building() {
        let api = HttpPipelineApi::new("http://localhost:5050/v0/", ApiRoutes::default()).unwrap();
        assert_eq!(
            api.url(&api.routes.connectors, Some("c 1"), Some("start")),
            "http://localhost:5050/v0/api/connectors/c%201/start"
        );
        assert_eq!(
            api.url(&api.routes.topics, None, None),
            "http://localhost:5050/v0/api/topics"
        );
    }

    /// Serves each canned `(status, body)` to one connection, in order.
    fn serve(responses: Vec<(&'static str, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let reply = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(reply.as_bytes()).unwrap();
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_reads_backend_body_shapes() {
        let base = serve(vec![
            ("200 OK", r#"{"isSuccess":true,"result":{"id":"c1","settings":{}}}"#),
            ("200 OK", r#"{"id":"c1","state":"RUNNING","settings":{"name":"perf"}}"#),
            ("200 OK", ""),
        ]);
        let api = HttpPipelineApi::new(&base, ApiRoutes::default()).unwrap();

        let bare = api.fetch_connector("c1").await.unwrap();
        assert!(bare.is_success());
        assert_eq!(bare.result().unwrap().id, "c1");

        let raw = api.fetch_connector("c1").await.unwrap();
        assert!(raw.is_success());
        assert_eq!(
            raw.result().unwrap().state,
            Some(crate::model::ConnectorRuntimeState::Running)
        );

        let deleted = api.delete_connector("c1").await.unwrap();
        assert!(deleted.is_success());
    }

    #[tokio::test]
    async fn test_server_error_is_a_rejection() {
        let base = serve(vec![
            ("500 Internal Server Error", r#"{"error":"boom"}"#),
            ("404 Not Found", ""),
        ]);
        let api = HttpPipelineApi::new(&base, ApiRoutes::default()).unwrap();

        let failed = api.fetch_worker("wk00").await.unwrap();
        assert!(failed.is_rejected());
        assert!(failed.result().is_none());

        let missing = api.fetch_worker("wk00").await.unwrap_err();
        assert!(missing.is_not_found());
    }

    #[test]
    fn test_routes_partial_override() {
        let routes: ApiRoutes = toml::from_str("topics = \"/v1/topics\"").unwrap();
        assert_eq!(routes.topics, "/v1/topics");
        assert_eq!(routes.workers, ApiRoutes::default().workers);
    }
}
