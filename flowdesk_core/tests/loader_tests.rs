mod common;

use common::{Harness, MockApi, PIPELINE, WORKER};
use flowdesk_core::loader::MetadataLoader;
use flowdesk_core::{ConnectorTarget, Phase};
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn test_server_error_is_not_reported_as_missing() {
    let api = MockApi::new();
    api.worker_ok.store(false, Ordering::SeqCst);
    let loader = MetadataLoader::new(Arc::new(api));

    let err = loader.load_metadata("c1", WORKER).await.unwrap_err();
    assert_eq!(err.code_str(), "rejected");
    assert!(!err.is_not_found());
    assert!(err.to_string().contains("500"));
}

#[tokio::test(start_paused = true)]
async fn test_missing_connector_is_not_found() {
    let loader = MetadataLoader::new(Arc::new(MockApi::new().without_connectors()));

    let err = loader.load_metadata("c1", WORKER).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test(start_paused = true)]
async fn test_missing_topics_route_still_loads() {
    let api = MockApi::new();
    api.topics_route.store(false, Ordering::SeqCst);
    let loader = MetadataLoader::new(Arc::new(api));

    let loaded = loader.load_metadata("c1", WORKER).await.unwrap();
    assert!(loaded.topics.is_empty());
    assert_eq!(loaded.config.topic_name(), "");
}

#[tokio::test(start_paused = true)]
async fn test_rejected_load_keeps_editor_loading() {
    let api = MockApi::new();
    api.worker_ok.store(false, Ordering::SeqCst);
    let harness = Harness::with_api(api);

    harness
        .handle
        .select_connector(ConnectorTarget::new("c1", WORKER).in_pipeline(PIPELINE))
        .await
        .unwrap();
    let err = harness.handle.wait_until_ready().await.unwrap_err();
    assert_eq!(err.code_str(), "not_ready");

    let status = harness.handle.status();
    assert_eq!(status.phase, Phase::Loading);
    assert!(status.load_error.unwrap().contains("rejected"));
}
