mod helpers;

use std::sync::Arc;

use helpers::{fake_embedding, fake_model, FailingProvider};
use sbert_service::client::{ClientError, SbertClient};
use sbert_service::embedding::LazyModel;
use sbert_service::server::router;

/// Serve `model` on an ephemeral port and return its base URL.
async fn spawn_service(model: Arc<LazyModel>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(model)).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn client_round_trips_against_service() {
    let (model, _) = fake_model();
    let client = SbertClient::new(spawn_service(model).await);

    assert!(client.health().await.unwrap());

    let embedding = client.embedding("situation awareness").await.unwrap();
    assert_eq!(embedding, fake_embedding("situation awareness"));

    let similarity = client.similarity("same words", "same words").await.unwrap();
    assert!((similarity - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn client_surfaces_service_error_message() {
    let (model, _) = fake_model();
    let client = SbertClient::new(spawn_service(model).await);

    match client.embedding("").await.unwrap_err() {
        ClientError::Service { status, message } => {
            assert_eq!(status.as_u16(), 400);
            assert_eq!(message, "text is required");
        }
        other => panic!("expected service error, got {other:?}"),
    }
}

#[tokio::test]
async fn client_reports_server_failures() {
    let model = Arc::new(LazyModel::preloaded(Arc::new(FailingProvider)));
    let client = SbertClient::new(spawn_service(model).await);

    let err = client.similarity("a", "b").await.unwrap_err();
    assert!(matches!(err, ClientError::Service { ref message, .. } if message == "inference exploded"));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn unreachable_service_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = SbertClient::new(format!("http://{addr}"));
    assert!(matches!(
        client.embedding("x").await.unwrap_err(),
        ClientError::Transport(_)
    ));
}
