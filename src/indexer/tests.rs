use super::*;
use crate::config::OllamaConfig;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Responds to /api/embed with one fixed-dimension vector per input
struct EchoEmbedder;

impl Respond for EchoEmbedder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value =
            serde_json::from_slice(&request.body).expect("request body should be JSON");
        let count = body["input"].as_array().map_or(1, Vec::len);

        let embeddings: Vec<Vec<f32>> = (0..count)
            .map(|i| {
                let angle = i as f32 * 0.25;
                vec![angle.cos(), angle.sin(), 0.1, 0.2]
            })
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({ "embeddings": embeddings }))
    }
}

fn create_test_embedder(server: &MockServer) -> EmbeddingClient {
    let addr = server.address();
    let config = OllamaConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        timeout_seconds: 30,
        ..OllamaConfig::default()
    };
    EmbeddingClient::new(&config).expect("client should build")
}

#[test]
fn collection_name_uses_the_sanitized_stem() {
    assert_eq!(collection_name("policy.txt"), "policy");
    assert_eq!(collection_name("Employee Handbook.md"), "employee-handbook");
    assert_eq!(collection_name("Q3_report (final).txt"), "q3-report-final");
    assert_eq!(collection_name("nested/dir/notes.txt"), "notes");
}

#[test]
fn collection_name_never_comes_back_empty() {
    assert_eq!(collection_name("...txt"), "document");
    assert_eq!(collection_name(""), "document");
    assert_eq!(collection_name("---"), "document");
}

#[test]
fn content_digest_is_stable_and_short() {
    let first = content_digest("some document content");
    let second = content_digest("some document content");
    let different = content_digest("other content");

    assert_eq!(first, second);
    assert_eq!(first.len(), 8);
    assert_ne!(first, different);
    assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn index_document_creates_a_searchable_collection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(EchoEmbedder)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = crate::database::CollectionStore::new(temp_dir.path().join("collections"));
    let embedder = create_test_embedder(&server);

    let text = "A refund may be requested within 30 days of purchase. ".repeat(20);
    let record = index_document(&store, &embedder, 200, "policy.txt", &text)
        .await
        .expect("indexing should succeed");

    assert_eq!(record.name, "policy");
    assert!(record.chunk_count > 1);
    assert!(record.location.contains("policy-"));

    let collection = store
        .open(std::path::Path::new(&record.location))
        .await
        .expect("open should succeed");
    let results = collection
        .search(&[1.0, 0.0, 0.1, 0.2], 4)
        .await
        .expect("search should succeed");
    assert_eq!(results.len(), 4);
}

#[tokio::test]
async fn identical_content_maps_to_the_same_location() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(EchoEmbedder)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = crate::database::CollectionStore::new(temp_dir.path().join("collections"));
    let embedder = create_test_embedder(&server);

    let text = "identical content uploaded twice ".repeat(10);
    let first = index_document(&store, &embedder, 100, "notes.txt", &text)
        .await
        .expect("first indexing should succeed");
    let second = index_document(&store, &embedder, 100, "notes.txt", &text)
        .await
        .expect("second indexing should succeed");

    assert_eq!(first.location, second.location);
}

#[tokio::test]
async fn same_name_different_content_gets_a_different_location() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(EchoEmbedder)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = crate::database::CollectionStore::new(temp_dir.path().join("collections"));
    let embedder = create_test_embedder(&server);

    let first = index_document(
        &store,
        &embedder,
        100,
        "policy.txt",
        &"first version of the policy ".repeat(10),
    )
    .await
    .expect("indexing should succeed");
    let second = index_document(
        &store,
        &embedder,
        100,
        "policy.txt",
        &"second, rather different policy ".repeat(10),
    )
    .await
    .expect("indexing should succeed");

    assert_eq!(first.name, second.name);
    assert_ne!(first.location, second.location);
}

#[tokio::test]
async fn embedding_failure_leaves_nothing_on_disk() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(500).set_body_string("no embeddings today"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = crate::database::CollectionStore::new(temp_dir.path().join("collections"));
    let embedder = create_test_embedder(&server);

    let text = "some content to index ".repeat(10);
    let result = index_document(&store, &embedder, 100, "doomed.txt", &text).await;

    assert!(matches!(result, Err(PlaygroundError::ProviderFailure(_))));

    // No partial collection directory
    let digest = content_digest(&text);
    let location = store.location(&format!("doomed-{}", digest));
    assert!(!location.exists());
}

#[tokio::test]
async fn empty_document_is_rejected_before_any_provider_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(EchoEmbedder)
        .expect(0)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = crate::database::CollectionStore::new(temp_dir.path().join("collections"));
    let embedder = create_test_embedder(&server);

    let result = index_document(&store, &embedder, 100, "empty.txt", "   \n  ").await;

    assert!(matches!(result, Err(PlaygroundError::UploadRejected(_))));
}
