use super::*;
use crate::config::OllamaConfig;
use crate::embeddings::chunking::TextChunk;
use crate::memory::Turn;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_ollama_config(server: &MockServer) -> OllamaConfig {
    let addr = server.address();
    OllamaConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        timeout_seconds: 30,
        ..OllamaConfig::default()
    }
}

fn scored(content: &str, chunk_index: u32, similarity: f32) -> ScoredChunk {
    ScoredChunk {
        content: content.to_string(),
        chunk_index,
        similarity,
        distance: 1.0 - similarity,
    }
}

async fn seeded_collection(store: &CollectionStore) -> String {
    let chunks = vec![
        TextChunk {
            content: "Refunds are available within 30 days of purchase.".to_string(),
            chunk_index: 0,
            char_count: 49,
        },
        TextChunk {
            content: "Shipping takes five business days.".to_string(),
            chunk_index: 1,
            char_count: 34,
        },
        TextChunk {
            content: "Support is reachable around the clock.".to_string(),
            chunk_index: 2,
            char_count: 38,
        },
    ];
    let vectors = vec![
        vec![1.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0],
    ];

    let location = store.location("policy-12ab34cd");
    store
        .create(&location, &chunks, &vectors)
        .await
        .expect("create should succeed");
    location.display().to_string()
}

#[test]
fn context_prompt_contains_all_hits_in_order() {
    let hits = vec![
        scored("first chunk", 0, 0.9),
        scored("second chunk", 4, 0.5),
    ];

    let prompt = render_context(&hits);

    assert!(prompt.starts_with("Use the following pieces of context"));
    let first = prompt.find("first chunk").expect("first chunk present");
    let second = prompt.find("second chunk").expect("second chunk present");
    assert!(first < second);
    assert!(prompt.contains("\n---\n"));
}

#[test]
fn context_prompt_handles_no_hits() {
    let prompt = render_context(&[]);
    assert!(prompt.contains("no matching context found"));
}

#[tokio::test]
async fn answers_using_retrieved_context() {
    let server = MockServer::start().await;

    // The question embeds closest to the refund chunk
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.95, 0.05, 0.0]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "The refund window is 30 days."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = CollectionStore::new(temp_dir.path().join("collections"));
    let location = seeded_collection(&store).await;

    let config = test_ollama_config(&server);
    let embedder = EmbeddingClient::new(&config).expect("embedder should build");
    let chat = ChatClient::new(&config).expect("chat client should build");

    let answer = retrieve_and_answer(
        &store,
        &embedder,
        &chat,
        &location,
        "What is the refund window?",
        &[],
    )
    .await
    .expect("query should succeed");

    assert_eq!(answer, "The refund window is 30 days.");
}

#[tokio::test]
async fn prior_turns_are_forwarded_before_the_question() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[1.0, 0.0, 0.0]]
        })))
        .mount(&server)
        .await;

    // The chat request must carry history turns between system and question
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "system"},
                {"role": "user", "content": "Do you ship abroad?"},
                {"role": "assistant", "content": "Yes, worldwide."},
                {"role": "user", "content": "And refunds?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "Within 30 days."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = CollectionStore::new(temp_dir.path().join("collections"));
    let location = seeded_collection(&store).await;

    let config = test_ollama_config(&server);
    let embedder = EmbeddingClient::new(&config).expect("embedder should build");
    let chat = ChatClient::new(&config).expect("chat client should build");

    let history = vec![
        Turn::human("Do you ship abroad?"),
        Turn::assistant("Yes, worldwide."),
    ];

    let answer = retrieve_and_answer(
        &store,
        &embedder,
        &chat,
        &location,
        "And refunds?",
        &history,
    )
    .await
    .expect("query should succeed");

    assert_eq!(answer, "Within 30 days.");
}

#[tokio::test]
async fn unknown_location_fails_without_touching_the_provider() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = CollectionStore::new(temp_dir.path().join("collections"));

    let config = test_ollama_config(&server);
    let embedder = EmbeddingClient::new(&config).expect("embedder should build");
    let chat = ChatClient::new(&config).expect("chat client should build");

    let missing = store.location("never-indexed").display().to_string();
    let result = retrieve_and_answer(&store, &embedder, &chat, &missing, "anything?", &[]).await;

    assert!(matches!(
        result,
        Err(crate::PlaygroundError::IndexNotFound(_))
    ));
}
