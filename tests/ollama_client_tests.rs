//! LLM and embedding clients against a local stand-in for the Ollama API

use std::net::SocketAddr;

use axum::http::header;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use futures::StreamExt;
use serde_json::json;
use serde_json::Value;
use topgo_rag::config::EmbeddingsConfig;
use topgo_rag::config::LlmConfig;
use topgo_rag::embeddings::Embedder;
use topgo_rag::embeddings::EmbeddingClient;
use topgo_rag::llm::ChatMessage;
use topgo_rag::llm::GenerationParams;
use topgo_rag::llm::Generator;
use topgo_rag::llm::LlmService;
use topgo_rag::TopgoError;

async fn tags() -> Json<Value> {
    Json(json!({ "models": [{ "name": "qwen2:1.5b" }, { "name": "paraphrase-multilingual" }] }))
}

async fn generate(Json(body): Json<Value>) -> impl IntoResponse {
    let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
    if prompt.contains("missing-model") {
        let lines = "{\"response\":\"Phở \"}\n{\"error\":\"model not found\"}\n";
        return ([(header::CONTENT_TYPE, "application/x-ndjson")], lines.to_string())
            .into_response();
    }
    if body["stream"] == json!(true) {
        let lines = "{\"response\":\"Phở \"}\n{\"response\":\"Thìn\"}\n{\"response\":\"\",\"done\":true}\n";
        return ([(header::CONTENT_TYPE, "application/x-ndjson")], lines.to_string())
            .into_response();
    }
    Json(json!({
        "response": format!("echo:{prompt}"),
        "num_predict": body["options"]["num_predict"],
        "done": true,
    }))
    .into_response()
}

async fn embeddings(Json(body): Json<Value>) -> Json<Value> {
    let len = body["prompt"].as_str().map_or(0, str::len) as f32;
    Json(json!({ "embedding": [len, 0.5, 1.0] }))
}

async fn broken() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn fake_ollama() -> SocketAddr {
    spawn(
        Router::new()
            .route("/api/tags", get(tags))
            .route("/api/generate", post(generate))
            .route("/api/embeddings", post(embeddings)),
    )
    .await
}

async fn broken_ollama() -> SocketAddr {
    spawn(
        Router::new()
            .route("/api/tags", get(broken))
            .route("/api/generate", post(broken))
            .route("/api/embeddings", post(broken)),
    )
    .await
}

fn llm(addr: SocketAddr) -> LlmService {
    let config = LlmConfig {
        endpoint: format!("http://{addr}/"),
        timeout_secs: 5,
        probe_timeout_secs: 2,
        ..LlmConfig::default()
    };
    LlmService::new(&config).unwrap()
}

fn embedder(addr: SocketAddr) -> EmbeddingClient {
    let config = EmbeddingsConfig {
        endpoint: format!("http://{addr}"),
        dimension: 3,
        ..EmbeddingsConfig::default()
    };
    EmbeddingClient::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_connection_and_models() {
    let service = llm(fake_ollama().await);

    assert!(service.check_connection().await);
    assert_eq!(
        service.list_models().await.unwrap(),
        vec!["qwen2:1.5b", "paraphrase-multilingual"]
    );
}

#[tokio::test]
async fn test_generate_sends_system_and_params() {
    let service = llm(fake_ollama().await);

    let answer = service
        .generate("Tìm quán phở", Some("Bạn là trợ lý"), GenerationParams::new(0.1, 150))
        .await
        .unwrap();
    assert_eq!(answer, "echo:Bạn là trợ lý\n\nTìm quán phở");
}

#[tokio::test]
async fn test_chat_flattens_messages() {
    let service = llm(fake_ollama().await);
    let messages = vec![
        ChatMessage::system("Bạn là trợ lý"),
        ChatMessage::user("Xin chào"),
    ];

    let answer = service.chat(&messages, GenerationParams::default()).await.unwrap();
    assert_eq!(answer, "echo:Bạn là trợ lý\n\nUser: Xin chào\n\nAssistant:");
}

#[tokio::test]
async fn test_generate_stream() {
    let service = llm(fake_ollama().await);

    let stream = service
        .generate_stream("phở", None, GenerationParams::default())
        .await
        .unwrap();
    let chunks: Vec<String> = stream
        .into_stream()
        .map(|chunk| chunk.unwrap())
        .collect()
        .await;
    assert_eq!(chunks, vec!["Phở ", "Thìn"]);

    let collected = service
        .generate_stream("phở", None, GenerationParams::default())
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    assert_eq!(collected, "Phở Thìn");
}

#[tokio::test]
async fn test_stream_error_record() {
    let service = llm(fake_ollama().await);

    let result = service
        .generate_stream("missing-model", None, GenerationParams::default())
        .await
        .unwrap()
        .collect_all()
        .await;
    match result {
        Err(TopgoError::Llm(message)) => assert_eq!(message, "model not found"),
        other => panic!("expected LLM error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_errors() {
    let service = llm(broken_ollama().await);

    assert!(!service.check_connection().await);
    assert!(service.list_models().await.unwrap().is_empty());

    match service.generate("phở", None, GenerationParams::default()).await {
        Err(TopgoError::Llm(message)) => {
            assert!(message.contains("500"));
            assert!(message.contains("boom"));
        }
        other => panic!("expected LLM error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_ollama_embeddings() {
    let client = embedder(fake_ollama().await);

    let embedding = client.embed("phở").await.unwrap();
    assert_eq!(embedding.len(), 3);
    assert!((embedding[1] - 0.5).abs() < f32::EPSILON);

    let batch = client
        .embed_batch(&["a".to_string(), "bb".to_string()])
        .await
        .unwrap();
    assert_eq!(batch.len(), 2);
}

#[tokio::test]
async fn test_ollama_embed_batch_keeps_order() {
    let client = embedder(fake_ollama().await);
    // More texts than requests in flight
    let texts: Vec<String> = (1..=12).map(|n| "x".repeat(n)).collect();

    let batch = client.embed_batch(&texts).await.unwrap();

    assert_eq!(batch.len(), 12);
    for (idx, embedding) in batch.iter().enumerate() {
        assert!((embedding[0] - (idx + 1) as f32).abs() < f32::EPSILON);
    }
}

#[tokio::test]
async fn test_embedding_dimension_mismatch() {
    let addr = fake_ollama().await;
    let config = EmbeddingsConfig {
        endpoint: format!("http://{addr}"),
        dimension: 768,
        ..EmbeddingsConfig::default()
    };
    let client = EmbeddingClient::from_config(&config).unwrap();

    assert!(matches!(
        client.embed("phở").await,
        Err(TopgoError::Embedding(_))
    ));
}

#[tokio::test]
async fn test_embedding_server_error() {
    let client = embedder(broken_ollama().await);
    assert!(matches!(
        client.embed("phở").await,
        Err(TopgoError::Embedding(_))
    ));
}
