//! LLM client for a locally served Ollama model
//!
//! Generation goes through the [`Generator`] trait. [`LlmService`] is the
//! Ollama implementation; tests use scripted fakes.

pub mod prompts;
pub mod streaming;

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

pub use prompts::PromptTemplate;
pub use prompts::VenuePrompts;
pub use streaming::StreamingResponse;

use crate::config::LlmConfig;
use crate::errors::Result;
use crate::errors::TopgoError;

/// A role-tagged conversation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Sampling settings for one generation call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 800,
        }
    }
}

impl GenerationParams {
    pub const fn new(temperature: f32, max_tokens: usize) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// Complete `prompt`, with `system` placed ahead of it
    async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
        params: GenerationParams,
    ) -> Result<String>;

    /// Whether the backend answers at all
    async fn check_connection(&self) -> bool;

    async fn list_models(&self) -> Result<Vec<String>>;

    fn model(&self) -> &str;
}

/// Join the system prompt and the prompt the way Ollama's raw mode expects
pub fn compose_prompt(prompt: &str, system: Option<&str>) -> String {
    match system {
        Some(system) if !system.is_empty() => format!("{system}\n\n{prompt}"),
        _ => prompt.to_string(),
    }
}

/// Flatten a conversation into a single completion prompt
pub fn flatten_messages(messages: &[ChatMessage]) -> String {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .collect();

    let mut prompt = system.join("\n\n");
    for msg in messages {
        let speaker = match msg.role.as_str() {
            "user" => "User",
            "assistant" => "Assistant",
            _ => continue,
        };
        if !prompt.is_empty() {
            prompt.push_str("\n\n");
        }
        prompt.push_str(&format!("{speaker}: {}", msg.content));
    }
    prompt.push_str("\n\nAssistant:");
    prompt
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

/// One `/api/generate` record; the whole body when not streaming
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

/// Ollama HTTP client
pub struct LlmService {
    endpoint: String,
    model: String,
    client: Client,
    probe_timeout: Duration,
    params: GenerationParams,
}

impl LlmService {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TopgoError::Http(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            params: GenerationParams::new(config.temperature, config.max_tokens),
        })
    }

    /// Configured sampling defaults
    pub const fn default_params(&self) -> GenerationParams {
        self.params
    }

    fn request<'a>(
        &'a self,
        prompt: &str,
        system: Option<&str>,
        params: GenerationParams,
        stream: bool,
    ) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt: compose_prompt(prompt, system),
            stream,
            options: GenerateOptions {
                temperature: params.temperature,
                num_predict: params.max_tokens,
            },
        }
    }

    async fn post_generate(&self, request: &GenerateRequest<'_>) -> Result<reqwest::Response> {
        let url = format!("{}/api/generate", self.endpoint);
        debug!("Calling Ollama generate API: {} (stream: {})", url, request.stream);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TopgoError::Llm(format!("request to {url} timed out"))
                } else {
                    TopgoError::Llm(format!("request to {url} failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TopgoError::Llm(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        Ok(response)
    }

    /// Stream generated text chunk by chunk
    pub async fn generate_stream(
        &self,
        prompt: &str,
        system: Option<&str>,
        params: GenerationParams,
    ) -> Result<StreamingResponse> {
        let request = self.request(prompt, system, params, true);
        let response = self.post_generate(&request).await?;

        let chunks = streaming::ndjson_lines(Box::pin(response.bytes_stream()))
            .map(|line| {
                let chunk: GenerateChunk = serde_json::from_str(&line?)?;
                match chunk.error {
                    Some(error) => Err(TopgoError::Llm(error)),
                    None => Ok(chunk.response),
                }
            })
            .filter(|chunk| {
                let keep = !matches!(chunk, Ok(text) if text.is_empty());
                async move { keep }
            });

        Ok(StreamingResponse::new(Box::pin(chunks)))
    }

    /// Generate a reply to a role-tagged conversation
    pub async fn chat(&self, messages: &[ChatMessage], params: GenerationParams) -> Result<String> {
        let prompt = flatten_messages(messages);
        self.generate(&prompt, None, params).await
    }
}

#[async_trait]
impl Generator for LlmService {
    async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
        params: GenerationParams,
    ) -> Result<String> {
        let request = self.request(prompt, system, params, false);
        let response = self.post_generate(&request).await?;

        let chunk: GenerateChunk = response
            .json()
            .await
            .map_err(|e| TopgoError::Llm(format!("Failed to parse response: {e}")))?;

        if let Some(error) = chunk.error {
            return Err(TopgoError::Llm(error));
        }
        Ok(chunk.response)
    }

    async fn check_connection(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        match self.client.get(&url).timeout(self.probe_timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Ollama probe failed: {e}");
                false
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.endpoint);
        let response = self
            .client
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Listing Ollama models returned {}", response.status());
            return Ok(Vec::new());
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| TopgoError::Llm(format!("Failed to parse model list: {e}")))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_prompt() {
        assert_eq!(compose_prompt("hỏi", Some("hệ thống")), "hệ thống\n\nhỏi");
        assert_eq!(compose_prompt("hỏi", None), "hỏi");
        assert_eq!(compose_prompt("hỏi", Some("")), "hỏi");
    }

    #[test]
    fn test_flatten_messages() {
        let messages = vec![
            ChatMessage::user("Xin chào"),
            ChatMessage::system("Bạn là trợ lý"),
            ChatMessage::assistant("Chào bạn"),
            ChatMessage::user("Tìm quán phở"),
        ];
        assert_eq!(
            flatten_messages(&messages),
            "Bạn là trợ lý\n\nUser: Xin chào\n\nAssistant: Chào bạn\n\nUser: Tìm quán phở\n\nAssistant:"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let service = LlmService::new(&LlmConfig::default()).unwrap();
        let request = service.request("hỏi", Some("hệ thống"), GenerationParams::new(0.1, 150), false);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "qwen2:1.5b");
        assert_eq!(body["prompt"], "hệ thống\n\nhỏi");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 150);
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_down() {
        let config = LlmConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            probe_timeout_secs: 1,
            timeout_secs: 1,
            ..LlmConfig::default()
        };
        let service = LlmService::new(&config).unwrap();

        assert!(!service.check_connection().await);
        let result = service.generate("hỏi", None, GenerationParams::default()).await;
        assert!(matches!(result, Err(TopgoError::Llm(_))));
    }
}
