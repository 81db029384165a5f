use crate::completion::{ChatPrompt, CompletionClient};
use crate::embeddings::{Embedding, Embedder};
use crate::error::{RagError, Result};
use async_trait::async_trait;
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Configuration for the OpenAI API
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Missing key is reported on first use instead of sending an anonymous request
    pub api_key: Option<String>,
    pub base_url: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
}

/// Output size of the known OpenAI embedding models
pub fn known_embedding_dimensions(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

/// Client for the OpenAI embeddings and chat-completions endpoints
#[derive(Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = reqwest::Client::new();
        OpenAiClient { config, client }
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(RagError::MissingCredential(API_KEY_VAR))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    fn model(&self) -> &str {
        &self.config.embedding_model
    }

    fn dimensions(&self) -> usize {
        self.config.embedding_dimensions
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding(self.model(), "API returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let api_key = self.api_key()?;
        let model = self.model();
        debug!("Embedding {} texts with {}", texts.len(), model);

        let request = EmbeddingRequest {
            model,
            input: texts,
        };

        let response = self
            .client
            .post(self.url("embeddings"))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::embedding(model, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Embedding API returned {}", status);
            return Err(RagError::embedding(
                model,
                format!("API returned {}: {}", status, error_detail(&body)),
            ));
        }

        let response_data: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::embedding(model, format!("invalid response: {}", e)))?;

        collect_embeddings(response_data, texts.len(), model)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &ChatPrompt, model: &str) -> Result<String> {
        let api_key = self.api_key()?;

        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
        };

        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::completion(model, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Chat completion API returned {}", status);
            return Err(RagError::completion(
                model,
                format!("API returned {}: {}", status, error_detail(&body)),
            ));
        }

        let response_data: ChatResponse = response
            .json()
            .await
            .map_err(|e| RagError::completion(model, format!("invalid response: {}", e)))?;

        first_answer(response_data, model)
    }
}

/// Restore request order and check that every input got a vector
fn collect_embeddings(
    response: EmbeddingResponse,
    expected: usize,
    model: &str,
) -> Result<Vec<Embedding>> {
    let mut data = response.data;
    if data.len() != expected {
        return Err(RagError::embedding(
            model,
            format!("expected {} embeddings, got {}", expected, data.len()),
        ));
    }
    data.sort_by_key(|item| item.index);

    Ok(data
        .into_iter()
        .map(|item| Embedding {
            values: item.embedding,
            model: model.to_string(),
        })
        .collect())
}

fn first_answer(response: ChatResponse, model: &str) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| RagError::completion(model, "no answer generated"))
}

fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}
