use crate::database::QdrantConfig;
use crate::database::DEFAULT_QDRANT_URL;
use crate::error::{RagError, Result};
use crate::openai::{
    known_embedding_dimensions, OpenAiConfig, API_KEY_VAR, DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL,
    DEFAULT_EMBEDDING_MODEL,
};
use crate::rag::{EngineSettings, DEFAULT_EMBED_BATCH_SIZE, DEFAULT_TOP_K};
use std::env;
use std::str::FromStr;

/// Index shared by the ingestion job and the server
pub const DEFAULT_INDEX_NAME: &str = "jyotai-brahmin-gpt";

/// Origins always allowed to call the API from a browser
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:5173"];

/// Process configuration read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai: OpenAiConfig,
    pub chat_model: String,
    pub index_name: String,
    pub qdrant: QdrantConfig,
    pub top_k: usize,
    /// Extra origin allowed by CORS, typically the deployed frontend
    pub frontend_url: Option<String>,
}

impl AppConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let embedding_model =
            get("OPENAI_EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
        let embedding_dimensions = match get("EMBEDDING_DIMENSIONS") {
            Some(raw) => parse_number("EMBEDDING_DIMENSIONS", &raw)?,
            None => known_embedding_dimensions(&embedding_model).ok_or_else(|| {
                RagError::Config(format!(
                    "EMBEDDING_DIMENSIONS must be set for embedding model {}",
                    embedding_model
                ))
            })?,
        };

        let top_k = match get("RETRIEVAL_TOP_K") {
            Some(raw) => parse_number("RETRIEVAL_TOP_K", &raw)?,
            None => DEFAULT_TOP_K,
        };
        if top_k == 0 {
            return Err(RagError::Config("RETRIEVAL_TOP_K must be at least 1".to_string()));
        }

        Ok(AppConfig {
            openai: OpenAiConfig {
                api_key: get(API_KEY_VAR),
                base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                embedding_model,
                embedding_dimensions,
            },
            chat_model: get("OPENAI_CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            index_name: get("VECTOR_INDEX_NAME").unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
            qdrant: QdrantConfig {
                url: get("QDRANT_URL").unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
                api_key: get("QDRANT_API_KEY"),
            },
            top_k,
            frontend_url: get("FRONTEND_URL"),
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            index_name: self.index_name.clone(),
            chat_model: self.chat_model.clone(),
            top_k: self.top_k,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
            api_key_configured: self.openai.api_key.is_some(),
        }
    }

    /// CORS allow-list: the local development origins plus the configured frontend
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = DEFAULT_ALLOWED_ORIGINS
            .iter()
            .map(|origin| origin.to_string())
            .collect();

        if let Some(frontend) = &self.frontend_url {
            let frontend = frontend.trim_end_matches('/').to_string();
            if !origins.contains(&frontend) {
                origins.push(frontend);
            }
        }

        origins
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| RagError::Config(format!("{} must be a positive integer, got {:?}", key, raw)))
}
