use thiserror::Error;

/// Message returned to callers when the API key is absent
pub const MISSING_CREDENTIAL_MESSAGE: &str = "OpenAI API key is not configured.";

/// Message returned to callers for every other failure
pub const ORACLE_UNAVAILABLE_MESSAGE: &str = "Failed to get a prediction from the divine oracle.";

/// Errors produced by the ingestion and query pipelines
#[derive(Debug, Error)]
pub enum RagError {
    /// Required credential is not configured
    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("embedding request failed ({model}): {message}")]
    Embedding { model: String, message: String },

    #[error("vector index error ({index}): {message}")]
    VectorIndex { index: String, message: String },

    #[error("completion request failed ({model}): {message}")]
    Completion { model: String, message: String },

    #[error("invalid chunking parameters: {0}")]
    InvalidChunking(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("document error: {0}")]
    Document(String),
}

/// Coarse classification used at the HTTP boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Configuration,
    Retrieval,
    Completion,
    Input,
}

impl RagError {
    pub fn embedding(model: impl Into<String>, message: impl ToString) -> Self {
        RagError::Embedding {
            model: model.into(),
            message: message.to_string(),
        }
    }

    pub fn vector_index(index: impl Into<String>, message: impl ToString) -> Self {
        RagError::VectorIndex {
            index: index.into(),
            message: message.to_string(),
        }
    }

    pub fn completion(model: impl Into<String>, message: impl ToString) -> Self {
        RagError::Completion {
            model: model.into(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            RagError::MissingCredential(_) | RagError::Config(_) => FailureKind::Configuration,
            RagError::Embedding { .. } | RagError::VectorIndex { .. } => FailureKind::Retrieval,
            RagError::Completion { .. } => FailureKind::Completion,
            RagError::InvalidChunking(_) | RagError::Document(_) => FailureKind::Input,
        }
    }

    /// Fixed, client-safe text for this error. Never includes provider detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            RagError::MissingCredential(_) => MISSING_CREDENTIAL_MESSAGE,
            _ => ORACLE_UNAVAILABLE_MESSAGE,
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
