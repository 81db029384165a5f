use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Identifier of the model that produced `values`
    pub model: String,
}

/// Turns text into vectors.
///
/// Ingestion and query time must share one implementation configured with
/// the same model, otherwise similarity scores are meaningless.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier stamped on every embedding
    fn model(&self) -> &str;

    /// Dimensionality of produced vectors
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed several texts, preserving input order
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}
