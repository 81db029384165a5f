use crate::chunking::TextChunk;
use crate::embeddings::Embedding;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use log::{debug, info};
use qdrant_client::qdrant::{
    with_payload_selector, Condition, CreateCollectionBuilder, Distance, Filter, PointStruct,
    SearchPoints, UpsertPointsBuilder, Value, VectorParams, WithPayloadSelector,
};
use qdrant_client::Qdrant;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// A chunk paired with its embedding, ready for storage
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Derived from the text, so re-ingesting the same chunk overwrites it
    pub id: u64,
    pub text: String,
    pub content_hash: String,
    pub embedding: Embedding,
    pub chunk_index: usize,
    pub source: String,
}

impl IndexEntry {
    pub fn from_chunk(chunk: TextChunk, embedding: Embedding) -> Self {
        let (id, content_hash) = content_id(&chunk.text);
        IndexEntry {
            id,
            text: chunk.text,
            content_hash,
            embedding,
            chunk_index: chunk.chunk_index,
            source: chunk.source,
        }
    }
}

/// Point id and hex digest for a chunk text.
/// The id is the first 8 bytes of the SHA-256 digest, big-endian.
pub fn content_id(text: &str) -> (u64, String) {
    let digest = Sha256::digest(text.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix), hex::encode(digest))
}

/// One similarity search result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub score: f32,
}

/// Named vector index storing (text, vector) pairs
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the index if it does not exist yet
    async fn ensure_index(&self, index_name: &str, dimensions: usize) -> Result<()>;

    /// Store entries; an existing entry with the same id is replaced
    async fn upsert(&self, index_name: &str, entries: Vec<IndexEntry>) -> Result<()>;

    /// Up to `k` entries nearest to `query`, most similar first.
    /// Only entries embedded with `query.model` are considered.
    async fn similarity_search(
        &self,
        index_name: &str,
        query: &Embedding,
        k: usize,
    ) -> Result<Vec<SearchHit>>;
}

/// Configuration for Qdrant
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        QdrantConfig {
            url: DEFAULT_QDRANT_URL.to_string(),
            api_key: None,
        }
    }
}

/// [`VectorIndex`] backed by a Qdrant collection using cosine distance
pub struct QdrantIndex {
    client: Qdrant,
}

impl QdrantIndex {
    /// Create a new Qdrant client
    pub fn new(config: QdrantConfig) -> Result<Self> {
        let config_builder = Qdrant::from_url(&config.url);
        let config_builder = if let Some(api_key) = config.api_key {
            config_builder.api_key(api_key)
        } else {
            config_builder
        };

        let client = config_builder
            .build()
            .map_err(|e| RagError::Config(format!("invalid Qdrant client config: {}", e)))?;

        Ok(QdrantIndex { client })
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_index(&self, index_name: &str, dimensions: usize) -> Result<()> {
        let exists = self
            .client
            .collection_exists(index_name)
            .await
            .map_err(|e| RagError::vector_index(index_name, e))?;

        if exists {
            debug!("Collection {} already exists", index_name);
            return Ok(());
        }

        info!(
            "Creating collection {} ({} dimensions, cosine)",
            index_name, dimensions
        );
        let create_collection =
            CreateCollectionBuilder::new(index_name).vectors_config(VectorParams {
                size: dimensions as u64,
                distance: Distance::Cosine.into(),
                ..Default::default()
            });

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| RagError::vector_index(index_name, e))?;

        Ok(())
    }

    async fn upsert(&self, index_name: &str, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = entries
            .into_iter()
            .map(|entry| {
                let mut payload: HashMap<String, Value> = HashMap::new();
                payload.insert("text".to_string(), Value::from(entry.text));
                payload.insert("content_hash".to_string(), Value::from(entry.content_hash));
                payload.insert(
                    "embedding_model".to_string(),
                    Value::from(entry.embedding.model),
                );
                payload.insert(
                    "chunk_index".to_string(),
                    Value::from(entry.chunk_index as i64),
                );
                payload.insert("source".to_string(), Value::from(entry.source));

                PointStruct::new(entry.id, entry.embedding.values, payload)
            })
            .collect();

        let count = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(index_name, points).wait(true))
            .await
            .map_err(|e| RagError::vector_index(index_name, e))?;

        debug!("Upserted {} points into {}", count, index_name);
        Ok(())
    }

    async fn similarity_search(
        &self,
        index_name: &str,
        query: &Embedding,
        k: usize,
    ) -> Result<Vec<SearchHit>> {
        let search_request = SearchPoints {
            collection_name: index_name.to_string(),
            vector: query.values.clone(),
            limit: k as u64,
            filter: Some(Filter::must([Condition::matches(
                "embedding_model",
                query.model.clone(),
            )])),
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(with_payload_selector::SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let search_response = self
            .client
            .search_points(search_request)
            .await
            .map_err(|e| RagError::vector_index(index_name, e))?;

        // Qdrant already orders by descending score
        let hits = search_response
            .result
            .into_iter()
            .filter_map(|scored_point| {
                let text = scored_point.payload.get("text")?.as_str()?.to_string();
                Some(SearchHit {
                    text,
                    score: scored_point.score,
                })
            })
            .collect();

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_is_stable_and_text_sensitive() {
        let (id_a, hash_a) = content_id("Karmanye vadhikaraste");
        let (id_b, hash_b) = content_id("Karmanye vadhikaraste");
        let (id_c, _) = content_id("Karmanye vadhikaraste.");

        assert_eq!(id_a, id_b);
        assert_eq!(hash_a, hash_b);
        assert_ne!(id_a, id_c);
        assert_eq!(hash_a.len(), 64);
        assert_eq!(
            id_a,
            u64::from_str_radix(&hash_a[..16], 16).unwrap(),
            "id is the digest prefix"
        );
    }

    #[test]
    fn test_index_entry_from_chunk() {
        let chunk = TextChunk {
            text: "Yoga is skill in action.".to_string(),
            chunk_index: 7,
            source: "gita.txt".to_string(),
            start_position: 120,
        };
        let embedding = Embedding {
            values: vec![0.1, 0.2],
            model: "text-embedding-3-small".to_string(),
        };

        let entry = IndexEntry::from_chunk(chunk, embedding.clone());

        assert_eq!(entry.id, content_id("Yoga is skill in action.").0);
        assert_eq!(entry.chunk_index, 7);
        assert_eq!(entry.source, "gita.txt");
        assert_eq!(entry.embedding, embedding);
    }
}
