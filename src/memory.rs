//! In-process [`VectorIndex`] using cosine similarity.
//!
//! Entries live in a `BTreeMap` keyed by id per index name, so ties in score
//! always resolve in ascending id order.

use crate::database::{IndexEntry, SearchHit, VectorIndex};
use crate::embeddings::Embedding;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryIndex {
    indexes: RwLock<HashMap<String, BTreeMap<u64, IndexEntry>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries stored under `index_name`
    pub async fn len(&self, index_name: &str) -> usize {
        self.indexes
            .read()
            .await
            .get(index_name)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }
}

/// Cosine similarity; 0.0 when either vector has zero magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn ensure_index(&self, index_name: &str, _dimensions: usize) -> Result<()> {
        self.indexes
            .write()
            .await
            .entry(index_name.to_string())
            .or_default();
        Ok(())
    }

    async fn upsert(&self, index_name: &str, entries: Vec<IndexEntry>) -> Result<()> {
        let mut indexes = self.indexes.write().await;
        let store = indexes
            .get_mut(index_name)
            .ok_or_else(|| RagError::vector_index(index_name, "index does not exist"))?;

        for entry in entries {
            store.insert(entry.id, entry);
        }
        Ok(())
    }

    async fn similarity_search(
        &self,
        index_name: &str,
        query: &Embedding,
        k: usize,
    ) -> Result<Vec<SearchHit>> {
        let indexes = self.indexes.read().await;
        let store = indexes
            .get(index_name)
            .ok_or_else(|| RagError::vector_index(index_name, "index does not exist"))?;

        let mut scored: Vec<(u64, SearchHit)> = store
            .values()
            .filter(|entry| entry.embedding.model == query.model)
            .map(|entry| {
                let score = cosine_similarity(&entry.embedding.values, &query.values);
                (
                    entry.id,
                    SearchHit {
                        text: entry.text.clone(),
                        score,
                    },
                )
            })
            .collect();

        scored.sort_by(|(id_a, a), (id_b, b)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(id_a.cmp(id_b))
        });
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, hit)| hit).collect())
    }
}
