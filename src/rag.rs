use crate::chunking::{split_into_chunks, ChunkingConfig, TextChunk};
use crate::completion::CompletionClient;
use crate::database::{content_id, IndexEntry, VectorIndex};
use crate::document::Document;
use crate::embeddings::Embedder;
use crate::error::{RagError, Result};
use crate::openai::API_KEY_VAR;
use crate::prompt::{build_prompt, PredictionRequest};
use log::{debug, info};
use std::collections::HashSet;
use std::sync::Arc;

pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 64;

/// Per-process settings shared by ingestion and answering
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub index_name: String,
    pub chat_model: String,
    /// Number of chunks retrieved per question
    pub top_k: usize,
    /// Number of chunks sent per embedding request during ingestion
    pub embed_batch_size: usize,
    /// Whether the hosted-API credential is present
    pub api_key_configured: bool,
}

/// Outcome of an ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Chunks produced by the splitter
    pub chunks: usize,
    /// Chunks dropped because an identical text was already in this run
    pub duplicates: usize,
    /// Entries written to the index
    pub upserted: usize,
}

/// RAG (Retrieval-Augmented Generation) engine
pub struct RagEngine {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    completion: Arc<dyn CompletionClient>,
    settings: EngineSettings,
}

impl RagEngine {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        completion: Arc<dyn CompletionClient>,
        settings: EngineSettings,
    ) -> Self {
        RagEngine {
            embedder,
            index,
            completion,
            settings,
        }
    }

    fn require_credential(&self) -> Result<()> {
        if self.settings.api_key_configured {
            Ok(())
        } else {
            Err(RagError::MissingCredential(API_KEY_VAR))
        }
    }

    /// Chunk a document, embed the chunks and store them in the index
    pub async fn ingest(
        &self,
        document: &Document,
        chunking: &ChunkingConfig,
    ) -> Result<IngestReport> {
        self.require_credential()?;

        let chunks = split_into_chunks(&document.content, &document.source, chunking);
        info!("Split {} into {} chunks", document.source, chunks.len());

        let total = chunks.len();
        let unique = dedupe_chunks(chunks);
        let duplicates = total - unique.len();
        if duplicates > 0 {
            info!("Skipping {} duplicate chunks", duplicates);
        }

        let index_name = &self.settings.index_name;
        self.index
            .ensure_index(index_name, self.embedder.dimensions())
            .await?;

        let batch_size = self.settings.embed_batch_size.max(1);
        let batches = unique.len().div_ceil(batch_size);
        let mut upserted = 0;
        let mut remaining = unique.into_iter().peekable();
        let mut batch_number = 0;

        while remaining.peek().is_some() {
            let batch: Vec<TextChunk> = remaining.by_ref().take(batch_size).collect();
            batch_number += 1;

            let texts: Vec<&str> = batch.iter().map(|chunk| chunk.text.as_str()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(RagError::embedding(
                    self.embedder.model(),
                    format!("expected {} embeddings, got {}", batch.len(), embeddings.len()),
                ));
            }

            let entries: Vec<IndexEntry> = batch
                .into_iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| IndexEntry::from_chunk(chunk, embedding))
                .collect();
            let count = entries.len();

            self.index.upsert(index_name, entries).await?;
            upserted += count;
            info!(
                "Stored batch {}/{} ({} of {} chunks)",
                batch_number,
                batches,
                upserted,
                total - duplicates
            );
        }

        Ok(IngestReport {
            chunks: total,
            duplicates,
            upserted,
        })
    }

    /// Texts of the `top_k` chunks nearest to the question
    pub async fn retrieve(&self, question: &str) -> Result<Vec<String>> {
        let question_embedding = self.embedder.embed(question).await?;

        let hits = self
            .index
            .similarity_search(&self.settings.index_name, &question_embedding, self.settings.top_k)
            .await?;
        debug!("Retrieved {} chunks", hits.len());

        Ok(hits.into_iter().map(|hit| hit.text).collect())
    }

    /// Answer a question grounded in the indexed corpus
    pub async fn predict(&self, request: &PredictionRequest) -> Result<String> {
        self.require_credential()?;

        let context = self.retrieve(request.question.trim()).await?;
        let prompt = build_prompt(&context, request);

        let answer = self
            .completion
            .complete(&prompt, &self.settings.chat_model)
            .await?;

        if answer.trim().is_empty() {
            return Err(RagError::completion(&self.settings.chat_model, "empty answer"));
        }

        Ok(answer)
    }
}

/// Keep the first occurrence of each chunk text
fn dedupe_chunks(chunks: Vec<TextChunk>) -> Vec<TextChunk> {
    let mut seen = HashSet::new();
    chunks
        .into_iter()
        .filter(|chunk| seen.insert(content_id(&chunk.text).0))
        .collect()
}
