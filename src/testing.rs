//! Fake collaborators for unit tests.

use crate::completion::{ChatPrompt, CompletionClient};
use crate::embeddings::{Embedding, Embedder};
use crate::error::{RagError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const FAKE_MODEL: &str = "fake-embedding";

/// Deterministic bag-of-letters embedder that counts its calls
#[derive(Default)]
pub struct FakeEmbedder {
    pub calls: AtomicUsize,
    pub batch_sizes: Mutex<Vec<usize>>,
    pub fail_with: Option<String>,
}

impl FakeEmbedder {
    pub fn failing(message: &str) -> Self {
        FakeEmbedder {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let mut values = vec![0.0f32; 26];
        for c in text.to_lowercase().chars() {
            if c.is_ascii_lowercase() {
                values[(c as u8 - b'a') as usize] += 1.0;
            }
        }
        values
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model(&self) -> &str {
        FAKE_MODEL
    }

    fn dimensions(&self) -> usize {
        26
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_with {
            return Err(RagError::embedding(FAKE_MODEL, message));
        }
        Ok(Embedding {
            values: Self::vector_for(text),
            model: FAKE_MODEL.to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        self.batch_sizes.lock().unwrap().push(texts.len());
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

/// Completion client that records prompts and returns a canned answer
pub struct FakeCompletion {
    pub answer: Result<String>,
    pub prompts: Mutex<Vec<(ChatPrompt, String)>>,
}

impl FakeCompletion {
    pub fn answering(answer: &str) -> Self {
        FakeCompletion {
            answer: Ok(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        FakeCompletion {
            answer: Err(RagError::completion("fake-chat", message)),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<(ChatPrompt, String)> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionClient for FakeCompletion {
    async fn complete(&self, prompt: &ChatPrompt, model: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.clone(), model.to_string()));
        match &self.answer {
            Ok(answer) => Ok(answer.clone()),
            Err(err) => Err(RagError::completion("fake-chat", err.to_string())),
        }
    }
}
