pub mod chunking;
pub mod completion;
pub mod config;
pub mod database;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod memory;
pub mod openai;
pub mod prompt;
pub mod rag;
pub mod server;

#[cfg(test)]
mod testing;
