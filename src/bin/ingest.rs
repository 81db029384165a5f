use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::info;
use std::path::Path;
use std::sync::Arc;

use brahmin_gpt::chunking::{ChunkingConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use brahmin_gpt::config::AppConfig;
use brahmin_gpt::database::QdrantIndex;
use brahmin_gpt::document::Document;
use brahmin_gpt::openai::OpenAiClient;
use brahmin_gpt::rag::{RagEngine, DEFAULT_EMBED_BATCH_SIZE};

/// Split the source scripture into chunks, embed them and store them in the vector index
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the document to ingest (text or PDF)
    #[arg(index = 1, default_value = "knowledge/bhagavad_gita.txt")]
    file_path: String,

    /// Maximum chunk length in characters
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Characters carried over from the end of one chunk into the next
    #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
    chunk_overlap: usize,

    /// Chunks per embedding request
    #[arg(long, default_value_t = DEFAULT_EMBED_BATCH_SIZE)]
    batch_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let path = Path::new(&args.file_path);
    if !path.exists() {
        return Err(anyhow::anyhow!("File not found: {}", args.file_path));
    }

    let chunking = ChunkingConfig::new(args.chunk_size, args.chunk_overlap)
        .context("Invalid chunking parameters")?;
    let config = AppConfig::from_env().context("Invalid configuration")?;

    println!("Reading {}...", args.file_path);
    let document = Document::load(path).context("Failed to load document")?;
    info!(
        "Loaded {} ({:?}, {} bytes)",
        document.source,
        document.kind,
        document.content.len()
    );

    let openai = Arc::new(OpenAiClient::new(config.openai.clone()));
    let index = Arc::new(
        QdrantIndex::new(config.qdrant.clone()).context("Failed to initialize Qdrant client")?,
    );
    let mut settings = config.engine_settings();
    settings.embed_batch_size = args.batch_size;
    let engine = RagEngine::new(openai.clone(), index, openai, settings);

    println!(
        "Embedding with {} into index {}...",
        config.openai.embedding_model, config.index_name
    );
    let report = engine
        .ingest(&document, &chunking)
        .await
        .context("Ingestion failed")?;

    println!(
        "Done: {} chunks, {} duplicates skipped, {} entries stored in {}",
        report.chunks, report.duplicates, report.upserted, config.index_name
    );

    Ok(())
}
