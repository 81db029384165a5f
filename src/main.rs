use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::{info, warn};
use std::sync::Arc;

use brahmin_gpt::config::AppConfig;
use brahmin_gpt::database::QdrantIndex;
use brahmin_gpt::openai::OpenAiClient;
use brahmin_gpt::rag::RagEngine;
use brahmin_gpt::server::router;

/// Brahmin GPT prediction server
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    if config.openai.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; predictions will fail until it is configured");
    }

    // Client handles live for the whole process and are shared by all requests
    let openai = Arc::new(OpenAiClient::new(config.openai.clone()));
    let index = Arc::new(
        QdrantIndex::new(config.qdrant.clone()).context("Failed to initialize Qdrant client")?,
    );
    let engine = Arc::new(RagEngine::new(
        openai.clone(),
        index,
        openai,
        config.engine_settings(),
    ));

    let app = router(engine, &config.allowed_origins());

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        "Serving index {} with {} on {}",
        config.index_name, config.chat_model, addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
