mod config;
mod documents;
mod errors;
mod inference;
mod llm_client;
mod ranking;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::documents::DocumentLoader;
use crate::inference::{EmbeddingModel, HashingEmbeddingModel, LexiconTagger};
use crate::llm_client::LlmClient;
use crate::ranking::explainer::{Explainer, LlmSummaryGenerator};
use crate::ranking::orchestrator::{BatchLimits, OrchestratorOptions, RankingOrchestrator};
use crate::ranking::segmenter::{SegmenterConfig, TextSegmenter};
use crate::ranking::skills::SkillExtractor;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Ranker API v{}", env!("CARGO_PKG_VERSION"));

    // Models are loaded once per process and shared by handle
    let embedding_model =
        HashingEmbeddingModel::shared(config.embedding_dim).context("embedding model")?;
    let labeler = LexiconTagger::new(&config.extra_skills, config.ner_token_limit)
        .context("skill labeling model")?;
    info!(
        "Models ready (embedding: {}, labeling: lexicon, {} extra terms)",
        embedding_model.model_id(),
        config.extra_skills.len()
    );

    let orchestrator = RankingOrchestrator::new(
        TextSegmenter::new(SegmenterConfig {
            skill_headings: config.skill_headings.clone(),
            skill_view_chars: config.skill_view_chars,
        }),
        SkillExtractor::new(Arc::new(labeler), config.ner_chunk_overlap),
        embedding_model.clone(),
        OrchestratorOptions {
            limits: BatchLimits {
                max_resumes: config.max_resumes,
                max_resume_bytes: config.max_resume_bytes,
            },
            workers: config.workers,
            clean_jd: config.clean_jd,
        },
    );
    info!(
        "Ranking: max {} resumes, {} bytes each, {} workers",
        config.max_resumes, config.max_resume_bytes, config.workers
    );

    // Summaries are optional; without a key the explainer is unavailable
    let explainer = match &config.anthropic_api_key {
        Some(key) => {
            let llm = LlmClient::new(key.clone()).context("LLM client")?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Explainer::Available(Arc::new(LlmSummaryGenerator::new(
                llm,
                embedding_model.clone(),
                config.snippet_count,
            )))
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set, candidate summaries disabled");
            Explainer::Unavailable
        }
    };

    let shutdown = CancellationToken::new();
    let state = AppState {
        loader: DocumentLoader::new(config.max_resume_bytes),
        config: config.clone(),
        orchestrator,
        explainer,
        shutdown: shutdown.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, cancelling every in-flight ranking first.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, cancelling in-flight rankings");
    shutdown.cancel();
}
