//! Explainer: optional natural-language rationale for a ranked candidate.
//!
//! Summary generation is a capability that may be absent. Callers match on
//! `Explainer` once instead of catching failures at every call site; a failed
//! call yields no explanation and never affects scores or order.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::inference::{EmbeddingModel, ModelError};
use crate::llm_client::{LlmClient, LlmError};
use crate::ranking::embedder::Embedder;
use crate::ranking::models::ScoreBreakdown;
use crate::ranking::prompts::{build_fit_summary_prompt, FIT_SUMMARY_SYSTEM};
use crate::ranking::snippets::top_k_snippets;

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("snippet selection failed: {0}")]
    Model(#[from] ModelError),

    #[error("snippet worker failed: {0}")]
    Worker(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Produces a short fit rationale. Carried as `Arc<dyn SummaryGenerator>`.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn generate(
        &self,
        jd_text: &str,
        resume_text: &str,
        breakdown: &ScoreBreakdown,
    ) -> Result<String, ExplainError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmSummaryGenerator
// ────────────────────────────────────────────────────────────────────────────

/// Grounds the prompt on the resume sentences most similar to the JD.
/// Snippet embeddings are cached for one call only.
pub struct LlmSummaryGenerator {
    llm: LlmClient,
    embedding_model: Arc<dyn EmbeddingModel>,
    snippet_count: usize,
}

impl LlmSummaryGenerator {
    pub fn new(
        llm: LlmClient,
        embedding_model: Arc<dyn EmbeddingModel>,
        snippet_count: usize,
    ) -> Self {
        Self {
            llm,
            embedding_model,
            snippet_count,
        }
    }
}

#[async_trait]
impl SummaryGenerator for LlmSummaryGenerator {
    async fn generate(
        &self,
        jd_text: &str,
        resume_text: &str,
        breakdown: &ScoreBreakdown,
    ) -> Result<String, ExplainError> {
        let embedder = Embedder::new(Arc::clone(&self.embedding_model));
        let jd = jd_text.to_string();
        let resume = resume_text.to_string();
        let k = self.snippet_count;
        let snippets =
            tokio::task::spawn_blocking(move || top_k_snippets(&embedder, &jd, &resume, k))
                .await
                .map_err(|e| ExplainError::Worker(e.to_string()))??;

        let prompt = build_fit_summary_prompt(jd_text, &snippets, breakdown);
        Ok(self.llm.complete(&prompt, FIT_SUMMARY_SYSTEM).await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Explainer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum Explainer {
    Available(Arc<dyn SummaryGenerator>),
    Unavailable,
}

impl Explainer {
    pub fn is_available(&self) -> bool {
        matches!(self, Explainer::Available(_))
    }

    /// `None` when unavailable or when generation fails.
    pub async fn explain(
        &self,
        jd_text: &str,
        resume_text: &str,
        breakdown: &ScoreBreakdown,
    ) -> Option<String> {
        match self {
            Explainer::Unavailable => None,
            Explainer::Available(generator) => {
                match generator.generate(jd_text, resume_text, breakdown).await {
                    Ok(summary) => Some(summary),
                    Err(e) => {
                        warn!(
                            candidate = %breakdown.document_id,
                            error = %e,
                            "summary generation failed, omitting explanation"
                        );
                        None
                    }
                }
            }
        }
    }
}
