//! Deterministic stand-ins for the model seams, shared by the ranking tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::inference::{
    EmbeddingModel, HashingEmbeddingModel, LabeledSpan, LexiconTagger, ModelError,
    SequenceLabelingModel,
};
use crate::llm_client::LlmError;
use crate::ranking::explainer::{ExplainError, SummaryGenerator};
use crate::ranking::models::{CandidateInput, ScoreBreakdown};
use crate::ranking::orchestrator::{OrchestratorOptions, RankingOrchestrator};
use crate::ranking::segmenter::TextSegmenter;
use crate::ranking::skills::{SkillExtractor, DEFAULT_CHUNK_OVERLAP};

pub const TEST_EMBEDDING_DIM: usize = 256;
pub const TEST_TOKEN_LIMIT: usize = 64;

/// Hashing embeddings that count `encode` calls.
pub struct CountingEmbeddingModel {
    inner: HashingEmbeddingModel,
    reported_dimension: usize,
    calls: AtomicUsize,
}

impl CountingEmbeddingModel {
    pub fn new(dim: usize) -> Self {
        Self::with_reported_dimension(dim, dim)
    }

    /// Encodes `actual` values while claiming `reported`.
    pub fn with_reported_dimension(actual: usize, reported: usize) -> Self {
        Self {
            inner: HashingEmbeddingModel::new(actual),
            reported_dimension: reported,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingModel for CountingEmbeddingModel {
    fn model_id(&self) -> &str {
        "counting-test-model"
    }

    fn dimension(&self) -> usize {
        self.reported_dimension
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.encode(text)
    }
}

/// Lexicon tagger that errors on chunks containing `marker`, or on every chunk.
pub struct FlakyLabeler {
    inner: LexiconTagger,
    marker: Option<String>,
}

impl FlakyLabeler {
    pub fn failing_on(marker: &str, token_limit: usize) -> Self {
        Self {
            inner: LexiconTagger::new(&[], token_limit).unwrap(),
            marker: Some(marker.to_string()),
        }
    }

    pub fn always_failing(token_limit: usize) -> Self {
        Self {
            inner: LexiconTagger::new(&[], token_limit).unwrap(),
            marker: None,
        }
    }
}

impl SequenceLabelingModel for FlakyLabeler {
    fn model_id(&self) -> &str {
        "flaky-test-labeler"
    }

    fn token_limit(&self) -> usize {
        self.inner.token_limit()
    }

    fn label(&self, chunk: &str) -> Result<Vec<LabeledSpan>, ModelError> {
        match &self.marker {
            Some(marker) if !chunk.contains(marker.as_str()) => self.inner.label(chunk),
            _ => Err(ModelError::Inference("labeler unavailable".to_string())),
        }
    }
}

/// Lexicon tagger that panics on chunks containing `marker`.
pub struct PanickingLabeler {
    inner: LexiconTagger,
    marker: String,
}

impl PanickingLabeler {
    pub fn on(marker: &str) -> Self {
        Self {
            inner: LexiconTagger::new(&[], TEST_TOKEN_LIMIT).unwrap(),
            marker: marker.to_string(),
        }
    }
}

impl SequenceLabelingModel for PanickingLabeler {
    fn model_id(&self) -> &str {
        "panicking-test-labeler"
    }

    fn token_limit(&self) -> usize {
        self.inner.token_limit()
    }

    fn label(&self, chunk: &str) -> Result<Vec<LabeledSpan>, ModelError> {
        if chunk.contains(self.marker.as_str()) {
            panic!("labeler crashed on {}", self.marker);
        }
        self.inner.label(chunk)
    }
}

pub fn candidate(id: &str, text: &str) -> CandidateInput {
    CandidateInput {
        id: id.to_string(),
        text: text.to_string(),
    }
}

pub fn breakdown(id: &str, final_score: f32) -> ScoreBreakdown {
    ScoreBreakdown {
        document_id: id.to_string(),
        full_doc_similarity: final_score,
        skill_section_similarity: final_score,
        skill_match_rate: 0.0,
        skill_bonus: 0.0,
        final_score,
    }
}

pub fn orchestrator() -> RankingOrchestrator {
    orchestrator_with(|_| {})
}

pub fn orchestrator_with(configure: impl FnOnce(&mut OrchestratorOptions)) -> RankingOrchestrator {
    let labeler = Arc::new(LexiconTagger::new(&[], TEST_TOKEN_LIMIT).unwrap());
    orchestrator_with_labeler(labeler, configure)
}

pub fn orchestrator_with_labeler(
    labeler: Arc<dyn SequenceLabelingModel>,
    configure: impl FnOnce(&mut OrchestratorOptions),
) -> RankingOrchestrator {
    let embedding_model = Arc::new(HashingEmbeddingModel::new(TEST_EMBEDDING_DIM));
    orchestrator_with_models(embedding_model, labeler, configure)
}

pub fn orchestrator_with_models(
    embedding_model: Arc<dyn EmbeddingModel>,
    labeler: Arc<dyn SequenceLabelingModel>,
    configure: impl FnOnce(&mut OrchestratorOptions),
) -> RankingOrchestrator {
    let mut options = OrchestratorOptions {
        workers: 4,
        ..OrchestratorOptions::default()
    };
    configure(&mut options);
    RankingOrchestrator::new(
        TextSegmenter::default(),
        SkillExtractor::new(labeler, DEFAULT_CHUNK_OVERLAP),
        embedding_model,
        options,
    )
}

/// Summary generator that answers `summary for <id>` or always fails.
pub struct StubSummaryGenerator {
    fail: bool,
}

impl StubSummaryGenerator {
    pub fn succeeding() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl SummaryGenerator for StubSummaryGenerator {
    async fn generate(
        &self,
        _jd_text: &str,
        _resume_text: &str,
        breakdown: &ScoreBreakdown,
    ) -> Result<String, ExplainError> {
        if self.fail {
            return Err(ExplainError::Llm(LlmError::EmptyContent));
        }
        Ok(format!("summary for {}", breakdown.document_id))
    }
}

/// Succeeding generator that records the peak number of concurrent calls.
#[derive(Default)]
pub struct TrackingSummaryGenerator {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl TrackingSummaryGenerator {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummaryGenerator for TrackingSummaryGenerator {
    async fn generate(
        &self,
        _jd_text: &str,
        _resume_text: &str,
        breakdown: &ScoreBreakdown,
    ) -> Result<String, ExplainError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(format!("summary for {}", breakdown.document_id))
    }
}
