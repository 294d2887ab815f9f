//! Model seams: the embedding and sequence-labeling models the ranking pipeline consumes.
//!
//! Both traits are synchronous: inference is a local, possibly slow call that the
//! orchestrator moves onto blocking worker threads. Built-in implementations:
//! `HashingEmbeddingModel` (feature-hashed bag of words) and `LexiconTagger`
//! (dictionary tagger over a skill lexicon).

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod hashing;
pub mod lexicon;

pub use hashing::HashingEmbeddingModel;
pub use lexicon::LexiconTagger;

/// Label emitted for skill spans.
pub const SKILL_LABEL: &str = "SKILL";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("input of {tokens} tokens exceeds model limit of {limit}")]
    InputTooLong { tokens: usize, limit: usize },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("model initialisation failed: {0}")]
    Init(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Dense text encoder. Assumed deterministic for identical input.
pub trait EmbeddingModel: Send + Sync {
    /// Stable identity of the model; part of every embedding cache key.
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    fn encode(&self, text: &str) -> Result<Vec<f32>, ModelError>;
}

/// A labelled span returned by a sequence-labeling model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSpan {
    pub text: String,
    pub label: String,
}

/// Token-classification model with a hard input limit.
pub trait SequenceLabelingModel: Send + Sync {
    fn model_id(&self) -> &str;

    /// Maximum number of tokens (as counted by [`count_tokens`]) accepted per call.
    fn token_limit(&self) -> usize;

    fn label(&self, chunk: &str) -> Result<Vec<LabeledSpan>, ModelError>;
}

/// Token count used for model limits. Whitespace-delimited, matching the chunker.
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}
