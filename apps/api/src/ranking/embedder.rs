//! Embedder: caching wrapper around an `EmbeddingModel`.
//!
//! Cache keys are `(model id, normalized text)`: the exact content, never a
//! document id, so two documents with identical text share one entry and two
//! models never share entries. Entries are published with an atomic
//! insert-if-absent; concurrent misses on the same key may both run the model,
//! but every caller observes the first fully written vector.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::inference::{EmbeddingModel, ModelError};

/// A cached embedding. `Empty` marks text with no content; it is never
/// passed through the cosine computation.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingVector {
    Empty,
    Dense(Arc<[f32]>),
}

impl EmbeddingVector {
    pub fn is_empty(&self) -> bool {
        matches!(self, EmbeddingVector::Empty)
    }

    pub fn values(&self) -> &[f32] {
        match self {
            EmbeddingVector::Empty => &[],
            EmbeddingVector::Dense(values) => &values[..],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    model_id: Arc<str>,
    text: String,
}

pub struct Embedder {
    model: Arc<dyn EmbeddingModel>,
    model_id: Arc<str>,
    cache: DashMap<CacheKey, EmbeddingVector>,
}

impl Embedder {
    pub fn new(model: Arc<dyn EmbeddingModel>) -> Self {
        let model_id: Arc<str> = Arc::from(model.model_id());
        Self {
            model,
            model_id,
            cache: DashMap::new(),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Embeds `text`, serving repeated content from the cache.
    pub fn embed(&self, text: &str) -> Result<EmbeddingVector, ModelError> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Ok(EmbeddingVector::Empty);
        }

        let key = self.key(normalized);
        if let Some(hit) = self.cache.get(&key) {
            debug!(model = %self.model_id, "embedding cache hit");
            return Ok(hit.value().clone());
        }

        let values = self.model.encode(&key.text)?;
        let expected = self.model.dimension();
        if values.len() != expected {
            return Err(ModelError::DimensionMismatch {
                expected,
                actual: values.len(),
            });
        }

        let published = self
            .cache
            .entry(key)
            .or_insert_with(|| EmbeddingVector::Dense(Arc::from(values)))
            .value()
            .clone();
        Ok(published)
    }

    /// Explicit cache probe: `Some` only for already-published entries.
    pub fn cached(&self, text: &str) -> Option<EmbeddingVector> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Some(EmbeddingVector::Empty);
        }
        self.cache
            .get(&self.key(normalized))
            .map(|entry| entry.value().clone())
    }

    pub fn similarity(&self, a: &EmbeddingVector, b: &EmbeddingVector) -> f32 {
        cosine_similarity(a, b)
    }

    /// Embeds both texts and returns their clamped cosine similarity.
    pub fn text_similarity(&self, a: &str, b: &str) -> Result<f32, ModelError> {
        let a = self.embed(a)?;
        let b = self.embed(b)?;
        Ok(self.similarity(&a, &b))
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn key(&self, text: String) -> CacheKey {
        CacheKey {
            model_id: Arc::clone(&self.model_id),
            text,
        }
    }
}

/// Collapses whitespace runs; case and punctuation are preserved.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cosine similarity clamped to `[0, 1]`. Empty, zero-norm or
/// mismatched-length inputs score 0.
pub fn cosine_similarity(a: &EmbeddingVector, b: &EmbeddingVector) -> f32 {
    let (a, b) = (a.values(), b.values());
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }

    let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
    if cosine.is_nan() {
        return 0.0;
    }
    cosine.clamp(0.0, 1.0)
}
