//! Deterministic feature-hashing sentence encoder.
//!
//! Unigrams and adjacent-word bigrams of the lowercased text are hashed into a
//! fixed number of signed buckets, then L2-normalised. Identical input always
//! yields an identical vector.

use std::sync::{Arc, OnceLock};

use sha2::{Digest, Sha256};

use super::{EmbeddingModel, ModelError};

pub const DEFAULT_EMBEDDING_DIM: usize = 384;
const BIGRAM_WEIGHT: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct HashingEmbeddingModel {
    id: String,
    dim: usize,
}

impl HashingEmbeddingModel {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self {
            id: format!("hashing-bow-v1-{dim}"),
            dim,
        }
    }

    /// Process-wide instance, initialised on first use and never reloaded.
    ///
    /// Asking for a different dimension after initialisation is an error rather
    /// than a silent reload.
    pub fn shared(dim: usize) -> Result<Arc<Self>, ModelError> {
        static MODEL: OnceLock<Arc<HashingEmbeddingModel>> = OnceLock::new();
        let model = MODEL.get_or_init(|| Arc::new(Self::new(dim)));
        if model.dim != dim.max(1) {
            return Err(ModelError::Init(format!(
                "shared embedding model already loaded with dimension {}, requested {}",
                model.dim, dim
            )));
        }
        Ok(Arc::clone(model))
    }
}

impl EmbeddingModel for HashingEmbeddingModel {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
            .filter(|t| !t.is_empty())
            .collect();

        let mut vec = vec![0.0f32; self.dim];
        for token in &tokens {
            let (idx, sign) = hash_feature(token, self.dim);
            vec[idx] += sign;
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            let (idx, sign) = hash_feature(&bigram, self.dim);
            vec[idx] += sign * BIGRAM_WEIGHT;
        }
        Ok(l2_normalize(vec))
    }
}

fn hash_feature(feature: &str, dim: usize) -> (usize, f32) {
    let digest = Sha256::digest(feature.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    let val = u64::from_le_bytes(bytes);
    let idx = (val % dim as u64) as usize;
    let sign = if val & (1 << 63) != 0 { 1.0 } else { -1.0 };
    (idx, sign)
}

fn l2_normalize(mut vec: Vec<f32>) -> Vec<f32> {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        let inv = 1.0 / norm;
        for v in &mut vec {
            *v *= inv;
        }
    }
    vec
}
