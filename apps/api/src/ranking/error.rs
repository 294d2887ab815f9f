use thiserror::Error;

use crate::inference::ModelError;

/// Batch-level input problems. Any of these rejects the whole batch before a
/// model is called.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one resume is required")]
    EmptyBatch,

    #[error("batch holds {count} resumes, the maximum is {max}")]
    BatchTooLarge { count: usize, max: usize },

    #[error("document '{id}' is {bytes} bytes, the maximum is {max}")]
    DocumentTooLarge { id: String, bytes: usize, max: usize },

    #[error("resume at position {index} has an empty id")]
    EmptyCandidateId { index: usize },

    #[error("duplicate resume id '{0}'")]
    DuplicateCandidateId(String),
}

#[derive(Debug, Error)]
pub enum RankingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Cancelled before any candidate finished.
    #[error("ranking cancelled before any candidate was scored")]
    Cancelled,

    /// A failure that is not attributable to one candidate, such as the job
    /// description itself failing to embed.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("worker task failed: {0}")]
    Worker(String),
}
