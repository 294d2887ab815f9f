//! Resume ranking: scores a batch of resumes against one job description.
//!
//! Pipeline per candidate: segment → extract skills → embed → score, then the
//! batch is sorted, gap-analysed and optionally explained.

pub mod embedder;
pub mod error;
pub mod explainer;
pub mod export;
pub mod gaps;
pub mod handlers;
pub mod jd_cleaner;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod scoring;
pub mod segmenter;
pub mod skills;
pub mod snippets;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{RankingError, ValidationError};
pub use explainer::Explainer;
pub use orchestrator::RankingOrchestrator;
