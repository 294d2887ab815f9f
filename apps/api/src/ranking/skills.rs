//! Skill extraction: chunked sequence labeling into a canonical `SkillSet`.
//!
//! Text longer than the model's token limit is split into windows of at most
//! `token_limit` whitespace tokens. Windows end on a sentence boundary when one
//! falls in the back half of the window, otherwise on a token boundary, and
//! consecutive windows overlap by `overlap` tokens so a skill straddling a cut
//! is still seen whole by one of them.
//!
//! A failing chunk is skipped, never fatal: the result is `Degraded` when some
//! chunks failed and `Failed` (with an empty set) when all did.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::inference::{SequenceLabelingModel, SKILL_LABEL};
use crate::ranking::models::{ExtractionStatus, SkillSet};

pub const DEFAULT_CHUNK_OVERLAP: usize = 16;

const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', ';'];
const EDGE_PUNCTUATION: &[char] = &[
    ',', ';', ':', '!', '?', '(', ')', '[', ']', '{', '}', '"', '\'', '`', '*', '•', '·', '|',
    '/', '\\', '-', '–', '—', '“', '”', '‘', '’',
];

#[derive(Debug, Clone, PartialEq)]
pub struct SkillExtraction {
    pub skills: SkillSet,
    pub status: ExtractionStatus,
}

/// Wraps one labeling model. The same instance extracts JD and resume skills,
/// which keeps the comparison symmetric.
pub struct SkillExtractor {
    model: Arc<dyn SequenceLabelingModel>,
    overlap: usize,
}

impl SkillExtractor {
    pub fn new(model: Arc<dyn SequenceLabelingModel>, overlap: usize) -> Self {
        Self { model, overlap }
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    pub fn extract_skills(&self, text: &str) -> SkillExtraction {
        let chunks = plan_chunks(text, self.model.token_limit(), self.overlap);
        let total = chunks.len();
        debug!(
            model = self.model.model_id(),
            chunks = total,
            "skill extraction chunk plan"
        );

        let mut skills = SkillSet::new();
        let mut failed = 0usize;
        for (index, chunk) in chunks.iter().enumerate() {
            match self.model.label(chunk) {
                Ok(spans) => {
                    for span in spans.into_iter().filter(|s| is_skill_label(&s.label)) {
                        if let Some(skill) = canonical_skill(&span.text) {
                            skills.insert(skill);
                        }
                    }
                }
                Err(e) => {
                    failed += 1;
                    warn!(chunk = index, chunks = total, error = %e, "skill chunk failed, skipping");
                }
            }
        }

        let status = if failed == 0 {
            ExtractionStatus::Complete { chunks: total }
        } else if failed == total {
            warn!(chunks = total, "skill extraction failed for every chunk");
            skills = SkillSet::new();
            ExtractionStatus::Failed { chunks: total }
        } else {
            ExtractionStatus::Degraded {
                failed_chunks: failed,
                chunks: total,
            }
        };

        SkillExtraction { skills, status }
    }
}

/// Accepts `SKILL` as well as BIO-prefixed `B-SKILL` / `I-SKILL`.
fn is_skill_label(label: &str) -> bool {
    let bare = label
        .strip_prefix("B-")
        .or_else(|| label.strip_prefix("I-"))
        .unwrap_or(label);
    bare.eq_ignore_ascii_case(SKILL_LABEL)
}

/// Lowercases, collapses inner whitespace and strips edge punctuation, so
/// `"Python"`, `"python "` and `"(python),"` all become `"python"`. A leading
/// dot survives (`.net`); a trailing one does not.
pub fn canonical_skill(raw: &str) -> Option<String> {
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let trimmed = collapsed
        .trim_matches(|c: char| EDGE_PUNCTUATION.contains(&c) || c.is_whitespace())
        .trim_end_matches('.')
        .trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Byte spans of whitespace-delimited tokens.
fn token_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for (idx, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push((s, idx));
                start = None;
            }
            (false, None) => start = Some(idx),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}

/// Splits `text` into slices of at most `limit` tokens each.
pub fn plan_chunks(text: &str, limit: usize, overlap: usize) -> Vec<&str> {
    let tokens = token_spans(text);
    let n = tokens.len();
    if n == 0 {
        return Vec::new();
    }
    let limit = limit.max(1);
    let overlap = overlap.min(limit / 2);

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let hard_end = (start + limit).min(n);
        let mut end = hard_end;
        if hard_end < n {
            let floor = start + (limit / 2).max(1);
            if let Some(k) = (floor..hard_end).rev().find(|&k| {
                let (s, e) = tokens[k];
                text[s..e].ends_with(SENTENCE_TERMINATORS)
            }) {
                end = k + 1;
            }
        }

        chunks.push(&text[tokens[start].0..tokens[end - 1].1]);
        if end >= n {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }
    chunks
}
