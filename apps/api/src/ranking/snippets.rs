//! Evidence snippets: the resume sentences closest to the job description.

use std::sync::OnceLock;

use regex::Regex;

use crate::inference::ModelError;
use crate::ranking::embedder::Embedder;
use crate::ranking::segmenter::truncate_chars;

pub const DEFAULT_SNIPPET_COUNT: usize = 5;
const FALLBACK_CHARS: usize = 400;

fn sentence_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("valid sentence regex"))
}

/// Splits on terminal punctuation followed by whitespace, keeping the
/// punctuation with its sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in sentence_end().find_iter(text) {
        let end = m.start() + 1;
        push_trimmed(&mut sentences, &text[start..end]);
        start = m.end();
    }
    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, sentence: &'a str) {
    let trimmed = sentence.trim();
    if !trimmed.is_empty() {
        out.push(trimmed);
    }
}

/// Top `k` sentences of `resume_text` by similarity to `jd_text`, best first.
/// Equal scores keep document order. A resume with no sentence break yields
/// its first 400 characters.
pub fn top_k_snippets(
    embedder: &Embedder,
    jd_text: &str,
    resume_text: &str,
    k: usize,
) -> Result<Vec<String>, ModelError> {
    if k == 0 || resume_text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let sentences = split_sentences(resume_text);
    if sentences.len() <= 1 {
        let head = truncate_chars(resume_text.trim(), FALLBACK_CHARS);
        return Ok(vec![head.to_string()]);
    }

    let jd = embedder.embed(jd_text)?;
    let mut scored = Vec::with_capacity(sentences.len());
    for sentence in sentences {
        let vector = embedder.embed(sentence)?;
        scored.push((embedder.similarity(&jd, &vector), sentence));
    }
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    Ok(scored
        .into_iter()
        .take(k)
        .map(|(_, s)| s.to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::inference::HashingEmbeddingModel;

    fn embedder() -> Embedder {
        Embedder::new(Arc::new(HashingEmbeddingModel::new(256)))
    }

    #[test]
    fn test_split_keeps_punctuation() {
        let sentences = split_sentences("Built APIs. Ran Kafka!  Led a team?\nShipped v2");
        assert_eq!(
            sentences,
            vec!["Built APIs.", "Ran Kafka!", "Led a team?", "Shipped v2"]
        );
    }

    #[test]
    fn test_decimal_point_does_not_split() {
        assert_eq!(split_sentences("Python 3.11 expert."), vec!["Python 3.11 expert."]);
    }

    #[test]
    fn test_most_relevant_sentence_first() {
        let resume = "I enjoy hiking on weekends. I build Rust services with Tokio and Axum. I play chess.";
        let snippets =
            top_k_snippets(&embedder(), "Rust engineer with Tokio and Axum", resume, 2).unwrap();
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0], "I build Rust services with Tokio and Axum.");
    }

    #[test]
    fn test_fallback_to_leading_characters() {
        let resume = "x".repeat(1000);
        let snippets = top_k_snippets(&embedder(), "anything", &resume, 5).unwrap();
        assert_eq!(snippets, vec!["x".repeat(400)]);
    }

    #[test]
    fn test_empty_resume_has_no_snippets() {
        assert!(top_k_snippets(&embedder(), "jd", "  ", 5).unwrap().is_empty());
        assert!(top_k_snippets(&embedder(), "jd", "a. b.", 0).unwrap().is_empty());
    }
}
