use anyhow::{Context, Result};

use crate::inference::hashing::DEFAULT_EMBEDDING_DIM;
use crate::inference::lexicon::DEFAULT_TOKEN_LIMIT;
use crate::ranking::orchestrator::{DEFAULT_MAX_RESUMES, DEFAULT_MAX_RESUME_BYTES};
use crate::ranking::segmenter::{DEFAULT_SKILL_HEADINGS, DEFAULT_SKILL_VIEW_CHARS};
use crate::ranking::skills::DEFAULT_CHUNK_OVERLAP;
use crate::ranking::snippets::DEFAULT_SNIPPET_COUNT;

pub const DEFAULT_TOP_N: usize = 10;

/// Application configuration loaded from environment variables.
/// Every variable is optional; a malformed value fails startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub max_resumes: usize,
    pub max_resume_bytes: usize,
    pub skill_view_chars: usize,
    pub skill_headings: Vec<String>,
    pub ner_token_limit: usize,
    pub ner_chunk_overlap: usize,
    pub embedding_dim: usize,
    pub extra_skills: Vec<String>,
    pub workers: usize,
    pub default_top_n: usize,
    pub clean_jd: bool,
    pub snippet_count: usize,
    /// Summaries are disabled when unset.
    pub anthropic_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            port: parse_or(&get, "PORT", 8080u16)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            max_resumes: positive_or(&get, "RANKER_MAX_RESUMES", DEFAULT_MAX_RESUMES)?,
            max_resume_bytes: positive_or(&get, "RANKER_MAX_RESUME_BYTES", DEFAULT_MAX_RESUME_BYTES)?,
            skill_view_chars: positive_or(&get, "RANKER_SKILL_VIEW_CHARS", DEFAULT_SKILL_VIEW_CHARS)?,
            skill_headings: get("RANKER_SKILL_HEADINGS")
                .map(|v| split_list(&v))
                .unwrap_or_else(|| DEFAULT_SKILL_HEADINGS.iter().map(|h| h.to_string()).collect()),
            ner_token_limit: positive_or(&get, "RANKER_NER_TOKEN_LIMIT", DEFAULT_TOKEN_LIMIT)?,
            ner_chunk_overlap: parse_or(&get, "RANKER_NER_CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?,
            embedding_dim: positive_or(&get, "RANKER_EMBEDDING_DIM", DEFAULT_EMBEDDING_DIM)?,
            extra_skills: get("RANKER_EXTRA_SKILLS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            workers: positive_or(&get, "RANKER_WORKERS", default_workers())?,
            default_top_n: positive_or(&get, "RANKER_DEFAULT_TOP_N", DEFAULT_TOP_N)?,
            clean_jd: parse_bool_or(&get, "RANKER_CLEAN_JD", false)?,
            snippet_count: parse_or(&get, "RANKER_SNIPPET_COUNT", DEFAULT_SNIPPET_COUNT)?,
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
        })
    }

    /// Largest request body the upload and JSON routes accept.
    pub fn body_limit(&self) -> usize {
        self.max_resumes
            .saturating_add(1)
            .saturating_mul(self.max_resume_bytes)
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

fn positive_or(get: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> Result<usize> {
    let value = parse_or(get, key, default)?;
    anyhow::ensure!(value > 0, "{key} must be greater than zero");
    Ok(value)
}

fn parse_bool_or(get: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool> {
    match get(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("{key} must be a boolean, got '{v}'"),
        },
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
