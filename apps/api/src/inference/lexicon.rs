//! Dictionary-backed skill tagger.
//!
//! Stands in for a token-classification model: an ASCII-case-insensitive
//! automaton over a skill lexicon, emitting the leftmost-longest `SKILL` spans
//! that sit on word boundaries. Like a real NER model it refuses input above its
//! token limit.

use aho_corasick::{AhoCorasick, MatchKind};

use super::{count_tokens, LabeledSpan, ModelError, SequenceLabelingModel, SKILL_LABEL};

pub const DEFAULT_TOKEN_LIMIT: usize = 512;

/// Built-in lexicon. Ambiguous short words (`go`, `r`, `c`) are deliberately absent.
pub const DEFAULT_SKILL_LEXICON: &[&str] = &[
    // languages
    "python", "java", "javascript", "typescript", "rust", "golang", "c++", "c#", "ruby",
    "php", "scala", "kotlin", "swift", "objective-c", "haskell", "elixir", "erlang",
    "clojure", "perl", "matlab", "julia", "dart", "lua", "bash", "shell scripting",
    "powershell", "sql", "nosql", "graphql", "html", "css", "sass",
    // frameworks & libraries
    "react", "react native", "angular", "vue", "vue.js", "next.js", "node.js", "express",
    "django", "flask", "fastapi", "spring", "spring boot", "rails", "ruby on rails",
    ".net", "asp.net", "laravel", "tokio", "axum", "actix", "pandas", "numpy", "scikit-learn",
    "tensorflow", "pytorch", "keras", "hugging face", "spark", "pyspark", "hadoop",
    "airflow", "dbt", "kafka", "rabbitmq", "celery", "grpc", "rest", "restful apis",
    "microservices",
    // data stores
    "postgresql", "postgres", "mysql", "sqlite", "mongodb", "redis", "cassandra",
    "dynamodb", "elasticsearch", "snowflake", "bigquery", "redshift", "neo4j",
    // infrastructure
    "docker", "kubernetes", "terraform", "ansible", "helm", "aws", "azure", "gcp",
    "google cloud", "linux", "nginx", "ci/cd", "jenkins", "github actions", "gitlab",
    "git", "prometheus", "grafana", "datadog", "serverless", "lambda",
    // disciplines
    "machine learning", "deep learning", "natural language processing", "nlp",
    "computer vision", "data analysis", "data engineering", "data science",
    "statistics", "distributed systems", "systems programming", "system design",
    "embedded systems", "devops", "site reliability engineering", "sre",
    "cloud computing", "cybersecurity", "penetration testing", "etl",
    "data visualization", "tableau", "power bi", "excel", "a/b testing",
    "unit testing", "test automation", "agile", "scrum", "kanban", "jira",
    "product management", "project management", "technical writing",
    "communication", "leadership", "mentoring", "stakeholder management",
];

pub struct LexiconTagger {
    automaton: AhoCorasick,
    token_limit: usize,
}

impl LexiconTagger {
    /// Built-in lexicon plus `extra_terms`.
    pub fn new(extra_terms: &[String], token_limit: usize) -> Result<Self, ModelError> {
        let terms = DEFAULT_SKILL_LEXICON
            .iter()
            .map(|t| t.to_string())
            .chain(extra_terms.iter().cloned())
            .collect();
        Self::with_terms(terms, token_limit)
    }

    pub fn with_terms(terms: Vec<String>, token_limit: usize) -> Result<Self, ModelError> {
        let mut patterns: Vec<String> = terms
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        patterns.sort();
        patterns.dedup();

        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::Standard)
            .build(&patterns)
            .map_err(|e| ModelError::Init(format!("failed to build skill lexicon: {e}")))?;

        Ok(Self {
            automaton,
            token_limit: token_limit.max(1),
        })
    }
}

impl SequenceLabelingModel for LexiconTagger {
    fn model_id(&self) -> &str {
        "lexicon-tagger-v1"
    }

    fn token_limit(&self) -> usize {
        self.token_limit
    }

    fn label(&self, chunk: &str) -> Result<Vec<LabeledSpan>, ModelError> {
        let tokens = count_tokens(chunk);
        if tokens > self.token_limit {
            return Err(ModelError::InputTooLong {
                tokens,
                limit: self.token_limit,
            });
        }

        // Boundaries are checked before choosing, so a rejected long match
        // ("spring boot" in "Spring Bootstrap") leaves its shorter prefix in play.
        let mut found: Vec<(usize, usize)> = self
            .automaton
            .try_find_overlapping_iter(chunk)
            .map_err(|e| ModelError::Inference(format!("skill lexicon search failed: {e}")))?
            .filter(|m| on_word_boundary(chunk, m.start(), m.end()))
            .map(|m| (m.start(), m.end()))
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut spans = Vec::new();
        let mut cursor = 0;
        for (start, end) in found {
            if start < cursor {
                continue;
            }
            spans.push(LabeledSpan {
                text: chunk[start..end].to_string(),
                label: SKILL_LABEL.to_string(),
            });
            cursor = end;
        }
        Ok(spans)
    }
}

fn on_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before_ok = text[..start]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphanumeric());
    let after_ok = text[end..]
        .chars()
        .next()
        .map_or(true, |c| !(c.is_alphanumeric() || c == '+' || c == '#'));
    before_ok && after_ok
}
