//! Data model shared by every ranking stage.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ranking::gaps::{CoverageMatrix, HeatmapCell, SkillFrequency};
use crate::ranking::stats::DistributionStats;

/// One candidate as submitted: caller-chosen id plus extracted resume text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateInput {
    pub id: String,
    pub text: String,
}

/// Where a document's skill view came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillViewSource {
    /// Text under one or more skill/requirement headings.
    Section,
    /// No heading found; the leading character window of the full view.
    LeadingWindow,
    /// The document itself is empty.
    Empty,
}

/// A segmented document. Immutable once built by the segmenter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    #[serde(skip)]
    pub raw_text: String,
    #[serde(skip)]
    pub full_view: String,
    pub skill_view: String,
    pub skill_view_source: SkillViewSource,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.full_view.is_empty()
    }
}

/// Canonical skill strings for one document. Ordered, so every derived
/// listing (missing skills, matrix columns) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillSet(BTreeSet<String>);

impl SkillSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an already-canonical skill.
    pub fn insert(&mut self, skill: String) -> bool {
        self.0.insert(skill)
    }

    pub fn contains(&self, skill: &str) -> bool {
        self.0.contains(skill)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn intersection_count(&self, other: &SkillSet) -> usize {
        self.0.intersection(&other.0).count()
    }

    /// Skills in `self` that `other` lacks.
    pub fn difference(&self, other: &SkillSet) -> Vec<String> {
        self.0.difference(&other.0).cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for SkillSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Outcome of chunked skill extraction for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionStatus {
    Complete { chunks: usize },
    /// Some chunks failed and were skipped; the skill set is partial.
    Degraded { failed_chunks: usize, chunks: usize },
    /// Every chunk failed; the skill set is empty.
    Failed { chunks: usize },
}

/// Per-candidate conditions surfaced in the output metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateFlag {
    EmptyInput,
    ExtractionDegraded,
    ExtractionFailed,
    EmbeddingFailed,
    /// The candidate's pipeline panicked; it is ranked with a zero score.
    EvaluationFailed,
    ExplanationUnavailable,
}

/// Score components for one (JD, resume) pair.
///
/// `final_score = min(0.35 * full + 0.65 * section + skill_bonus, 1.0)`,
/// `skill_bonus = 0.1 * skill_match_rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub document_id: String,
    pub full_doc_similarity: f32,
    pub skill_section_similarity: f32,
    pub skill_match_rate: f32,
    pub skill_bonus: f32,
    pub final_score: f32,
}

/// A scored candidate with its explainability data.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateResult {
    /// 1-based position in the ranking.
    pub rank: usize,
    /// Within the requested top_n.
    pub shortlisted: bool,
    #[serde(flatten)]
    pub breakdown: ScoreBreakdown,
    pub skills: SkillSet,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub coverage_percentage: f32,
    pub extraction: ExtractionStatus,
    pub flags: Vec<CandidateFlag>,
    pub explanation: Option<String>,
}

impl CandidateResult {
    pub fn id(&self) -> &str {
        &self.breakdown.document_id
    }
}

/// Candidates sorted by `final_score` descending, ties in submission order.
/// Every submitted candidate is scored; `top_n` only marks the shortlist.
#[derive(Debug, Clone, Serialize)]
pub struct RankingResult {
    pub top_n: usize,
    pub entries: Vec<CandidateResult>,
}

impl RankingResult {
    pub fn top(&self) -> &[CandidateResult] {
        &self.entries[..self.top_n.min(self.entries.len())]
    }

    pub fn get(&self, id: &str) -> Option<&CandidateResult> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn breakdowns(&self) -> impl Iterator<Item = &ScoreBreakdown> {
        self.entries.iter().map(|e| &e.breakdown)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunCompleteness {
    Complete,
    /// Cancelled mid-batch; `processed` of `requested` candidates were scored.
    Partial { processed: usize, requested: usize },
}

/// What was derived from the job description.
#[derive(Debug, Clone, Serialize)]
pub struct JdSummary {
    pub skills: SkillSet,
    pub extraction: ExtractionStatus,
    pub skill_view_source: SkillViewSource,
}

/// Everything one `rank` invocation produces.
#[derive(Debug, Clone, Serialize)]
pub struct RankingReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub completeness: RunCompleteness,
    pub jd: JdSummary,
    pub ranking: RankingResult,
    pub coverage: CoverageMatrix,
    pub stats: Option<DistributionStats>,
    pub most_missing_skills: Vec<SkillFrequency>,
    pub heatmap: Vec<HeatmapCell>,
}
