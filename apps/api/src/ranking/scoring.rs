//! Scoring: combines document similarity, skill-section similarity and skill
//! coverage into one final score per resume.
//!
//! Policy: technical fit is the primary signal, so the skill-section view carries
//! 65% of the similarity weight and the whole document 35%. Skill coverage adds a
//! bonus of up to 0.1 on top; the sum is capped at 1.0.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::inference::ModelError;
use crate::ranking::embedder::Embedder;
use crate::ranking::models::{Document, ScoreBreakdown, SkillSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub full_document: f32,
    pub skill_section: f32,
    /// Bonus at a 100% skill match rate.
    pub max_skill_bonus: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            full_document: 0.35,
            skill_section: 0.65,
            max_skill_bonus: 0.1,
        }
    }
}

/// |jd ∩ resume| / |jd|, or 0 when the JD yielded no skills.
pub fn skill_match_rate(jd_skills: &SkillSet, resume_skills: &SkillSet) -> f32 {
    if jd_skills.is_empty() {
        return 0.0;
    }
    jd_skills.intersection_count(resume_skills) as f32 / jd_skills.len() as f32
}

/// Applies the weighting policy to already-computed components.
/// Inputs are clamped to `[0, 1]` so the result always is too.
pub fn combine_scores(
    document_id: &str,
    full_doc_similarity: f32,
    skill_section_similarity: f32,
    skill_match_rate: f32,
    weights: &ScoringWeights,
) -> ScoreBreakdown {
    let full = unit(full_doc_similarity);
    let section = unit(skill_section_similarity);
    let rate = unit(skill_match_rate);
    let skill_bonus = weights.max_skill_bonus * rate;
    let final_score =
        (weights.full_document * full + weights.skill_section * section + skill_bonus).clamp(0.0, 1.0);

    ScoreBreakdown {
        document_id: document_id.to_string(),
        full_doc_similarity: full,
        skill_section_similarity: section,
        skill_match_rate: rate,
        skill_bonus,
        final_score,
    }
}

fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[derive(Clone)]
pub struct ScoringEngine {
    embedder: Arc<Embedder>,
    weights: ScoringWeights,
}

impl ScoringEngine {
    pub fn new(embedder: Arc<Embedder>) -> Self {
        Self {
            embedder,
            weights: ScoringWeights::default(),
        }
    }

    pub fn embedder(&self) -> &Arc<Embedder> {
        &self.embedder
    }

    pub fn score(
        &self,
        jd: &Document,
        jd_skills: &SkillSet,
        resume: &Document,
        resume_skills: &SkillSet,
    ) -> Result<ScoreBreakdown, ModelError> {
        let full = self
            .embedder
            .text_similarity(&jd.full_view, &resume.full_view)?;
        let section = self
            .embedder
            .text_similarity(&jd.skill_view, &resume.skill_view)?;
        let rate = skill_match_rate(jd_skills, resume_skills);
        Ok(self.combine(&resume.id, full, section, rate))
    }

    pub fn combine(
        &self,
        document_id: &str,
        full_doc_similarity: f32,
        skill_section_similarity: f32,
        skill_match_rate: f32,
    ) -> ScoreBreakdown {
        combine_scores(
            document_id,
            full_doc_similarity,
            skill_section_similarity,
            skill_match_rate,
            &self.weights,
        )
    }
}
