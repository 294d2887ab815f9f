//! Gap analysis: per-candidate missing skills and the candidate × skill coverage matrix.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ranking::models::SkillSet;

/// Boolean presence of every JD skill for every candidate.
/// Rows follow the candidate order given to the analyzer, columns the JD skill order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageMatrix {
    skills: Vec<String>,
    candidates: Vec<String>,
    cells: Vec<Vec<bool>>,
}

impl CoverageMatrix {
    pub fn skills(&self) -> &[String] {
        &self.skills
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// `None` when either the candidate or the skill is unknown.
    pub fn get(&self, candidate_id: &str, skill: &str) -> Option<bool> {
        let row = self.candidates.iter().position(|c| c == candidate_id)?;
        let col = self.skills.iter().position(|s| s == skill)?;
        Some(self.cells[row][col])
    }

    pub fn row(&self, candidate_id: &str) -> Option<&[bool]> {
        let row = self.candidates.iter().position(|c| c == candidate_id)?;
        Some(&self.cells[row])
    }

    /// No JD skills, hence no columns.
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

/// Matched and missing JD skills for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateGap {
    pub candidate_id: String,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    /// 0–100; 0 when the JD has no skills.
    pub coverage_percentage: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GapAnalysis {
    pub coverage: CoverageMatrix,
    pub gaps: Vec<CandidateGap>,
}

impl GapAnalysis {
    pub fn gap_for(&self, candidate_id: &str) -> Option<&CandidateGap> {
        self.gaps.iter().find(|g| g.candidate_id == candidate_id)
    }

    pub fn missing_for(&self, candidate_id: &str) -> Option<&[String]> {
        self.gap_for(candidate_id).map(|g| g.missing.as_slice())
    }
}

/// How many of the inspected candidates lack a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillFrequency {
    pub skill: String,
    pub candidates_missing: usize,
}

/// One heatmap cell; `matched` is 1/0 presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapCell {
    pub candidate: String,
    pub skill: String,
    pub matched: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GapAnalyzer;

impl GapAnalyzer {
    pub fn analyze(&self, jd_skills: &SkillSet, candidates: &[(&str, &SkillSet)]) -> GapAnalysis {
        let skills: Vec<String> = jd_skills.iter().map(str::to_string).collect();
        let total = skills.len();

        let mut cells = Vec::with_capacity(candidates.len());
        let mut gaps = Vec::with_capacity(candidates.len());
        for (id, candidate_skills) in candidates {
            let row: Vec<bool> = skills.iter().map(|s| candidate_skills.contains(s)).collect();
            let matched: Vec<String> = skills
                .iter()
                .zip(&row)
                .filter(|(_, present)| **present)
                .map(|(s, _)| s.clone())
                .collect();
            let missing = jd_skills.difference(candidate_skills);
            let coverage_percentage = if total == 0 {
                0.0
            } else {
                matched.len() as f32 / total as f32 * 100.0
            };
            gaps.push(CandidateGap {
                candidate_id: id.to_string(),
                matched,
                missing,
                coverage_percentage,
            });
            cells.push(row);
        }

        GapAnalysis {
            coverage: CoverageMatrix {
                skills,
                candidates: candidates.iter().map(|(id, _)| id.to_string()).collect(),
                cells,
            },
            gaps,
        }
    }
}

/// Most commonly missing skills among the first `inspect` candidates of `gaps`,
/// most-missed first (ties alphabetical), at most `limit` entries.
pub fn most_missing_skills(gaps: &[CandidateGap], inspect: usize, limit: usize) -> Vec<SkillFrequency> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for gap in gaps.iter().take(inspect) {
        for skill in &gap.missing {
            *counts.entry(skill.as_str()).or_default() += 1;
        }
    }
    let mut ranked: Vec<SkillFrequency> = counts
        .into_iter()
        .map(|(skill, candidates_missing)| SkillFrequency {
            skill: skill.to_string(),
            candidates_missing,
        })
        .collect();
    // BTreeMap order is alphabetical, and the sort is stable.
    ranked.sort_by(|a, b| b.candidates_missing.cmp(&a.candidates_missing));
    ranked.truncate(limit);
    ranked
}

/// Heatmap over the first `max_candidates` matrix rows and `max_skills` columns.
pub fn heatmap(coverage: &CoverageMatrix, max_candidates: usize, max_skills: usize) -> Vec<HeatmapCell> {
    coverage
        .candidates
        .iter()
        .zip(&coverage.cells)
        .take(max_candidates)
        .flat_map(|(candidate, row)| {
            coverage
                .skills
                .iter()
                .zip(row)
                .take(max_skills)
                .map(move |(skill, matched)| HeatmapCell {
                    candidate: candidate.clone(),
                    skill: skill.clone(),
                    matched: *matched,
                })
        })
        .collect()
}
