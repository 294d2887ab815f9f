//! CSV flattening of a ranking.

use serde::Serialize;
use thiserror::Error;

use crate::ranking::models::RankingResult;

pub const MISSING_SKILLS_DELIMITER: &str = "; ";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer error: {0}")]
    Buffer(String),
}

/// One exported row. Scores are rendered with four decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvRow {
    pub rank: usize,
    pub candidate_id: String,
    pub final_score: String,
    pub full_doc_similarity: String,
    pub skill_section_similarity: String,
    pub skill_match_rate: String,
    pub missing_skills: String,
}

pub fn csv_rows(ranking: &RankingResult) -> Vec<CsvRow> {
    ranking
        .entries
        .iter()
        .map(|entry| CsvRow {
            rank: entry.rank,
            candidate_id: entry.id().to_string(),
            final_score: format!("{:.4}", entry.breakdown.final_score),
            full_doc_similarity: format!("{:.4}", entry.breakdown.full_doc_similarity),
            skill_section_similarity: format!("{:.4}", entry.breakdown.skill_section_similarity),
            skill_match_rate: format!("{:.4}", entry.breakdown.skill_match_rate),
            missing_skills: entry.missing_skills.join(MISSING_SKILLS_DELIMITER),
        })
        .collect()
}

/// Whole ranking (not only the shortlist) as CSV with a header row.
pub fn to_csv(ranking: &RankingResult) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());
    for row in csv_rows(ranking) {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Buffer(e.to_string()))
}
