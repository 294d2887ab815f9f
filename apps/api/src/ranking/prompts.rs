use crate::llm_client::prompts::EVIDENCE_ONLY_INSTRUCTION;
use crate::ranking::models::ScoreBreakdown;

pub const FIT_SUMMARY_SYSTEM: &str = "You are an experienced technical recruiter. \
    You write short, neutral assessments of how well a candidate fits a role. \
    Respond with plain prose only: no headings, no lists, no markdown.";

const FIT_SUMMARY_TEMPLATE: &str = "\
Write a 2-3 sentence summary explaining why this candidate does or does not fit the role. \
Mention concrete strengths and the most important gaps.

{evidence_instruction}

## Job description
{jd_text}

## Evidence from the resume
{snippets}

## Scores (0 to 1)
overall: {final_score}
full-document similarity: {full_doc_similarity}
skill-section similarity: {skill_section_similarity}
skill match rate: {skill_match_rate}";

pub fn build_fit_summary_prompt(
    jd_text: &str,
    snippets: &[String],
    breakdown: &ScoreBreakdown,
) -> String {
    let evidence = if snippets.is_empty() {
        "(no evidence extracted)".to_string()
    } else {
        snippets
            .iter()
            .map(|s| format!("- {s}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    FIT_SUMMARY_TEMPLATE
        .replace("{evidence_instruction}", EVIDENCE_ONLY_INSTRUCTION)
        .replace("{final_score}", &format!("{:.3}", breakdown.final_score))
        .replace(
            "{full_doc_similarity}",
            &format!("{:.3}", breakdown.full_doc_similarity),
        )
        .replace(
            "{skill_section_similarity}",
            &format!("{:.3}", breakdown.skill_section_similarity),
        )
        .replace(
            "{skill_match_rate}",
            &format!("{:.3}", breakdown.skill_match_rate),
        )
        .replace("{snippets}", &evidence)
        // last: user text may itself contain placeholder-looking braces
        .replace("{jd_text}", jd_text)
}
