//! JD cleaning: drops paragraphs that carry no skill signal (company blurb,
//! benefits, pay, legal boilerplate) before a job description is segmented.

use std::sync::OnceLock;

use regex::Regex;

/// Any paragraph mentioning one of these is kept unconditionally.
const KEEP_ANCHORS: &[&str] = &[
    "responsibilities",
    "qualifications",
    "requirements",
    "required",
    "skills",
    "must have",
    "nice to have",
    "preferred",
    "you will",
    "what you'll do",
    "experience with",
];

/// Paragraphs mentioning these (and no keep anchor) are dropped.
const DROP_MARKERS: &[&str] = &[
    "about the company",
    "about us",
    "who we are",
    "our mission",
    "our values",
    "benefits",
    "perks",
    "insurance",
    "401(k)",
    "paid time off",
    "parental leave",
    "wellness",
    "salary",
    "compensation",
    "pay range",
    "base pay",
    "equity package",
    "relocation",
    "equal opportunity",
    "diversity",
    "inclusion",
    "non-discrimination",
    "we do not discriminate",
    "background check",
    "fair chance",
    "pursuant to",
    "accommodation",
];

const MIN_KEPT_WORDS: usize = 11;
const MAX_KEPT_WORDS: usize = 119;

fn paragraph_split() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("valid paragraph regex"))
}

/// Returns the kept paragraphs joined by blank lines.
pub fn clean_job_description(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    paragraph_split()
        .split(&normalized)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter(|p| keep_paragraph(p))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn keep_paragraph(paragraph: &str) -> bool {
    let lower = paragraph.to_lowercase();
    if KEEP_ANCHORS.iter().any(|k| lower.contains(k)) {
        return true;
    }
    if DROP_MARKERS.iter().any(|d| lower.contains(d)) {
        return false;
    }
    let words = paragraph.split_whitespace().count();
    (MIN_KEPT_WORDS..=MAX_KEPT_WORDS).contains(&words)
}
