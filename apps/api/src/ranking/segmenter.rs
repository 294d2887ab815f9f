//! Text segmentation: splits a raw document into a full view and a skill view.
//!
//! The skill view is every section opened by a skill/requirement heading, each
//! running to the next section boundary. Without such a heading it falls back to
//! the leading `skill_view_chars` characters, so it is only empty for empty input.

use crate::ranking::models::{Document, SkillViewSource};

pub const DEFAULT_SKILL_VIEW_CHARS: usize = 1500;

pub const DEFAULT_SKILL_HEADINGS: &[&str] = &[
    "skills",
    "skill set",
    "technical skills",
    "core competencies",
    "technologies",
    "tech stack",
    "requirements",
    "qualifications",
    "required",
    "must have",
    "preferred",
    "nice to have",
];

/// Headings that close a skill section.
const SECTION_VOCABULARY: &[&str] = &[
    "experience",
    "work experience",
    "professional experience",
    "work history",
    "employment",
    "education",
    "projects",
    "summary",
    "professional summary",
    "profile",
    "objective",
    "certifications",
    "awards",
    "publications",
    "interests",
    "references",
    "responsibilities",
    "what you will do",
    "about",
    "benefits",
    "perks",
    "compensation",
    "contact",
];

const MAX_HEADING_WORDS: usize = 6;
const MAX_SHOUTED_HEADING_WORDS: usize = 3;
/// Acronyms (`SQL`, `HTML`) are shorter than this.
const MIN_HEADING_WORD_LEN: usize = 5;

#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    pub skill_headings: Vec<String>,
    pub skill_view_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            skill_headings: DEFAULT_SKILL_HEADINGS.iter().map(|h| h.to_string()).collect(),
            skill_view_chars: DEFAULT_SKILL_VIEW_CHARS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextSegmenter {
    skill_headings: Vec<String>,
    skill_view_chars: usize,
}

/// How a single line participates in sectioning.
#[derive(Debug, PartialEq)]
enum LineKind<'a> {
    /// Opens a skill section; `inline` is text after `Heading:` on the same line.
    SkillHeading { inline: Option<&'a str> },
    /// Any other recognised heading. Closes an open skill section.
    Boundary,
    Body,
}

impl TextSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        let skill_headings = config
            .skill_headings
            .iter()
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        Self {
            skill_headings,
            skill_view_chars: config.skill_view_chars.max(1),
        }
    }

    pub fn segment(&self, id: &str, raw_text: &str) -> Document {
        let full_view = normalize_full_view(raw_text);

        let (skill_view, skill_view_source) = if full_view.is_empty() {
            (String::new(), SkillViewSource::Empty)
        } else {
            match self.skill_sections(&full_view) {
                Some(section) => (section, SkillViewSource::Section),
                None => (
                    truncate_chars(&full_view, self.skill_view_chars).trim_end().to_string(),
                    SkillViewSource::LeadingWindow,
                ),
            }
        };

        Document {
            id: id.to_string(),
            raw_text: raw_text.to_string(),
            full_view,
            skill_view,
            skill_view_source,
        }
    }

    /// Concatenated skill sections, or `None` when no heading yields content.
    fn skill_sections(&self, text: &str) -> Option<String> {
        let mut collected: Vec<&str> = Vec::new();
        let mut in_section = false;

        for line in text.lines() {
            match self.classify(line) {
                LineKind::SkillHeading { inline } => {
                    in_section = true;
                    if let Some(rest) = inline.map(str::trim).filter(|r| !r.is_empty()) {
                        collected.push(rest);
                    }
                }
                LineKind::Boundary => in_section = false,
                LineKind::Body => {
                    let trimmed = line.trim();
                    if in_section && !trimmed.is_empty() {
                        collected.push(trimmed);
                    }
                }
            }
        }

        if collected.is_empty() {
            None
        } else {
            Some(collected.join("\n"))
        }
    }

    fn classify<'a>(&self, line: &'a str) -> LineKind<'a> {
        let stripped = line
            .trim()
            .trim_start_matches(|c: char| matches!(c, '#' | '*' | '-' | '•' | '=' | '_'))
            .trim();
        if stripped.is_empty() {
            return LineKind::Body;
        }
        let is_markdown = line.trim_start().starts_with('#');

        let (name, inline) = match stripped.split_once(':') {
            Some((head, rest)) => (head.trim(), Some(rest)),
            None => (stripped, None),
        };
        let word_count = name.split_whitespace().count();
        if word_count == 0 || word_count > MAX_HEADING_WORDS {
            return LineKind::Body;
        }
        let normalized = name
            .trim_end_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();

        if self.is_skill_heading(&normalized) {
            // A bare short line only counts when it is styled as a heading or is
            // exactly a configured heading; "Python, SQL" must stay body text.
            let bare_ok = is_markdown
                || is_shouting(name)
                || self.skill_headings.iter().any(|h| *h == normalized);
            if inline.is_some() || bare_ok {
                return LineKind::SkillHeading {
                    inline: inline.filter(|r| !r.trim().is_empty()),
                };
            }
            return LineKind::Body;
        }

        // "Experience" closes a section; "Experience with Docker" is a bullet.
        let exact = SECTION_VOCABULARY.iter().any(|v| normalized == *v);
        let prefixed = SECTION_VOCABULARY
            .iter()
            .any(|v| normalized.starts_with(&format!("{v} ")));
        let bare_heading = inline.map_or(false, |r| r.trim().is_empty());
        if (exact && inline.is_none()) || ((exact || prefixed) && bare_heading) {
            return LineKind::Boundary;
        }
        if inline.is_none() && (is_markdown || (is_shouting(name) && reads_as_heading(name))) {
            return LineKind::Boundary;
        }
        LineKind::Body
    }

    fn is_skill_heading(&self, normalized: &str) -> bool {
        self.skill_headings.iter().any(|h| normalized.contains(h.as_str()))
    }
}

impl Default for TextSegmenter {
    fn default() -> Self {
        Self::new(SegmenterConfig::default())
    }
}

/// Unifies line endings and trims outer whitespace.
fn normalize_full_view(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}

/// All-caps heading such as `TECHNICAL SKILLS` or `EXPERIENCE`.
fn is_shouting(text: &str) -> bool {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
}

/// Unknown all-caps headings are short and have no list punctuation. Capitalised
/// skill lists such as `SQL, AWS, GCP` or `HTML CSS` are body text.
fn reads_as_heading(name: &str) -> bool {
    if name.contains(|c: char| matches!(c, ',' | '/' | '|' | '+' | '&' | ';' | '.')) {
        return false;
    }
    let words: Vec<&str> = name.split_whitespace().collect();
    words.len() <= MAX_SHOUTED_HEADING_WORDS
        && words
            .iter()
            .any(|w| w.chars().filter(|c| c.is_alphabetic()).count() >= MIN_HEADING_WORD_LEN)
}

/// Prefix of `text` holding at most `max_chars` characters, never splitting a char.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
