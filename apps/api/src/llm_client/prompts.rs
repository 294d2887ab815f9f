// Cross-cutting prompt fragments. Each service that calls the LLM keeps its
// own prompts.rs alongside it.

/// Appended to every prompt that summarises a candidate.
pub const EVIDENCE_ONLY_INSTRUCTION: &str = "\
    CRITICAL: Base every statement on the job description, the evidence lines and the \
    scores given below. Do NOT infer employers, dates, degrees or skills that do not \
    appear in the evidence. If the evidence is thin, say so instead of guessing.";
