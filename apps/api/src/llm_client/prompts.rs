// Cross-cutting prompt fragments.
// Each module that calls the LLM keeps its own prompts.rs alongside it.

/// Substituted for `{truthfulness_instruction}` in every prompt that rewrites resume text.
pub const TRUTHFULNESS_INSTRUCTION: &str = "\
    CRITICAL: Do NOT invent employers, titles, dates, metrics or skills. \
    Only reword, reorder and emphasise what the resume already states.";
