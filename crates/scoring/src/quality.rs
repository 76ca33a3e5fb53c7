//! Deterministic response-quality heuristic.
//!
//! No model in the loop: quality is scored from surface features that
//! correlate with useful advice — enough text to say something, concrete
//! action verbs, numeric specifics, and visible structure. The same input
//! always scores the same, which keeps profile updates reproducible.

/// Verbs that signal actionable advice.
const ACTION_WORDS: &[&str] = &[
    "should", "consider", "recommend", "start", "pay", "save", "invest", "reduce",
    "build", "avoid", "focus", "allocate", "track", "review",
];

/// Score a response text in [0, 1].
///
/// Base 0.5 plus bounded bonuses for length, action-word density, numeric
/// specifics, and structure.
pub fn score_response_quality(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut score = 0.5;

    // Length: full credit around 1,500 chars of substance.
    score += 0.15 * (text.len() as f64 / 1500.0).min(1.0);

    // Action-word density: full credit at 5+ distinct action words.
    let action_hits = ACTION_WORDS
        .iter()
        .filter(|word| lower.contains(*word))
        .count();
    score += 0.15 * (action_hits as f64 / 5.0).min(1.0);

    // Numeric specifics: dollar figures, percentages, concrete counts.
    if text.chars().any(|c| c.is_ascii_digit()) {
        score += 0.10;
    }

    // Structure: bullets, numbered steps, or multi-line layout.
    let structured = text.lines().count() > 3
        || text.contains("• ")
        || text.contains("- ")
        || text.lines().any(|l| {
            let t = l.trim_start();
            t.len() > 2 && t.as_bytes()[0].is_ascii_digit() && t.as_bytes()[1] == b'.'
        });
    if structured {
        score += 0.10;
    }

    score.min(1.0)
}
