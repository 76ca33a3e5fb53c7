//! Query analysis — keyword-driven intent classification.
//!
//! Classifies a raw user query into weighted categories, extracts currency
//! amounts, and derives an urgency signal. Deliberately simple: counting
//! case-insensitive keyword hits is enough to route a query to the right
//! specialist pool, and it never fails — garbage input degrades to the
//! `"general"` classification.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Categories in declaration order. The order is the documented tie-break
/// when two categories score the same weight.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "debt",
        &[
            "debt", "loan", "credit card", "owe", "payoff", "pay off", "interest",
            "consolidat", "mortgage", "apr",
        ],
    ),
    (
        "savings",
        &[
            "save", "saving", "emergency fund", "rainy day", "deposit", "nest egg",
        ],
    ),
    (
        "budgeting",
        &[
            "budget", "spending", "expense", "track", "income", "50/30/20", "envelope",
        ],
    ),
    (
        "investing",
        &[
            "invest", "stock", "bond", "etf", "portfolio", "market", "dividend",
        ],
    ),
    (
        "retirement",
        &["retire", "401k", "ira", "pension", "social security"],
    ),
    (
        "insurance",
        &["insurance", "insure", "premium", "coverage", "policy"],
    ),
];

const URGENCY_KEYWORDS: &[&str] = &[
    "urgent", "asap", "immediately", "emergency", "right now", "quickly", "crisis",
];

/// The result of analyzing a raw query. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnalysis {
    /// The raw query text.
    pub text: String,
    /// Category → normalized weight; weights sum to 1 over matched categories.
    pub intents: HashMap<String, f64>,
    /// The dominant category, or `"general"` when nothing matched.
    pub primary: String,
    /// Number of matched categories.
    pub complexity: usize,
    /// Urgency signal in [0, 1].
    pub urgency: f64,
    /// Currency-like amounts found in the text, commas stripped.
    pub amounts: Vec<f64>,
}

/// Analyze a raw query string. Never errors.
pub fn analyze_query(text: &str) -> QueryAnalysis {
    let lower = text.to_lowercase();

    let mut counts: Vec<(&str, usize)> = Vec::new();
    for (category, keywords) in CATEGORIES {
        let hits: usize = keywords.iter().map(|kw| lower.matches(kw).count()).sum();
        if hits > 0 {
            counts.push((category, hits));
        }
    }

    let total: usize = counts.iter().map(|(_, c)| c).sum();
    let mut intents = HashMap::new();
    let mut primary = "general".to_string();
    let mut best = 0usize;
    for (category, hits) in &counts {
        intents.insert((*category).to_string(), *hits as f64 / total as f64);
        // Strict > keeps the earliest-declared category on ties.
        if *hits > best {
            best = *hits;
            primary = (*category).to_string();
        }
    }

    let urgency_hits = URGENCY_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .count();

    QueryAnalysis {
        text: text.to_string(),
        complexity: counts.len(),
        intents,
        primary,
        urgency: (0.4 * urgency_hits as f64).min(1.0),
        amounts: extract_amounts(text),
    }
}

/// Extract currency-like numbers from free text. A number may carry a
/// leading `$`, thousands commas, and a decimal part. Malformed fragments
/// are skipped, never raised.
fn extract_amounts(text: &str) -> Vec<f64> {
    let mut amounts = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len()
                && (bytes[i].is_ascii_digit() || bytes[i] == b',' || bytes[i] == b'.')
            {
                i += 1;
            }
            let raw: String = text[start..i].chars().filter(|c| *c != ',').collect();
            // Trailing dot (end of sentence) is not part of the number.
            let raw = raw.trim_end_matches('.');
            if let Ok(value) = raw.parse::<f64>() {
                amounts.push(value);
            }
        } else {
            i += 1;
        }
    }
    amounts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_sum_to_one_when_non_empty() {
        let q = analyze_query("I want to pay off my credit card debt and start saving");
        assert!(!q.intents.is_empty());
        let sum: f64 = q.intents.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_intents_iff_general() {
        let q = analyze_query("hello there, how are you?");
        assert!(q.intents.is_empty());
        assert_eq!(q.primary, "general");
        assert_eq!(q.complexity, 0);

        let q = analyze_query("");
        assert_eq!(q.primary, "general");
    }

    #[test]
    fn debt_query_classifies_as_debt() {
        let q = analyze_query("I have $15,000 in credit card debt and want to pay it off");
        assert_eq!(q.primary, "debt");
        assert!(q.intents["debt"] > 0.5);
    }

    #[test]
    fn amounts_parsed_with_commas_stripped() {
        let q = analyze_query("I owe $15,000 and another 2,500.50 to the bank.");
        assert_eq!(q.amounts, vec![15000.0, 2500.50]);
    }

    #[test]
    fn amount_at_sentence_end_drops_trailing_dot() {
        let q = analyze_query("My debt is 300.");
        assert_eq!(q.amounts, vec![300.0]);
    }

    #[test]
    fn urgency_scales_with_keyword_hits() {
        let calm = analyze_query("how should I budget my income?");
        assert_eq!(calm.urgency, 0.0);

        let urgent = analyze_query("urgent: I need an emergency fund immediately");
        assert!(urgent.urgency >= 0.8);
        assert!(urgent.urgency <= 1.0);
    }

    #[test]
    fn urgency_caps_at_one() {
        let q = analyze_query("urgent asap immediately emergency crisis quickly");
        assert_eq!(q.urgency, 1.0);
    }

    #[test]
    fn complexity_counts_matched_categories() {
        let q = analyze_query("budget my spending, invest in stocks, and save for retirement");
        assert!(q.complexity >= 3);
    }
}
