//! Response synthesis — one human-facing answer from many agent answers.
//!
//! Read-only aggregation: consensus detection over cue groups, a top
//! recommendation, deduplicated action steps, and a per-agent rating line.
//! Nothing here mutates request state or the stores.

use crate::request::CollectedResponse;
use quorum_core::query::QueryAnalysis;
use quorum_scoring::profile::PerformanceTrend;
use std::collections::HashSet;

/// Fallback text when the deadline passes with zero collected responses.
pub const NO_RESPONSE_MESSAGE: &str = "I'm sorry — none of our advisors were able to respond \
in time. Please try again in a moment.";

/// Consensus share of responding agents above which the group's canned
/// advice wins over the single best response.
const CONSENSUS_THRESHOLD: f64 = 0.65;

/// Maximum reasoning-trace lines surfaced to the user.
const MAX_TRACE_LINES: usize = 3;

/// Maximum deduplicated action-step bullets.
const MAX_ACTION_STEPS: usize = 4;

/// Cue groups for consensus detection: (label, cues, consensus advice).
const CONSENSUS_GROUPS: &[(&str, &[&str], &str)] = &[
    (
        "debt payoff",
        &["debt", "pay off", "payoff", "interest", "snowball", "avalanche"],
        "Most advisors agree: pay down the highest-interest debt first while \
         keeping minimum payments current everywhere else.",
    ),
    (
        "emergency fund",
        &["emergency fund", "rainy day", "safety net", "set aside"],
        "Most advisors agree: build an emergency fund covering three to six \
         months of expenses before taking on new financial goals.",
    ),
    (
        "budgeting",
        &["budget", "50/30/20", "track", "spending plan"],
        "Most advisors agree: start from a written budget and track actual \
         spending against it every month.",
    ),
];

/// Words that mark a sentence as actionable when extracting steps.
const ACTION_CUES: &[&str] = &[
    "should", "consider", "start", "pay", "save", "build", "avoid", "track",
    "review", "allocate", "reduce", "focus",
];

/// Scorer-side context for one responding agent, rendered as a rating line.
#[derive(Debug, Clone)]
pub struct AgentRating {
    pub name: String,
    pub specialty: String,
    pub overall: f64,
    pub trend: PerformanceTrend,
    pub elapsed_secs: f64,
}

/// Build the final answer. `responses` must be sorted descending by
/// `final_score`; `trace` is the per-request reasoning trace.
pub fn synthesize(
    analysis: &QueryAnalysis,
    responses: &[CollectedResponse],
    trace: &[String],
    ratings: &[AgentRating],
) -> String {
    if responses.is_empty() {
        return NO_RESPONSE_MESSAGE.to_string();
    }

    let mut out = String::new();
    out.push_str(&format!(
        "I consulted {} advisor{} about your question.\n\n",
        responses.len(),
        if responses.len() == 1 { "" } else { "s" }
    ));

    if !trace.is_empty() {
        out.push_str("How I routed this:\n");
        for line in trace.iter().take(MAX_TRACE_LINES) {
            out.push_str(&format!("  - {line}\n"));
        }
        out.push('\n');
    }

    out.push_str(&format!("Focus area: {}", analysis.primary));
    if analysis.urgency >= 0.5 {
        out.push_str(" (urgent)");
    }
    out.push_str("\n\n");

    out.push_str("Top recommendation:\n");
    out.push_str(&format!("  {}\n\n", top_recommendation(responses)));

    let steps = extract_action_steps(responses);
    if !steps.is_empty() {
        out.push_str("Action steps:\n");
        for step in steps {
            out.push_str(&format!("  • {step}\n"));
        }
        out.push('\n');
    }

    out.push_str("Advisors consulted:\n");
    for rating in ratings {
        out.push_str(&format!(
            "  {} {} ({}) {} {:.1}s\n",
            stars(rating.overall),
            rating.name,
            rating.specialty,
            trend_glyph(rating.trend),
            rating.elapsed_secs,
        ));
    }

    out
}

/// Consensus advice when a cue group is backed by enough distinct agents,
/// otherwise the best response's key sentence.
fn top_recommendation(responses: &[CollectedResponse]) -> String {
    if let Some((_, advice, strength)) = consensus(responses) {
        if strength > CONSENSUS_THRESHOLD {
            return advice.to_string();
        }
    }
    // `responses` is sorted by final_score, so the first is the best.
    key_sentence(&responses[0].text)
}

/// The cue group with the most distinct supporting agents, with its
/// strength = supporters / responders. `None` when nothing matched.
fn consensus(responses: &[CollectedResponse]) -> Option<(&'static str, &'static str, f64)> {
    let mut best: Option<(&str, &str, usize)> = None;
    for (label, cues, advice) in CONSENSUS_GROUPS {
        let supporters = responses
            .iter()
            .filter(|r| {
                let lower = r.text.to_lowercase();
                cues.iter().any(|cue| lower.contains(cue))
            })
            .count();
        if supporters > 0 && best.is_none_or(|(_, _, n)| supporters > n) {
            best = Some((label, advice, supporters));
        }
    }
    best.map(|(label, advice, n)| (label, advice, n as f64 / responses.len() as f64))
}

/// First actionable sentence of a response, falling back to its first
/// non-empty line.
fn key_sentence(text: &str) -> String {
    let sentences = text
        .split(['.', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty());
    for sentence in sentences {
        let lower = sentence.to_lowercase();
        if sentence.len() >= 25 && ACTION_CUES.iter().any(|cue| lower.contains(cue)) {
            return clip(sentence);
        }
    }
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(clip)
        .unwrap_or_default()
}

fn clip(s: &str) -> String {
    if s.len() <= 200 {
        s.to_string()
    } else {
        let mut end = 200;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}

/// Bullet-like or actionable lines across all responses, deduplicated
/// case-insensitively, best responses first.
fn extract_action_steps(responses: &[CollectedResponse]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut steps = Vec::new();

    for response in responses {
        for line in response.text.lines() {
            let trimmed = line.trim();
            let stripped = strip_bullet(trimmed);
            let was_bullet = stripped.len() != trimmed.len();
            if stripped.len() < 10 || stripped.len() > 160 {
                continue;
            }
            let lower = stripped.to_lowercase();
            if !was_bullet && !ACTION_CUES.iter().any(|cue| lower.contains(cue)) {
                continue;
            }
            if seen.insert(lower) {
                steps.push(stripped.to_string());
                if steps.len() == MAX_ACTION_STEPS {
                    return steps;
                }
            }
        }
    }
    steps
}

/// Drop a leading `-`, `•`, `*`, or `1.`-style marker.
fn strip_bullet(line: &str) -> &str {
    let rest = line.trim_start_matches(['-', '•', '*']).trim_start();
    if rest.len() != line.len() {
        return rest;
    }
    let bytes = line.as_bytes();
    if bytes.len() > 2 && bytes[0].is_ascii_digit() && (bytes[1] == b'.' || bytes[1] == b')') {
        return line[2..].trim_start();
    }
    line
}

/// Five-star rating from an overall score in [0, 1].
fn stars(overall: f64) -> String {
    let filled = (overall * 5.0).round().clamp(0.0, 5.0) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

fn trend_glyph(trend: PerformanceTrend) -> &'static str {
    match trend {
        PerformanceTrend::Improving => "↑",
        PerformanceTrend::Stable => "→",
        PerformanceTrend::Declining => "↓",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_core::query::analyze_query;

    fn response(name: &str, text: &str, final_score: f64) -> CollectedResponse {
        CollectedResponse {
            agent_id: name.to_lowercase(),
            agent_name: name.into(),
            specialty: "debt".into(),
            text: text.into(),
            elapsed_secs: 3.2,
            quality: 0.8,
            speed: 0.9,
            relevance: 1.0,
            final_score,
        }
    }

    fn rating(name: &str, overall: f64, trend: PerformanceTrend) -> AgentRating {
        AgentRating {
            name: name.into(),
            specialty: "debt".into(),
            overall,
            trend,
            elapsed_secs: 3.2,
        }
    }

    #[test]
    fn empty_responses_yield_apology() {
        let analysis = analyze_query("help");
        assert_eq!(synthesize(&analysis, &[], &[], &[]), NO_RESPONSE_MESSAGE);
    }

    #[test]
    fn unanimous_debt_mentions_win_consensus() {
        let analysis = analyze_query("I have credit card debt");
        let responses = vec![
            response("A", "You should pay off the highest-interest debt first.", 0.9),
            response("B", "Attack the debt with the avalanche method and pay extra.", 0.8),
        ];
        let (label, _, strength) = consensus(&responses).unwrap();
        assert_eq!(label, "debt payoff");
        assert_eq!(strength, 1.0);

        let text = synthesize(&analysis, &responses, &[], &[]);
        assert!(text.contains("highest-interest debt"));
    }

    #[test]
    fn weak_consensus_falls_back_to_best_response() {
        let analysis = analyze_query("money question");
        let responses = vec![
            response("A", "You should consider a written monthly spending review.", 0.9),
            response("B", "The weather is nice today.", 0.5),
            response("C", "No opinion on this one.", 0.4),
        ];
        // No response hits a cue group, so the best response's key
        // sentence wins.
        let text = synthesize(&analysis, &responses, &[], &[]);
        assert!(text.contains("written monthly spending review"));
    }

    #[test]
    fn trace_lines_capped_at_three() {
        let analysis = analyze_query("debt");
        let responses = vec![response("A", "Pay off your debt.", 0.9)];
        let trace: Vec<String> = (0..6).map(|i| format!("line {i}")).collect();
        let text = synthesize(&analysis, &responses, &trace, &[]);
        assert!(text.contains("line 2"));
        assert!(!text.contains("line 3"));
    }

    #[test]
    fn urgency_flag_appears_above_half() {
        let analysis = analyze_query("urgent emergency debt help right now");
        assert!(analysis.urgency >= 0.5);
        let responses = vec![response("A", "Pay the debt down.", 0.9)];
        let text = synthesize(&analysis, &responses, &[], &[]);
        assert!(text.contains("(urgent)"));
    }

    #[test]
    fn action_steps_deduplicated_and_capped() {
        let analysis = analyze_query("debt");
        let shared = "1. List every balance and APR\n2. Pay minimums everywhere first\n\
                      3. Put extra toward the highest rate";
        let responses = vec![
            response("A", shared, 0.9),
            response(
                "B",
                "1. List every balance and APR\nYou should also avoid new charges entirely.\n\
                 Review your progress monthly with a checklist.",
                0.8,
            ),
        ];
        let steps = extract_action_steps(&responses);
        assert_eq!(steps.len(), 4);
        assert!(steps.iter().any(|s| s.contains("avoid new charges")));
        assert_eq!(
            steps
                .iter()
                .filter(|s| s.contains("List every balance"))
                .count(),
            1
        );
    }

    #[test]
    fn rating_line_carries_stars_and_glyph() {
        let analysis = analyze_query("debt");
        let responses = vec![response("A", "Pay off the debt.", 0.9)];
        let ratings = vec![rating("A", 0.82, PerformanceTrend::Improving)];
        let text = synthesize(&analysis, &responses, &[], &ratings);
        assert!(text.contains("★★★★☆ A (debt) ↑ 3.2s"));
    }
}
