//! Forward-chaining inference over (subject, predicate, object) triples.
//!
//! A small symbolic engine used two ways: one global instance accumulates
//! facts about agents (fed by the performance scorer), and each in-flight
//! request gets its own instance keyed by that query's responses. The
//! engine is deliberately shallow — a premise constrains only the
//! predicate, and termination is guaranteed by a fixed round cap rather
//! than cycle detection.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// An ordered (subject, predicate, object) triple. Equality is exact
/// triple equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fact {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Fact {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl std::fmt::Display for Fact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.subject, self.predicate, self.object)
    }
}

/// A conclusion field: either bound from the matched fact or a literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    /// Substitute the matched fact's subject.
    Subject,
    /// Substitute the matched fact's object.
    Object,
    /// Use this literal value.
    Lit(String),
}

impl Term {
    fn bind(&self, fact: &Fact) -> String {
        match self {
            Term::Subject => fact.subject.clone(),
            Term::Object => fact.object.clone(),
            Term::Lit(value) => value.clone(),
        }
    }
}

/// A rule: a premise predicate to match, and a conclusion template.
///
/// Only the premise predicate constrains matching; subject and object are
/// unconstrained. This is a deliberate simplification, not an omission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Predicate a knowledge-base fact must carry to fire this rule.
    pub premise: String,
    pub conclusion_subject: Term,
    pub conclusion_predicate: String,
    pub conclusion_object: Term,
}

impl Rule {
    pub fn new(
        premise: impl Into<String>,
        conclusion_subject: Term,
        conclusion_predicate: impl Into<String>,
        conclusion_object: Term,
    ) -> Self {
        Self {
            premise: premise.into(),
            conclusion_subject,
            conclusion_predicate: conclusion_predicate.into(),
            conclusion_object,
        }
    }

    fn instantiate(&self, fact: &Fact) -> Fact {
        Fact {
            subject: self.conclusion_subject.bind(fact),
            predicate: self.conclusion_predicate.clone(),
            object: self.conclusion_object.bind(fact),
        }
    }
}

/// Forward-chaining cap. Rule sets needing more rounds silently stop short;
/// the cap is the sole termination guarantee.
const MAX_ROUNDS: usize = 10;

/// A knowledge base of asserted facts, static rules, and inferred facts.
///
/// Asserted facts keep insertion order; inferred facts have set semantics
/// with no order guarantee. Every assertion and inference appends a
/// human-readable trace entry in chronological order.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    facts: Vec<Fact>,
    fact_set: HashSet<Fact>,
    rules: Vec<Rule>,
    inferred: HashSet<Fact>,
    trace: Vec<String>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert a fact. Idempotent: an exact duplicate triple is ignored.
    pub fn add_fact(&mut self, fact: Fact) {
        if self.fact_set.contains(&fact) {
            return;
        }
        self.trace.push(format!("fact: {fact}"));
        self.fact_set.insert(fact.clone());
        self.facts.push(fact);
    }

    /// Register a rule. Rules are configured once at startup.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Run inference to a fixed point, capped at [`MAX_ROUNDS`] rounds.
    /// Returns the number of newly inferred facts.
    pub fn forward_chain(&mut self) -> usize {
        let mut total_new = 0;
        for round in 0..MAX_ROUNDS {
            let mut derived = Vec::new();
            for rule in &self.rules {
                // Matching scans asserted ∪ inferred so multi-step chains
                // resolve within the round cap.
                for fact in self
                    .facts
                    .iter()
                    .chain(self.inferred.iter())
                    .filter(|f| f.predicate == rule.premise)
                {
                    let conclusion = rule.instantiate(fact);
                    if !self.fact_set.contains(&conclusion) && !self.inferred.contains(&conclusion)
                    {
                        derived.push((conclusion, fact.clone()));
                    }
                }
            }

            let mut new_this_round = 0;
            for (conclusion, from) in derived {
                if self.inferred.insert(conclusion.clone()) {
                    self.trace
                        .push(format!("inferred: {conclusion} from {from}"));
                    new_this_round += 1;
                }
            }

            if new_this_round == 0 {
                debug!(round, total_new, "Forward chaining reached fixed point");
                break;
            }
            total_new += new_this_round;
        }
        total_new
    }

    /// Linear scan over asserted ∪ inferred facts, filtered by whichever of
    /// subject/predicate is supplied. Matches return in scan order.
    pub fn query(&self, subject: Option<&str>, predicate: Option<&str>) -> Vec<&Fact> {
        self.facts
            .iter()
            .chain(self.inferred.iter())
            .filter(|f| subject.is_none_or(|s| f.subject == s))
            .filter(|f| predicate.is_none_or(|p| f.predicate == p))
            .collect()
    }

    /// Chronological record of every assertion and inference.
    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    /// Number of asserted facts (inferred facts excluded).
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Number of inferred facts.
    pub fn inferred_count(&self) -> usize {
        self.inferred.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chained_kb() -> KnowledgeBase {
        let mut kb = KnowledgeBase::new();
        kb.add_rule(Rule::new(
            "has_accuracy",
            Term::Subject,
            "reliability",
            Term::Object,
        ));
        kb.add_rule(Rule::new(
            "reliability",
            Term::Subject,
            "assessed",
            Term::Lit("true".into()),
        ));
        kb.add_fact(Fact::new("DebtSpecialist", "has_accuracy", "high"));
        kb
    }

    #[test]
    fn add_fact_is_idempotent() {
        let mut kb = KnowledgeBase::new();
        kb.add_fact(Fact::new("a", "p", "b"));
        kb.add_fact(Fact::new("a", "p", "b"));
        assert_eq!(kb.fact_count(), 1);
        assert_eq!(kb.trace().len(), 1);
    }

    #[test]
    fn forward_chain_derives_transitively() {
        let mut kb = chained_kb();
        let new = kb.forward_chain();
        // has_accuracy → reliability → assessed, both within one call.
        assert_eq!(new, 2);
        assert_eq!(
            kb.query(Some("DebtSpecialist"), Some("assessed")).len(),
            1
        );
    }

    #[test]
    fn forward_chain_is_idempotent() {
        let mut kb = chained_kb();
        kb.forward_chain();
        let second = kb.forward_chain();
        assert_eq!(second, 0);
        assert_eq!(kb.inferred_count(), 2);
    }

    #[test]
    fn query_filters_by_subject_and_predicate() {
        let mut kb = KnowledgeBase::new();
        kb.add_fact(Fact::new("a", "p", "1"));
        kb.add_fact(Fact::new("a", "q", "2"));
        kb.add_fact(Fact::new("b", "p", "3"));

        assert_eq!(kb.query(Some("a"), None).len(), 2);
        assert_eq!(kb.query(None, Some("p")).len(), 2);
        assert_eq!(kb.query(Some("a"), Some("p")).len(), 1);
        assert_eq!(kb.query(None, None).len(), 3);
    }

    #[test]
    fn deep_rule_chain_stops_at_round_cap() {
        // A 12-deep predicate chain needs 12 rounds; the cap stops it at 10.
        let mut kb = KnowledgeBase::new();
        for depth in 0..12 {
            kb.add_rule(Rule::new(
                format!("p{depth}"),
                Term::Subject,
                format!("p{}", depth + 1),
                Term::Object,
            ));
        }
        kb.add_fact(Fact::new("a", "p0", "b"));

        let new = kb.forward_chain();
        assert_eq!(new, 10);
        assert_eq!(kb.query(Some("a"), Some("p10")).len(), 1);
        assert!(kb.query(Some("a"), Some("p11")).is_empty());
    }

    #[test]
    fn trace_records_assertions_and_inferences_in_order() {
        let mut kb = chained_kb();
        kb.forward_chain();

        let trace = kb.trace();
        assert!(trace[0].starts_with("fact:"));
        assert!(trace.iter().any(|line| line.starts_with("inferred:")));
        // All fact lines precede inference lines in this construction.
        let first_inferred = trace.iter().position(|l| l.starts_with("inferred:")).unwrap();
        assert!(trace[..first_inferred].iter().all(|l| l.starts_with("fact:")));
    }

    #[test]
    fn literal_conclusion_uses_literal_value() {
        let mut kb = KnowledgeBase::new();
        kb.add_rule(Rule::new(
            "trend",
            Term::Subject,
            "trend_observed",
            Term::Lit("yes".into()),
        ));
        kb.add_fact(Fact::new("SavingsGuru", "trend", "improving"));
        kb.forward_chain();

        let matches = kb.query(Some("SavingsGuru"), Some("trend_observed"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].object, "yes");
    }
}
