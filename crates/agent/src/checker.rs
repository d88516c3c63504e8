//! Candidate answer review.

use assistant_core::ReviewConfig;
use assistant_knowledge::Passage;
use std::collections::HashSet;

const REMEDIATION_HINT: &str = "Add more context from documents";

/// Checker's verdict on one candidate answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    /// True iff `issues` is empty
    pub approved: bool,
    pub issues: Vec<String>,
    /// Three-line report: APPROVED, ISSUES, SUGGESTIONS
    pub feedback: String,
}

impl Review {
    /// Build a review from the issues found; approval follows from there being none.
    pub fn from_issues(issues: Vec<String>) -> Self {
        let approved = issues.is_empty();
        let feedback = format!(
            "APPROVED: {}\nISSUES: {}\nSUGGESTIONS: {}",
            if approved { "YES" } else { "NO" },
            if approved {
                "None".to_string()
            } else {
                issues.join(", ")
            },
            if approved { "None" } else { REMEDIATION_HINT },
        );

        Self {
            approved,
            issues,
            feedback,
        }
    }
}

/// Reviews candidate answers against a quality bar.
pub trait AnswerChecker: Send + Sync {
    fn review(&self, query: &str, passages: &[Passage], answer: &str) -> Review;
}

/// Length, citation and topical-overlap heuristics.
///
/// This is a placeholder quality bar rather than a semantic check; swap in
/// another [`AnswerChecker`] for anything stricter.
#[derive(Debug, Clone, Default)]
pub struct HeuristicChecker {
    policy: ReviewConfig,
}

impl HeuristicChecker {
    pub fn new(policy: ReviewConfig) -> Self {
        Self { policy }
    }
}

impl AnswerChecker for HeuristicChecker {
    fn review(&self, query: &str, _passages: &[Passage], answer: &str) -> Review {
        let mut issues = Vec::new();

        if answer.chars().count() < self.policy.min_answer_chars {
            issues.push("Answer is too short".to_string());
        }

        if !answer.contains(self.policy.citation_marker.as_str()) {
            issues.push("Sources not properly referenced".to_string());
        }

        let query_lower = query.to_lowercase();
        let answer_lower = answer.to_lowercase();
        let query_words: HashSet<&str> = query_lower.split_whitespace().collect();
        let answer_words: HashSet<&str> = answer_lower.split_whitespace().collect();
        let shared = query_words.intersection(&answer_words).count();
        if shared < self.policy.min_shared_terms {
            issues.push("Answer may not fully address the query".to_string());
        }

        let review = Review::from_issues(issues);
        tracing::debug!(
            approved = review.approved,
            shared_terms = shared,
            "Reviewed candidate answer"
        );
        review
    }
}
