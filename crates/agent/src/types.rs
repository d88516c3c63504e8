//! Query, iteration trace and pipeline result types.

use crate::safety::SafetyIssue;
use serde::Serialize;
use std::net::IpAddr;

/// An incoming question together with its safety evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct Query {
    /// Raw query text as received
    pub text: String,

    /// Client address, kept for the audit trail only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<IpAddr>,

    /// Whether the query passed input validation
    pub is_safe: bool,

    /// Every issue input validation raised
    pub safety_issues: Vec<SafetyIssue>,
}

/// One maker/checker round.
#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    /// 1-based round number
    pub iteration: usize,

    /// Candidate answer reviewed in this round
    #[serde(rename = "maker_answer")]
    pub answer: String,

    /// Checker's structured report
    #[serde(rename = "checker_feedback")]
    pub feedback: String,

    /// Checker's verdict
    pub approved: bool,
}

/// How a query left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Input validation refused the query
    Rejected,
    /// Retrieval returned nothing usable after filtering
    NoDocuments,
    /// The retriever failed
    RetrievalFailed,
    /// No candidate answer was produced
    NoAnswer,
    /// The last round was approved
    Approved,
    /// The round limit was reached without approval
    Exhausted,
}

/// The complete answer to one query.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub query: Query,

    /// Rounds in execution order
    pub iterations: Vec<IterationRecord>,

    /// Sanitized answer, or an explanation when no answer was produced
    pub final_answer: String,

    /// True iff the last round was approved
    pub approved: bool,

    pub outcome: PipelineOutcome,

    /// Passages that survived document filtering
    pub passages_used: usize,
}

impl PipelineResult {
    /// Result that carries no iterations, only an explanatory answer.
    pub(crate) fn early_exit(query: Query, outcome: PipelineOutcome, message: String) -> Self {
        Self {
            query,
            iterations: Vec::new(),
            final_answer: message,
            approved: false,
            outcome,
            passages_used: 0,
        }
    }

    pub fn is_safe(&self) -> bool {
        self.query.is_safe
    }

    pub fn safety_issues(&self) -> &[SafetyIssue] {
        &self.query.safety_issues
    }

    pub fn last_iteration(&self) -> Option<&IterationRecord> {
        self.iterations.last()
    }
}
