//! Maker-checker answer pipeline.
//!
//! One call to [`PipelineOrchestrator::process`] walks a query through input
//! validation, retrieval, document filtering, the bounded
//! generate/check/refine loop and output sanitization. Every failure mode is
//! folded into the returned [`PipelineResult`]; nothing propagates to the
//! caller.

use crate::checker::{AnswerChecker, HeuristicChecker};
use crate::maker::{AnswerMaker, ExtractiveMaker};
use crate::refiner::{AnswerRefiner, AppendRefiner};
use crate::safety::SafetyValidator;
use crate::types::{IterationRecord, PipelineOutcome, PipelineResult, Query};
use assistant_core::{AppConfig, PipelineConfig};
use assistant_knowledge::{Passage, Retriever};
use std::net::IpAddr;
use std::sync::Arc;

const NO_DOCUMENTS_MESSAGE: &str =
    "No relevant documents found in the knowledge base for this query.";
const FALLBACK_ANSWER: &str = "Unable to generate answer.";

/// Drives one query from raw text to a sanitized, reviewed answer.
///
/// Holds no per-query state, so a single instance can serve concurrent
/// callers behind an `Arc`.
pub struct PipelineOrchestrator {
    validator: SafetyValidator,
    retriever: Arc<dyn Retriever>,
    maker: Box<dyn AnswerMaker>,
    checker: Box<dyn AnswerChecker>,
    refiner: Box<dyn AnswerRefiner>,
    top_k: usize,
    max_iterations: usize,
}

impl PipelineOrchestrator {
    /// Orchestrator with default components and policies.
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        let defaults = PipelineConfig::default();
        Self {
            validator: SafetyValidator::default(),
            retriever,
            maker: Box::new(ExtractiveMaker),
            checker: Box::new(HeuristicChecker::default()),
            refiner: Box::new(AppendRefiner),
            top_k: defaults.top_k,
            max_iterations: defaults.max_iterations,
        }
    }

    /// Orchestrator whose policies come from the application config.
    pub fn from_config(retriever: Arc<dyn Retriever>, config: &AppConfig) -> Self {
        Self::new(retriever)
            .with_safety(SafetyValidator::new(config.safety.clone()))
            .with_checker(HeuristicChecker::new(config.review.clone()))
            .with_top_k(config.pipeline.top_k)
            .with_max_iterations(config.pipeline.max_iterations)
    }

    pub fn with_safety(mut self, validator: SafetyValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_maker(mut self, maker: impl AnswerMaker + 'static) -> Self {
        self.maker = Box::new(maker);
        self
    }

    pub fn with_checker(mut self, checker: impl AnswerChecker + 'static) -> Self {
        self.checker = Box::new(checker);
        self
    }

    pub fn with_refiner(mut self, refiner: impl AnswerRefiner + 'static) -> Self {
        self.refiner = Box::new(refiner);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Round limit used when the caller does not pass one.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer `text` with at most `max_iterations` maker-checker rounds.
    pub fn process(&self, text: &str, max_iterations: usize) -> PipelineResult {
        self.process_from(text, None, max_iterations)
    }

    /// Like [`process`](Self::process), tagging the query with the client address.
    pub fn process_from(
        &self,
        text: &str,
        origin: Option<IpAddr>,
        max_iterations: usize,
    ) -> PipelineResult {
        let span = tracing::info_span!("pipeline", max_iterations);
        let _guard = span.enter();

        let verdict = self.validator.validate_input(text);
        let query = Query {
            text: text.to_string(),
            origin,
            is_safe: verdict.is_safe,
            safety_issues: verdict.issues,
        };

        if !query.is_safe {
            let issues: Vec<String> = query.safety_issues.iter().map(|i| i.to_string()).collect();
            tracing::warn!("Query rejected: {}", issues.join("; "));
            let message = format!("Query blocked by safety validation: {}", issues.join("; "));
            return PipelineResult::early_exit(query, PipelineOutcome::Rejected, message);
        }

        let passages = match self.retriever.retrieve(text, self.top_k) {
            Ok(docs) => self.validator.validate_retrieved_docs(docs),
            Err(e) => {
                tracing::warn!("Retrieval failed: {}", e);
                let message = format!("Error retrieving documents: {}", e);
                return PipelineResult::early_exit(query, PipelineOutcome::RetrievalFailed, message);
            }
        };

        if passages.is_empty() {
            tracing::info!("No usable passages for query");
            return PipelineResult::early_exit(
                query,
                PipelineOutcome::NoDocuments,
                NO_DOCUMENTS_MESSAGE.to_string(),
            );
        }

        let iterations = self.review_loop(text, &passages, max_iterations);

        let approved = iterations.last().is_some_and(|r| r.approved);
        let outcome = match iterations.last() {
            None => PipelineOutcome::NoAnswer,
            Some(record) if record.approved => PipelineOutcome::Approved,
            Some(_) => PipelineOutcome::Exhausted,
        };

        let final_answer = match iterations.last() {
            Some(record) => self.validator.sanitize_output(&record.answer),
            None => FALLBACK_ANSWER.to_string(),
        };

        match outcome {
            PipelineOutcome::Approved => {
                tracing::info!("Answer approved after {} round(s)", iterations.len())
            }
            _ => tracing::warn!(
                "No approved answer after {} round(s); returning best effort",
                iterations.len()
            ),
        }

        PipelineResult {
            query,
            iterations,
            final_answer,
            approved,
            outcome,
            passages_used: passages.len(),
        }
    }

    /// Run generate, then check/refine until approval or the round limit.
    fn review_loop(
        &self,
        query: &str,
        passages: &[Passage],
        max_iterations: usize,
    ) -> Vec<IterationRecord> {
        let mut iterations: Vec<IterationRecord> = Vec::new();
        if max_iterations == 0 {
            return iterations;
        }

        let mut candidate = match self.maker.generate(query, passages) {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Answer generation failed: {}", e);
                return iterations;
            }
        };

        loop {
            let review = self.checker.review(query, passages, &candidate);
            let round = iterations.len() + 1;
            tracing::debug!(round, approved = review.approved, "Checked candidate");

            iterations.push(IterationRecord {
                iteration: round,
                answer: candidate,
                feedback: review.feedback,
                approved: review.approved,
            });

            if review.approved || iterations.len() >= max_iterations {
                break;
            }

            let Some(last) = iterations.last() else {
                break;
            };
            candidate = self
                .refiner
                .refine(query, passages, &last.answer, &last.feedback);
        }

        iterations
    }
}
