//! Maker-checker answer pipeline with safety gating.
//!
//! [`PipelineOrchestrator`] validates a query, retrieves passages through an
//! [`assistant_knowledge::Retriever`], drafts an answer with an
//! [`AnswerMaker`], reviews it with an [`AnswerChecker`], revises it with an
//! [`AnswerRefiner`] and sanitizes whatever comes out. [`Ledger`] keeps the
//! audit trail.

pub mod checker;
pub mod ledger;
pub mod maker;
pub mod pipeline;
pub mod refiner;
pub mod safety;
pub mod types;

pub use checker::{AnswerChecker, HeuristicChecker, Review};
pub use ledger::{Ledger, LedgerEntry};
pub use maker::{AnswerMaker, ExtractiveMaker};
pub use pipeline::PipelineOrchestrator;
pub use refiner::{AnswerRefiner, AppendRefiner};
pub use safety::{InjectionKind, SafetyIssue, SafetyValidator, SafetyVerdict, UnsafeKind};
pub use types::{IterationRecord, PipelineOutcome, PipelineResult, Query};
