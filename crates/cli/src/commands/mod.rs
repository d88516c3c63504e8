//! Command handlers for the Research Assistant CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod batch;
pub mod health;
pub mod history;
pub mod knowledge;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use batch::BatchCommand;
pub use health::HealthCommand;
pub use history::HistoryCommand;
pub use knowledge::KnowledgeCommand;

use assistant_agent::{Ledger, PipelineOrchestrator, PipelineResult};
use assistant_core::{config::AppConfig, AppResult};
use assistant_knowledge::SqliteRetriever;
use std::path::Path;
use std::sync::Arc;

/// Wire an orchestrator to the SQLite knowledge base named `base`.
pub(crate) fn build_orchestrator(config: &AppConfig, base: &str) -> AppResult<PipelineOrchestrator> {
    let retriever = SqliteRetriever::new(&config.workspace, base, &config.knowledge)?;
    tracing::debug!("Using knowledge base '{}'", retriever.base_name());
    Ok(PipelineOrchestrator::from_config(Arc::new(retriever), config))
}

/// Record `results` in the ledger at `path`, returning how many were stored.
///
/// Answers are already printed by the time this runs; ledger failures are
/// logged and never fail the command.
pub(crate) fn record_results(path: &Path, results: &[PipelineResult]) -> usize {
    let mut ledger = match Ledger::open(path) {
        Ok(ledger) => ledger,
        Err(e) => {
            tracing::warn!("Not recording {} result(s): {}", results.len(), e);
            return 0;
        }
    };

    let mut recorded = 0;
    for result in results {
        match ledger.record(result) {
            Ok(id) => {
                tracing::debug!("Recorded as query {}", id);
                recorded += 1;
            }
            Err(e) => tracing::warn!("Failed to record query: {}", e),
        }
    }
    recorded
}
