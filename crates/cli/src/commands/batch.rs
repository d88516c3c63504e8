//! Batch command handler.
//!
//! Answers many questions concurrently with one shared orchestrator.

use super::{build_orchestrator, record_results};
use assistant_agent::PipelineResult;
use assistant_core::{config::AppConfig, AppError, AppResult};
use clap::Args;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::PathBuf;
use std::sync::Arc;

/// Answer one question per line of a file
#[derive(Args, Debug)]
pub struct BatchCommand {
    /// File with one query per line (blank lines are skipped)
    pub file: PathBuf,

    /// Number of queries processed at once
    #[arg(long, default_value = "4")]
    pub concurrency: usize,

    /// Maximum maker-checker rounds
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Knowledge base to answer from
    #[arg(short, long)]
    pub base: Option<String>,

    /// Do not record the queries in the ledger
    #[arg(long)]
    pub no_record: bool,
}

impl BatchCommand {
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        tracing::info!("Executing batch command for {:?}", self.file);

        let config = config.with_overrides(None, false, false, None, self.max_iterations);
        config.validate()?;

        let contents = std::fs::read_to_string(&self.file)?;
        let queries: Vec<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        let base = self
            .base
            .clone()
            .unwrap_or_else(|| config.pipeline.knowledge_base.clone());
        let orchestrator = Arc::new(build_orchestrator(&config, &base)?);
        let max_iterations = orchestrator.max_iterations();

        tracing::info!(
            "Processing {} queries with concurrency {}",
            queries.len(),
            self.concurrency.max(1)
        );

        // `buffered` yields results in input order
        let results: Vec<PipelineResult> = stream::iter(queries)
            .map(|query| {
                let orchestrator = Arc::clone(&orchestrator);
                tokio::task::spawn_blocking(move || orchestrator.process(&query, max_iterations))
            })
            .buffered(self.concurrency.max(1))
            .map_err(|e| AppError::Pipeline(format!("Query task failed: {}", e)))
            .try_collect()
            .await?;

        for result in &results {
            println!("{}", serde_json::to_string(result)?);
        }

        if !self.no_record {
            record_results(&config.ledger_path(), &results);
        }

        let approved = results.iter().filter(|r| r.approved).count();
        tracing::info!("Batch finished: {}/{} approved", approved, results.len());

        Ok(())
    }
}
