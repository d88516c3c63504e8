//! Ask command handler.
//!
//! Runs one question through the answer pipeline, prints the answer and
//! then records it.

use super::{build_orchestrator, record_results};
use assistant_agent::PipelineResult;
use assistant_core::{config::AppConfig, AppResult};
use clap::Args;
use std::net::IpAddr;

/// Ask a question against the knowledge base
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Maximum maker-checker rounds
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Number of passages to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Knowledge base to answer from
    #[arg(short, long)]
    pub base: Option<String>,

    /// Client address recorded with the query
    #[arg(long)]
    pub origin: Option<IpAddr>,

    /// Output the full result as JSON
    #[arg(long)]
    pub json: bool,

    /// Do not record the query in the ledger
    #[arg(long)]
    pub no_record: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let config = config.with_overrides(None, false, false, self.top_k, self.max_iterations);
        config.validate()?;

        let base = self
            .base
            .clone()
            .unwrap_or_else(|| config.pipeline.knowledge_base.clone());
        let orchestrator = build_orchestrator(&config, &base)?;

        let result =
            orchestrator.process_from(&self.query, self.origin, orchestrator.max_iterations());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_result(&result);
        }

        if !self.no_record {
            record_results(&config.ledger_path(), std::slice::from_ref(&result));
        }

        Ok(())
    }
}

fn print_result(result: &PipelineResult) {
    println!("{}", result.final_answer);
    println!();

    let status = if result.approved {
        "approved"
    } else {
        "not approved"
    };
    println!(
        "[{} after {} round(s), {} passage(s) used]",
        status,
        result.iterations.len(),
        result.passages_used
    );
}
