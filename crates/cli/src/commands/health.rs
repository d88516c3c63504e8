//! Health command handler.

use assistant_core::{config::AppConfig, AppResult};
use clap::Args;

/// Report service health
#[derive(Args, Debug)]
pub struct HealthCommand {
    /// Knowledge base to check (default: pipeline.knowledgeBase)
    #[arg(short, long)]
    pub base: Option<String>,
}

impl HealthCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing health command");

        let base = self
            .base
            .clone()
            .unwrap_or_else(|| config.pipeline.knowledge_base.clone());

        let agent = match assistant_knowledge::stats(&config.workspace, &base) {
            Ok(stats) if stats.chunks_count > 0 => "initialized",
            Ok(_) => "empty knowledge base",
            Err(e) => {
                tracing::debug!("Knowledge base unavailable: {}", e);
                "not initialized"
            }
        };

        let output = serde_json::json!({
            "status": "healthy",
            "agent": agent,
            "knowledgeBase": base,
            "version": env!("CARGO_PKG_VERSION"),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);

        Ok(())
    }
}
