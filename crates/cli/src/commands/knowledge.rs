//! Knowledge command handler.
//!
//! Builds, inspects and empties the local knowledge bases that `ask` and
//! `batch` answer from.

use assistant_core::{config::AppConfig, AppResult};
use assistant_knowledge::{BaseStats, LearnOptions, LearnStats};
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Knowledge base management
#[derive(Args, Debug)]
pub struct KnowledgeCommand {
    /// Knowledge base name (default: pipeline.knowledgeBase)
    #[arg(short, long, global = true)]
    pub base: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Index text files and directories
    Learn {
        /// Files or directories to learn from
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Extensions picked up inside directories (default: knowledge.extensions)
        #[arg(long = "ext")]
        extensions: Vec<String>,

        /// Drop existing content first
        #[arg(long)]
        reset: bool,
    },

    /// Show size and freshness
    Stats,

    /// Delete all sources and chunks
    Clean,
}

impl KnowledgeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let base = self
            .base
            .clone()
            .unwrap_or_else(|| config.pipeline.knowledge_base.clone());
        tracing::info!("Executing knowledge command for base '{}'", base);

        match &self.action {
            KnowledgeAction::Learn {
                paths,
                extensions,
                reset,
            } => {
                let options = LearnOptions {
                    base_name: base.clone(),
                    paths: paths.clone(),
                    extensions: if extensions.is_empty() {
                        config.knowledge.extensions.clone()
                    } else {
                        extensions.clone()
                    },
                    reset: *reset,
                };
                let learned =
                    assistant_knowledge::learn(&config.workspace, &config.knowledge, options)?;
                self.report_learn(&base, &learned)
            }
            KnowledgeAction::Stats => {
                let stats = assistant_knowledge::stats(&config.workspace, &base)?;
                self.report_stats(&stats)
            }
            KnowledgeAction::Clean => {
                assistant_knowledge::clean(&config.workspace, &base)?;
                if self.json {
                    println!("{}", serde_json::json!({ "base": base, "cleaned": true }));
                } else {
                    println!("Knowledge base '{}' cleaned", base);
                }
                Ok(())
            }
        }
    }

    fn report_learn(&self, base: &str, learned: &LearnStats) -> AppResult<()> {
        if self.json {
            let mut output = serde_json::to_value(learned)?;
            output["base"] = serde_json::Value::from(base);
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!(
            "Learned {} sources into '{}': {} chunks from {} bytes in {:.2}s",
            learned.sources_count,
            base,
            learned.chunks_count,
            learned.bytes_processed,
            learned.duration_secs
        );
        if learned.skipped > 0 {
            println!("Skipped {} unreadable file(s)", learned.skipped);
        }
        Ok(())
    }

    fn report_stats(&self, stats: &BaseStats) -> AppResult<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(stats)?);
            return Ok(());
        }

        let last = stats
            .last_learn_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{}: {} sources, {} chunks, {} bytes on disk, last learned {}",
            stats.base_name, stats.sources_count, stats.chunks_count, stats.db_size_bytes, last
        );
        Ok(())
    }
}
