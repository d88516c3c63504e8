//! History command handler.
//!
//! Lists recorded queries from the ledger, newest first.

use assistant_agent::Ledger;
use assistant_core::{config::AppConfig, AppResult};
use clap::Args;

/// Show recorded queries and their outcomes
#[derive(Args, Debug)]
pub struct HistoryCommand {
    /// Number of entries to show
    #[arg(short = 'n', long, default_value = "100")]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl HistoryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing history command");

        let ledger = Ledger::open(&config.ledger_path())?;
        let entries = ledger.recent(self.limit)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        if entries.is_empty() {
            println!("No queries recorded yet");
            return Ok(());
        }

        for entry in &entries {
            let verdict = match (entry.is_safe, entry.is_approved) {
                (false, _) => "blocked".to_string(),
                (true, None) => "no answer".to_string(),
                (true, Some(approved)) => format!(
                    "{} in {} round(s)",
                    if approved { "approved" } else { "not approved" },
                    entry.iteration_count.unwrap_or(0)
                ),
            };

            println!(
                "#{} {} [{}] {}",
                entry.id,
                entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                verdict,
                entry.preview
            );
            if !entry.is_safe {
                println!("    {}", entry.safety_issues);
            }
        }

        Ok(())
    }
}
