//! SQLite audit trail of processed queries.

use crate::types::PipelineResult;
use assistant_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;

const PREVIEW_CHARS: usize = 100;

/// One row of the ledger listing.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    /// Query text, shortened for display
    pub preview: String,
    pub origin: Option<String>,
    pub is_safe: bool,
    pub safety_issues: String,
    /// `None` when the query never reached a maker-checker round
    pub is_approved: Option<bool>,
    pub iteration_count: Option<usize>,
    pub created_at: DateTime<Utc>,
}

/// Persistent record of queries and their answers.
pub struct Ledger {
    conn: Connection,
}

impl Ledger {
    /// Open (or create) the ledger database at `path`.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Ledger(format!("Failed to create ledger directory: {}", e)))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Ledger(format!("Failed to open ledger: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS queries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                origin TEXT,
                is_safe INTEGER NOT NULL,
                safety_issues TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS responses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query_id INTEGER NOT NULL,
                maker_response TEXT NOT NULL,
                checker_feedback TEXT NOT NULL,
                final_response TEXT NOT NULL,
                is_approved INTEGER NOT NULL,
                iteration_count INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (query_id) REFERENCES queries(id)
            );

            CREATE INDEX IF NOT EXISTS idx_responses_query ON responses(query_id);
            "#,
        )
        .map_err(|e| AppError::Ledger(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Opened ledger at {:?}", path);
        Ok(Self { conn })
    }

    /// Store a result and return the new query id.
    ///
    /// A response row is written only when at least one round ran.
    pub fn record(&mut self, result: &PipelineResult) -> AppResult<i64> {
        let now = Utc::now().to_rfc3339();
        let issues = result
            .safety_issues()
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("; ");

        let tx = self
            .conn
            .transaction()
            .map_err(|e| AppError::Ledger(format!("Failed to start transaction: {}", e)))?;

        tx.execute(
            "INSERT INTO queries (text, origin, is_safe, safety_issues, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                result.query.text,
                result.query.origin.map(|ip| ip.to_string()),
                result.is_safe(),
                issues,
                now,
            ],
        )
        .map_err(|e| AppError::Ledger(format!("Failed to insert query: {}", e)))?;
        let query_id = tx.last_insert_rowid();

        if let (Some(first), Some(last)) = (result.iterations.first(), result.iterations.last()) {
            tx.execute(
                "INSERT INTO responses (query_id, maker_response, checker_feedback, final_response,
                                        is_approved, iteration_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    query_id,
                    first.answer,
                    last.feedback,
                    result.final_answer,
                    result.approved,
                    result.iterations.len() as i64,
                    now,
                ],
            )
            .map_err(|e| AppError::Ledger(format!("Failed to insert response: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| AppError::Ledger(format!("Failed to commit: {}", e)))?;

        tracing::debug!("Recorded query {} in ledger", query_id);
        Ok(query_id)
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> AppResult<Vec<LedgerEntry>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT q.id, q.text, q.origin, q.is_safe, q.safety_issues, q.created_at,
                        r.is_approved, r.iteration_count
                 FROM queries q
                 LEFT JOIN responses r ON r.query_id = q.id
                 ORDER BY q.id DESC
                 LIMIT ?1",
            )
            .map_err(|e| AppError::Ledger(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<bool>>(6)?,
                    row.get::<_, Option<i64>>(7)?,
                ))
            })
            .map_err(|e| AppError::Ledger(format!("Failed to read ledger: {}", e)))?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, text, origin, is_safe, safety_issues, created_at, is_approved, count) =
                row.map_err(|e| AppError::Ledger(format!("Failed to read row: {}", e)))?;

            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| AppError::Ledger(format!("Invalid timestamp: {}", e)))?
                .with_timezone(&Utc);

            entries.push(LedgerEntry {
                id,
                preview: preview(&text),
                origin,
                is_safe,
                safety_issues,
                is_approved,
                iteration_count: count.map(|c| c as usize),
                created_at,
            });
        }

        Ok(entries)
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
