//! SQLite storage for sources, chunks and their embeddings.
//!
//! Embeddings are stored as little-endian `f32` blobs and scored in process;
//! a knowledge base is small enough that a full scan per query is fine.

use crate::embedding::cosine_similarity;
use crate::types::{KnowledgeChunk, KnowledgeSource, TextSpan};
use assistant_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id TEXT PRIMARY KEY,
    path TEXT,
    content_type TEXT NOT NULL,
    learned_at TEXT NOT NULL,
    size_bytes INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL REFERENCES sources(id),
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    span_start INTEGER NOT NULL,
    span_end INTEGER NOT NULL,
    embedding BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id);
"#;

/// A chunk with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: KnowledgeChunk,
    pub score: f32,
}

fn db_err(context: &'static str) -> impl Fn(rusqlite::Error) -> AppError {
    move |e| AppError::Knowledge(format!("{}: {}", context, e))
}

/// Open the index for writing, creating the file and tables if needed.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(db_path).map_err(db_err("Failed to open SQLite index"))?;
    conn.execute_batch(SCHEMA)
        .map_err(db_err("Failed to create tables"))?;

    tracing::debug!("Opened SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Open an existing index for reading only.
///
/// Each caller gets its own connection, so concurrent lookups never share
/// a handle.
pub fn open_read_only(db_path: &Path) -> AppResult<Connection> {
    Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(db_err("Failed to open SQLite index read-only"))
}

pub fn insert_source(conn: &Connection, source: &KnowledgeSource) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO sources (id, path, content_type, learned_at, size_bytes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            source.id,
            source.path.as_ref().map(|p| p.to_string_lossy().into_owned()),
            source.content_type,
            source.learned_at.to_rfc3339(),
            source.size_bytes as i64,
        ],
    )
    .map_err(db_err("Failed to insert source"))?;

    Ok(())
}

/// Store an embedded chunk. Chunks without an embedding are rejected.
pub fn insert_chunk(conn: &Connection, chunk: &KnowledgeChunk) -> AppResult<()> {
    let Some(embedding) = chunk.embedding.as_deref() else {
        return Err(AppError::Knowledge(format!(
            "Chunk {} has no embedding",
            chunk.id
        )));
    };

    conn.execute(
        "INSERT OR REPLACE INTO chunks (id, source_id, position, text, span_start, span_end, embedding)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            chunk.id,
            chunk.source_id,
            chunk.position as i64,
            chunk.text,
            chunk.span.start as i64,
            chunk.span.end as i64,
            encode_embedding(embedding),
        ],
    )
    .map_err(db_err("Failed to insert chunk"))?;

    Ok(())
}

/// Score every chunk against `query_embedding` and keep the best `top_k`.
///
/// Results are ordered by descending cosine similarity; equal scores keep
/// insertion order.
pub fn query_chunks(
    conn: &Connection,
    query_embedding: &[f32],
    top_k: usize,
) -> AppResult<Vec<ScoredChunk>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, source_id, position, text, span_start, span_end, embedding
             FROM chunks ORDER BY rowid",
        )
        .map_err(db_err("Failed to prepare chunk scan"))?;

    let rows = stmt
        .query_map([], read_chunk_row)
        .map_err(db_err("Failed to scan chunks"))?;

    let mut scored = Vec::new();
    for row in rows {
        let (chunk, blob) = row.map_err(db_err("Failed to read chunk row"))?;
        let embedding = decode_embedding(&blob)?;
        let score = cosine_similarity(query_embedding, &embedding);
        scored.push(ScoredChunk {
            chunk: KnowledgeChunk {
                embedding: Some(embedding),
                ..chunk
            },
            score,
        });
    }

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_k);

    tracing::debug!("Scored chunks, keeping {} (top-{})", scored.len(), top_k);
    Ok(scored)
}

fn read_chunk_row(row: &Row<'_>) -> rusqlite::Result<(KnowledgeChunk, Vec<u8>)> {
    let chunk = KnowledgeChunk {
        id: row.get(0)?,
        source_id: row.get(1)?,
        position: row.get::<_, i64>(2)? as u32,
        text: row.get(3)?,
        span: TextSpan {
            start: row.get::<_, i64>(4)? as usize,
            end: row.get::<_, i64>(5)? as usize,
        },
        embedding: None,
    };
    Ok((chunk, row.get(6)?))
}

/// `(sources, chunks)` row counts.
pub fn get_stats(conn: &Connection) -> AppResult<(u32, u32)> {
    Ok((count_rows(conn, "sources")?, count_rows(conn, "chunks")?))
}

fn count_rows(conn: &Connection, table: &str) -> AppResult<u32> {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get::<_, i64>(0)
    })
    .map(|n| n as u32)
    .map_err(|e| AppError::Knowledge(format!("Failed to count {}: {}", table, e)))
}

/// Most recent `learned_at` across all sources.
pub fn last_learned_at(conn: &Connection) -> AppResult<Option<DateTime<Utc>>> {
    let raw: Option<String> = conn
        .query_row("SELECT MAX(learned_at) FROM sources", [], |row| row.get(0))
        .optional()
        .map_err(db_err("Failed to read learn time"))?
        .flatten();

    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AppError::Knowledge(format!("Invalid learn timestamp {:?}: {}", s, e)))
    })
    .transpose()
}

/// Delete all chunks and sources.
pub fn reset_index(conn: &Connection) -> AppResult<()> {
    conn.execute_batch("DELETE FROM chunks; DELETE FROM sources;")
        .map_err(db_err("Failed to reset index"))?;

    tracing::info!("Reset knowledge base index");
    Ok(())
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(format!(
            "Embedding blob of {} bytes is not a whole number of f32s",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
