//! Passage retrieval contract and its implementations.
//!
//! The answer pipeline only ever sees [`Retriever`]. [`SqliteRetriever`] reads
//! a knowledge base built by [`crate::learn`]; [`StaticRetriever`] serves a
//! fixed in-memory passage list.

use crate::config::BaseLayout;
use crate::embedding::TrigramEmbedder;
use crate::index;
use assistant_core::{AppError, AppResult, KnowledgeConfig};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A retrieved excerpt of source text.
pub type Passage = String;

/// Failure of a retrieval call.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The knowledge base has never been learned
    #[error("knowledge base '{0}' has no index; run `assistant knowledge learn` first")]
    IndexMissing(String),

    /// The index exists but could not be read
    #[error("index lookup failed: {0}")]
    Index(String),
}

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        AppError::Knowledge(err.to_string())
    }
}

/// Source of candidate passages for a query.
///
/// Implementations must tolerate concurrent `retrieve` calls.
pub trait Retriever: Send + Sync {
    /// Return up to `k` passages, most relevant first.
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError>;
}

/// Retriever over a local SQLite knowledge base.
#[derive(Debug, Clone)]
pub struct SqliteRetriever {
    base_name: String,
    index_path: PathBuf,
    embedder: TrigramEmbedder,
}

impl SqliteRetriever {
    /// Create a retriever for `base_name` in `workspace`.
    ///
    /// The index does not have to exist yet; a missing index is reported by
    /// `retrieve` so that callers can surface it per query.
    pub fn new(workspace: &Path, base_name: &str, defaults: &KnowledgeConfig) -> AppResult<Self> {
        let layout = BaseLayout::new(workspace, base_name);
        let base_config = layout.load_config(defaults)?;
        base_config.ensure_model_matches()?;

        Ok(Self {
            base_name: base_name.to_string(),
            index_path: layout.index_file(),
            embedder: TrigramEmbedder::new(base_config.embedding_dim),
        })
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }
}

impl Retriever for SqliteRetriever {
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError> {
        if !self.index_path.exists() {
            return Err(RetrievalError::IndexMissing(self.base_name.clone()));
        }

        let conn = index::open_read_only(&self.index_path)
            .map_err(|e| RetrievalError::Index(e.to_string()))?;

        let query_embedding = self.embedder.embed(query);
        let results = index::query_chunks(&conn, &query_embedding, k)
            .map_err(|e| RetrievalError::Index(e.to_string()))?;

        if let (Some(first), Some(last)) = (results.first(), results.last()) {
            tracing::debug!(
                "Retrieved {} passages from '{}' (top score: {:.3}, lowest: {:.3})",
                results.len(),
                self.base_name,
                first.score,
                last.score
            );
        }

        Ok(results.into_iter().map(|scored| scored.chunk.text).collect())
    }
}

/// Retriever over a fixed list of passages.
///
/// Passages are ranked by the number of distinct lowercased words they share
/// with the query; ties keep their original order.
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever {
    passages: Vec<Passage>,
}

impl StaticRetriever {
    pub fn new<I, S>(passages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Passage>,
    {
        Self {
            passages: passages.into_iter().map(Into::into).collect(),
        }
    }
}

impl Retriever for StaticRetriever {
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError> {
        let query_lower = query.to_lowercase();
        let query_terms: HashSet<&str> = query_lower.split_whitespace().collect();

        let mut scored: Vec<(usize, &Passage)> = self
            .passages
            .iter()
            .map(|passage| {
                let lower = passage.to_lowercase();
                let shared = lower
                    .split_whitespace()
                    .collect::<HashSet<_>>()
                    .intersection(&query_terms)
                    .count();
                (shared, passage)
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, passage)| passage.clone())
            .collect())
    }
}
