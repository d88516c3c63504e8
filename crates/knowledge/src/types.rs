//! Records stored in and reported by a knowledge base.

use assistant_core::{AppError, AppResult, KnowledgeConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings a knowledge base was built with, persisted next to its index.
///
/// Retrieval must embed queries exactly the way chunks were embedded, so the
/// saved file wins over whatever the workspace config says later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KnowledgeBaseConfig {
    pub name: String,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl KnowledgeBaseConfig {
    /// Fresh settings for `name` taken from the workspace knowledge section.
    pub fn from_settings(name: &str, settings: &KnowledgeConfig) -> Self {
        Self {
            name: name.to_string(),
            embedding_model: crate::embedding::MODEL_NAME.to_string(),
            embedding_dim: settings.embedding_dim,
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        }
    }

    /// Fail unless the base was embedded by the model this build ships.
    pub fn ensure_model_matches(&self) -> AppResult<()> {
        if self.embedding_model != crate::embedding::MODEL_NAME {
            return Err(AppError::Knowledge(format!(
                "Knowledge base '{}' was built with embedding model '{}', expected '{}'; relearn it with --reset",
                self.name,
                self.embedding_model,
                crate::embedding::MODEL_NAME
            )));
        }
        Ok(())
    }
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self::from_settings("", &KnowledgeConfig::default())
    }
}

/// A file that was learned.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeSource {
    pub id: String,
    pub path: Option<PathBuf>,
    /// Lowercased file extension, or `text`
    pub content_type: String,
    pub learned_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Byte range a chunk covers in its source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

/// An indexed passage.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeChunk {
    pub id: String,
    pub source_id: String,
    /// Order within the source, from 0
    pub position: u32,
    pub text: String,
    pub span: TextSpan,
    /// Unit-length trigram embedding; `None` until embedded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// A chunk cut from source text, before it is embedded.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub position: u32,
    pub text: String,
    pub span: TextSpan,
}

/// What to learn and where to put it.
#[derive(Debug, Clone)]
pub struct LearnOptions {
    pub base_name: String,

    /// Files or directories; directories are walked recursively
    pub paths: Vec<PathBuf>,

    /// Extensions to pick up inside directories, without the dot
    pub extensions: Vec<String>,

    /// Drop existing sources and chunks first
    pub reset: bool,
}

/// Summary of one learn run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LearnStats {
    pub sources_count: u32,
    pub chunks_count: u32,
    pub bytes_processed: u64,
    /// Files that could not be read as UTF-8 text
    pub skipped: u32,
    pub duration_secs: f64,
}

/// Size and freshness of a knowledge base.
#[derive(Debug, Clone, Serialize)]
pub struct BaseStats {
    pub base_name: String,
    pub sources_count: u32,
    pub chunks_count: u32,
    pub db_size_bytes: u64,
    /// Most recent `learned_at` across sources
    pub last_learn_at: Option<DateTime<Utc>>,
}
