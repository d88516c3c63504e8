//! Local knowledge base for the Research Assistant.
//!
//! Builds a SQLite-backed passage index from text files and serves it through
//! the [`Retriever`] contract consumed by the answer pipeline.

pub mod chunker;
pub mod config;
pub mod embedding;
pub mod index;
pub mod retriever;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::BaseLayout;
pub use retriever::{Passage, RetrievalError, Retriever, SqliteRetriever, StaticRetriever};
pub use types::{
    BaseStats, KnowledgeBaseConfig, KnowledgeChunk, KnowledgeSource, LearnOptions, LearnStats,
    TextSpan,
};

use assistant_core::{AppError, AppResult, KnowledgeConfig};
use chrono::Utc;
use embedding::TrigramEmbedder;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Learn from files and populate the knowledge base.
///
/// Explicit file paths are always learned; directories contribute only files
/// whose extension is in [`LearnOptions::extensions`]. Files that cannot be
/// read as UTF-8 text are skipped and counted; index failures abort the run
/// and leave the index as it was.
pub fn learn(
    workspace: &Path,
    settings: &KnowledgeConfig,
    options: LearnOptions,
) -> AppResult<LearnStats> {
    let started = Instant::now();
    tracing::info!("Starting learn operation for base '{}'", options.base_name);

    let layout = BaseLayout::new(workspace, &options.base_name);
    // A reset rebuilds the base, so it starts from the workspace settings
    let config = if options.reset {
        KnowledgeBaseConfig::from_settings(layout.name(), settings)
    } else {
        let saved = layout.load_config(settings)?;
        saved.ensure_model_matches()?;
        saved
    };
    let embedder = TrigramEmbedder::new(config.embedding_dim);
    let mut conn = index::init_index(&layout.index_file())?;

    let files = collect_files(&options.paths, &options.extensions);
    tracing::debug!("Found {} candidate files", files.len());

    let tx = conn
        .transaction()
        .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;

    if options.reset {
        tracing::info!("Resetting knowledge base '{}'", layout.name());
        index::reset_index(&tx)?;
    }

    let mut stats = LearnStats::default();
    for file in &files {
        let text = match std::fs::read_to_string(file) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", file, e);
                stats.skipped += 1;
                continue;
            }
        };

        stats.chunks_count += index_file(&tx, &embedder, &config, file, &text)?;
        stats.sources_count += 1;
        stats.bytes_processed += text.len() as u64;
    }

    tx.commit()
        .map_err(|e| AppError::Knowledge(format!("Failed to commit index: {}", e)))?;
    layout.save_config(&config)?;

    stats.duration_secs = started.elapsed().as_secs_f64();
    tracing::info!(
        "Learn operation completed: {} sources, {} chunks, {} bytes in {:.2}s",
        stats.sources_count,
        stats.chunks_count,
        stats.bytes_processed,
        stats.duration_secs
    );

    Ok(stats)
}

/// Expand `paths` into a sorted, de-duplicated file list.
fn collect_files(paths: &[PathBuf], extensions: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            let found = WalkDir::new(path)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        tracing::warn!("Skipping unreadable entry under {:?}: {}", path, e);
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| has_extension(entry.path(), extensions))
                .map(|entry| entry.into_path());
            files.extend(found);
        } else {
            tracing::warn!("Skipping {:?}: not a file or directory", path);
        }
    }

    files.sort();
    files.dedup();
    files
}

/// Store one file as a source plus its embedded chunks.
fn index_file(
    conn: &Connection,
    embedder: &TrigramEmbedder,
    config: &KnowledgeBaseConfig,
    path: &Path,
    text: &str,
) -> AppResult<u32> {
    let source = KnowledgeSource {
        id: uuid::Uuid::new_v4().to_string(),
        path: Some(path.to_path_buf()),
        content_type: path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "text".to_string()),
        learned_at: Utc::now(),
        size_bytes: text.len() as u64,
    };
    index::insert_source(conn, &source)?;

    let candidates = chunker::chunk_text(text, config.chunk_size, config.chunk_overlap);
    let count = candidates.len() as u32;

    for candidate in candidates {
        let chunk = KnowledgeChunk {
            id: uuid::Uuid::new_v4().to_string(),
            source_id: source.id.clone(),
            position: candidate.position,
            embedding: Some(embedder.embed(&candidate.text)),
            text: candidate.text,
            span: candidate.span,
        };
        index::insert_chunk(conn, &chunk)?;
    }

    tracing::debug!("Indexed {:?}: {} chunks", path, count);
    Ok(count)
}

/// Case-insensitive extension match; a leading dot in `extensions` is ignored.
fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension() else {
        return false;
    };
    let ext = ext.to_string_lossy();
    extensions
        .iter()
        .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(&ext))
}

fn require_index(layout: &BaseLayout) -> AppResult<PathBuf> {
    if layout.has_index() {
        Ok(layout.index_file())
    } else {
        Err(AppError::Knowledge(format!(
            "Knowledge base '{}' does not exist",
            layout.name()
        )))
    }
}

/// Delete every source and chunk of a knowledge base, keeping its settings.
pub fn clean(workspace: &Path, base_name: &str) -> AppResult<()> {
    tracing::info!("Cleaning knowledge base '{}'", base_name);

    let index_path = require_index(&BaseLayout::new(workspace, base_name))?;
    let conn = index::init_index(&index_path)?;
    index::reset_index(&conn)?;

    Ok(())
}

/// Size and freshness of a knowledge base.
pub fn stats(workspace: &Path, base_name: &str) -> AppResult<BaseStats> {
    tracing::debug!("Getting stats for knowledge base '{}'", base_name);

    let index_path = require_index(&BaseLayout::new(workspace, base_name))?;
    let conn = index::open_read_only(&index_path)?;
    let (sources_count, chunks_count) = index::get_stats(&conn)?;
    let last_learn_at = index::last_learned_at(&conn)?;
    let db_size_bytes = std::fs::metadata(&index_path)?.len();

    Ok(BaseStats {
        base_name: base_name.to_string(),
        sources_count,
        chunks_count,
        db_size_bytes,
        last_learn_at,
    })
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_has_extension() {
        let exts = vec!["txt".to_string(), ".MD".to_string()];
        assert!(has_extension(Path::new("a/b.txt"), &exts));
        assert!(has_extension(Path::new("a/b.TXT"), &exts));
        assert!(has_extension(Path::new("notes.md"), &exts));
        assert!(!has_extension(Path::new("image.png"), &exts));
        assert!(!has_extension(Path::new("README"), &exts));
    }

    #[test]
    fn test_learn_refuses_other_model_unless_reset() {
        let temp = TempDir::new().unwrap();
        let doc = temp.path().join("doc.txt");
        std::fs::write(&doc, "Retrieval augmented generation grounds answers.").unwrap();

        let layout = BaseLayout::new(temp.path(), "docs");
        layout
            .save_config(&KnowledgeBaseConfig {
                embedding_model: "legacy-model".to_string(),
                ..KnowledgeBaseConfig::from_settings("docs", &KnowledgeConfig::default())
            })
            .unwrap();

        let options = |reset| LearnOptions {
            base_name: "docs".to_string(),
            paths: vec![doc.clone()],
            extensions: vec!["txt".to_string()],
            reset,
        };

        let settings = KnowledgeConfig::default();
        assert!(learn(temp.path(), &settings, options(false)).is_err());

        let learned = learn(temp.path(), &settings, options(true)).unwrap();
        assert_eq!(learned.sources_count, 1);
        let saved = layout.load_config(&settings).unwrap();
        assert_eq!(saved.embedding_model, embedding::MODEL_NAME);
    }

    #[test]
    fn test_collect_files_dedups_and_sorts() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.txt"), "b").unwrap();
        std::fs::write(temp.path().join("a.txt"), "a").unwrap();
        std::fs::write(temp.path().join("c.log"), "c").unwrap();

        let files = collect_files(
            &[temp.path().to_path_buf(), temp.path().join("a.txt")],
            &["txt".to_string()],
        );
        let names: Vec<String> = files
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }
}
