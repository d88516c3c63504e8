//! On-disk layout of a knowledge base and its persisted settings.
//!
//! Every base lives in `<workspace>/.assistant/knowledge/<name>/` and holds a
//! `config.yaml` plus the `index.sqlite` database.

use crate::types::KnowledgeBaseConfig;
use assistant_core::{AppError, AppResult, KnowledgeConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// Paths belonging to one named knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseLayout {
    name: String,
    dir: PathBuf,
}

impl BaseLayout {
    pub fn new(workspace: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            dir: workspace.join(".assistant").join("knowledge").join(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.dir.join("config.yaml")
    }

    pub fn index_file(&self) -> PathBuf {
        self.dir.join("index.sqlite")
    }

    /// Whether the base has ever been learned.
    pub fn has_index(&self) -> bool {
        self.index_file().exists()
    }

    /// Persisted settings, or fresh ones from `settings` if none were saved.
    pub fn load_config(&self, settings: &KnowledgeConfig) -> AppResult<KnowledgeBaseConfig> {
        let path = self.config_file();
        if !path.exists() {
            tracing::debug!("No saved settings for '{}', using workspace defaults", self.name);
            return Ok(KnowledgeBaseConfig::from_settings(&self.name, settings));
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;
        let mut config: KnowledgeBaseConfig = serde_yaml::from_str(&content)
            .map_err(|e| AppError::Knowledge(format!("Failed to parse {:?}: {}", path, e)))?;

        // The directory name is authoritative
        config.name = self.name.clone();
        Ok(config)
    }

    pub fn save_config(&self, config: &KnowledgeBaseConfig) -> AppResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::Knowledge(format!("Failed to create {:?}: {}", self.dir, e))
        })?;

        let yaml = serde_yaml::to_string(config)?;
        let path = self.config_file();
        fs::write(&path, yaml)
            .map_err(|e| AppError::Knowledge(format!("Failed to write {:?}: {}", path, e)))?;

        tracing::debug!("Saved settings for knowledge base '{}'", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let layout = BaseLayout::new(Path::new("/ws"), "docs");
        assert_eq!(layout.name(), "docs");
        assert_eq!(
            layout.index_file(),
            PathBuf::from("/ws/.assistant/knowledge/docs/index.sqlite")
        );
        assert_eq!(
            layout.config_file(),
            PathBuf::from("/ws/.assistant/knowledge/docs/config.yaml")
        );
    }

    #[test]
    fn test_unsaved_base_uses_workspace_settings() {
        let temp = TempDir::new().unwrap();
        let settings = KnowledgeConfig {
            chunk_size: 500,
            ..Default::default()
        };

        let config = BaseLayout::new(temp.path(), "fresh").load_config(&settings).unwrap();
        assert_eq!(config.name, "fresh");
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.embedding_model, crate::embedding::MODEL_NAME);
    }

    #[test]
    fn test_saved_settings_win() {
        let temp = TempDir::new().unwrap();
        let layout = BaseLayout::new(temp.path(), "docs");
        let saved = KnowledgeBaseConfig {
            embedding_dim: 64,
            ..KnowledgeBaseConfig::from_settings("docs", &KnowledgeConfig::default())
        };
        layout.save_config(&saved).unwrap();

        let settings = KnowledgeConfig {
            embedding_dim: 512,
            ..Default::default()
        };
        assert_eq!(layout.load_config(&settings).unwrap(), saved);
    }

    #[test]
    fn test_partial_file_falls_back_per_field() {
        let temp = TempDir::new().unwrap();
        let layout = BaseLayout::new(temp.path(), "docs");
        fs::create_dir_all(layout.dir()).unwrap();
        fs::write(layout.config_file(), "chunkSize: 256\n").unwrap();

        let config = layout.load_config(&KnowledgeConfig::default()).unwrap();
        assert_eq!(config.name, "docs");
        assert_eq!(config.chunk_size, 256);
        assert_eq!(config.embedding_dim, 384);
    }
}
