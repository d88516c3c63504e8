//! Configuration management for the Research Assistant.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`.assistant/config.yaml` in the workspace, or an explicit path)
//! - Environment variables (`ASSISTANT_*`)
//! - Command-line flags
//!
//! The configuration is workspace-centric, with all state stored in `.assistant/`.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .assistant/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Retrieval breadth and refinement bound
    pub pipeline: PipelineConfig,

    /// Input/output/document safety thresholds
    pub safety: SafetyConfig,

    /// Answer review thresholds
    pub review: ReviewConfig,

    /// Knowledge base indexing settings
    pub knowledge: KnowledgeConfig,
}

/// Settings for the answer pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Number of passages requested from the retriever
    pub top_k: usize,

    /// Upper bound on maker/checker rounds
    pub max_iterations: usize,

    /// Knowledge base queried by default
    pub knowledge_base: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            max_iterations: 2,
            knowledge_base: "default".to_string(),
        }
    }
}

/// Thresholds used by the safety validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SafetyConfig {
    /// Minimum query length in characters
    pub min_query_length: usize,

    /// Maximum query length in characters
    pub max_query_length: usize,

    /// Maximum share of non-alphanumeric, non-whitespace characters
    pub special_char_ratio: f64,

    /// Retrieved passages longer than this are dropped
    pub max_passage_length: usize,

    /// Retrieved passages containing any of these (case-insensitive) are dropped
    pub sensitive_markers: Vec<String>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            min_query_length: 3,
            max_query_length: 2000,
            special_char_ratio: 0.3,
            max_passage_length: 10_000,
            sensitive_markers: vec![
                "confidential".to_string(),
                "internal only".to_string(),
                "classified".to_string(),
            ],
        }
    }
}

/// Thresholds used by the default answer checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReviewConfig {
    /// Minimum answer length in characters
    pub min_answer_chars: usize,

    /// Literal that must appear in the answer as evidence of citation
    pub citation_marker: String,

    /// Minimum number of lowercased words shared by query and answer
    pub min_shared_terms: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            min_answer_chars: 100,
            citation_marker: "Source".to_string(),
            min_shared_terms: 2,
        }
    }
}

/// Settings for building the local knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KnowledgeConfig {
    /// Chunk size in characters
    pub chunk_size: usize,

    /// Overlap between consecutive chunks
    pub chunk_overlap: usize,

    /// Embedding vector dimension
    pub embedding_dim: usize,

    /// File extensions picked up by `learn`
    pub extensions: Vec<String>,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            embedding_dim: 384,
            extensions: vec!["txt".to_string()],
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    pipeline: Option<PipelineConfig>,
    safety: Option<SafetyConfig>,
    review: Option<ReviewConfig>,
    knowledge: Option<KnowledgeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            pipeline: PipelineConfig::default(),
            safety: SafetyConfig::default(),
            review: ReviewConfig::default(),
            knowledge: KnowledgeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `ASSISTANT_WORKSPACE`: Override workspace path
    /// - `ASSISTANT_CONFIG`: Path to config file
    /// - `ASSISTANT_TOP_K`, `ASSISTANT_MAX_ITERATIONS`: Pipeline bounds
    /// - `ASSISTANT_MIN_QUERY_LENGTH`, `ASSISTANT_MAX_QUERY_LENGTH`,
    ///   `ASSISTANT_SPECIAL_CHAR_RATIO`, `ASSISTANT_MAX_PASSAGE_LENGTH`: Safety thresholds
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use assistant_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration with an explicit workspace and/or config file.
    ///
    /// Explicit arguments take precedence over `ASSISTANT_WORKSPACE` and
    /// `ASSISTANT_CONFIG`.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("ASSISTANT_WORKSPACE")) {
            config.workspace = workspace;
        }
        config.config_file = config_file.or_else(|| env_path("ASSISTANT_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.assistant_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        env_override("ASSISTANT_TOP_K", &mut config.pipeline.top_k)?;
        env_override("ASSISTANT_MAX_ITERATIONS", &mut config.pipeline.max_iterations)?;
        env_override("ASSISTANT_MIN_QUERY_LENGTH", &mut config.safety.min_query_length)?;
        env_override("ASSISTANT_MAX_QUERY_LENGTH", &mut config.safety.max_query_length)?;
        env_override("ASSISTANT_SPECIAL_CHAR_RATIO", &mut config.safety.special_char_ratio)?;
        env_override("ASSISTANT_MAX_PASSAGE_LENGTH", &mut config.safety.max_passage_length)?;

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|e| {
                AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        };

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(pipeline) = config_file.pipeline {
            result.pipeline = pipeline;
        }
        if let Some(safety) = config_file.safety {
            result.safety = safety;
        }
        if let Some(review) = config_file.review {
            result.review = review;
        }
        if let Some(knowledge) = config_file.knowledge {
            result.knowledge = knowledge;
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and
    /// the config file.
    pub fn with_overrides(
        mut self,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        top_k: Option<usize>,
        max_iterations: Option<usize>,
    ) -> Self {
        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if let Some(top_k) = top_k {
            self.pipeline.top_k = top_k;
        }

        if let Some(max_iterations) = max_iterations {
            self.pipeline.max_iterations = max_iterations;
        }

        self
    }

    /// Get the path to the .assistant directory.
    pub fn assistant_dir(&self) -> PathBuf {
        self.workspace.join(".assistant")
    }

    /// Ensure the .assistant directory exists.
    pub fn ensure_assistant_dir(&self) -> AppResult<()> {
        let dir = self.assistant_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .assistant directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Path of the query/response ledger database.
    pub fn ledger_path(&self) -> PathBuf {
        self.assistant_dir().join("ledger.sqlite")
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> AppResult<()> {
        if self.pipeline.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }

        if self.safety.min_query_length > self.safety.max_query_length {
            return Err(AppError::Config(format!(
                "minQueryLength ({}) exceeds maxQueryLength ({})",
                self.safety.min_query_length, self.safety.max_query_length
            )));
        }

        if !(0.0..=1.0).contains(&self.safety.special_char_ratio) {
            return Err(AppError::Config(format!(
                "specialCharRatio must be within [0, 1], got {}",
                self.safety.special_char_ratio
            )));
        }

        if self.knowledge.chunk_size == 0 {
            return Err(AppError::Config("chunkSize must be at least 1".to_string()));
        }

        if self.knowledge.chunk_overlap >= self.knowledge.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                self.knowledge.chunk_overlap, self.knowledge.chunk_size
            )));
        }

        Ok(())
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().map(PathBuf::from)
}

/// Overwrite `target` with the parsed value of environment variable `name`, if set.
fn env_override<T>(name: &str, target: &mut T) -> AppResult<()>
where
    T: FromStr,
    T::Err: Display,
{
    if let Ok(raw) = std::env::var(name) {
        *target = raw.trim().parse().map_err(|e| {
            AppError::Config(format!("Invalid value for {}: {:?} ({})", name, raw, e))
        })?;
    }
    Ok(())
}
