//! Research Assistant Core Library
//!
//! This crate provides the foundational utilities shared by every other crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management (pipeline, safety, review and knowledge settings)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, KnowledgeConfig, PipelineConfig, ReviewConfig, SafetyConfig};
pub use error::{AppError, AppResult};
