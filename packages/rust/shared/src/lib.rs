//! Shared types, error model, and configuration for devlog.
//!
//! This crate is the foundation depended on by all other devlog crates.
//! It provides:
//! - [`DevlogError`] and [`GenerationError`], the unified error types
//! - Domain types ([`RepositoryRecord`], [`CommitRecord`], [`TagSet`])
//! - Configuration ([`AppConfig`], runtime settings, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnalyticsConfig, AppConfig, DefaultsConfig, GenerationConfig, GenerationSettings,
    GithubConfig, PublishSettings, PublishingConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, read_api_key,
};
pub use error::{DevlogError, GenerationError, Result};
pub use types::{CommitRecord, RepositoryRecord, TagSet};
