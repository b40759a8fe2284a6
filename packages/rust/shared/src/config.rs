//! Application configuration for devlog.
//!
//! User config lives at `~/.devlog/devlog.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DevlogError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "devlog.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".devlog";

// ---------------------------------------------------------------------------
// Config structs (matching devlog.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Text generation backend settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Repository host settings.
    #[serde(default)]
    pub github: GithubConfig,

    /// Publishing platform constants and frontmatter inputs.
    #[serde(default)]
    pub publishing: PublishingConfig,

    /// Analytics asset locations.
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Account whose repositories are turned into articles.
    #[serde(default = "default_username")]
    pub username: String,

    /// Directory receiving one Markdown article per repository.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Maximum number of repositories considered per run.
    #[serde(default = "default_max_repositories")]
    pub max_repositories: usize,

    /// Repositories pushed more than this many whole days ago are skipped.
    #[serde(default = "default_days_threshold")]
    pub days_threshold: i64,

    /// Reading speed used for the reading-time estimate.
    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            output_dir: default_output_dir(),
            max_repositories: default_max_repositories(),
            days_threshold: default_days_threshold(),
            words_per_minute: default_words_per_minute(),
        }
    }
}

fn default_username() -> String {
    "octocat".into()
}
fn default_output_dir() -> String {
    "markdown_files".into()
}
fn default_max_repositories() -> usize {
    10
}
fn default_days_threshold() -> i64 {
    1
}
fn default_words_per_minute() -> u32 {
    200
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// OpenAI-compatible chat completions endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per completion call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay_secs() -> u64 {
    2
}

/// `[github]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// REST API base URL.
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Name of the env var holding an optional access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            token_env: default_token_env(),
        }
    }
}

fn default_github_api_url() -> String {
    "https://api.github.com".into()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}

/// `[publishing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishingConfig {
    /// Candidate authors; one is picked per repository.
    #[serde(default = "default_author_list")]
    pub author_list: Vec<String>,

    /// Cover image used in frontmatter, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,

    /// Layout template path expected by the publishing platform.
    #[serde(default = "default_layout")]
    pub layout: String,

    /// Theme constant expected by the publishing platform.
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Whether articles are marked as featured.
    #[serde(default = "default_true")]
    pub featured: bool,

    /// Location of the persistent `{ "tags": [...] }` file.
    #[serde(default = "default_tag_file_path")]
    pub tag_file_path: String,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            author_list: default_author_list(),
            cover_image_url: None,
            layout: default_layout(),
            theme: default_theme(),
            featured: true,
            tag_file_path: default_tag_file_path(),
        }
    }
}

fn default_author_list() -> Vec<String> {
    vec!["unknown".into()]
}
fn default_layout() -> String {
    "../../layouts/MarkdownPost.astro".into()
}
fn default_theme() -> String {
    "light".into()
}
fn default_true() -> bool {
    true
}
fn default_tag_file_path() -> String {
    "src/data/tags.json".into()
}

/// `[analytics]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Directory where chart files and commit exports live on disk.
    #[serde(default)]
    pub assets_save_folder: String,

    /// Prefix used when referencing chart files from an article.
    #[serde(default)]
    pub assets_read_folder: String,

    /// Directory holding local checkouts (`<root>/<repo name>`) for commit history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_root: Option<String>,
}

// ---------------------------------------------------------------------------
// Runtime settings (derived from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime settings for the text generation client.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub api_url: String,
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl From<&AppConfig> for GenerationSettings {
    fn from(config: &AppConfig) -> Self {
        let generation = &config.generation;
        Self {
            api_url: generation.api_url.clone(),
            api_key_env: generation.api_key_env.clone(),
            model: generation.model.clone(),
            temperature: generation.temperature,
            timeout: Duration::from_secs(generation.timeout_secs),
            max_attempts: generation.max_attempts.max(1),
            retry_delay: Duration::from_secs(generation.retry_delay_secs),
        }
    }
}

/// Runtime settings for gating and assembling articles.
#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub username: String,
    pub output_dir: PathBuf,
    pub max_repositories: usize,
    pub days_threshold: i64,
    pub words_per_minute: u32,
    pub author_list: Vec<String>,
    pub cover_image_url: Option<String>,
    pub layout: String,
    pub theme: String,
    pub featured: bool,
    pub tag_file_path: PathBuf,
}

impl From<&AppConfig> for PublishSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            username: config.defaults.username.clone(),
            output_dir: PathBuf::from(&config.defaults.output_dir),
            max_repositories: config.defaults.max_repositories,
            days_threshold: config.defaults.days_threshold,
            words_per_minute: config.defaults.words_per_minute.max(1),
            author_list: config.publishing.author_list.clone(),
            cover_image_url: config.publishing.cover_image_url.clone(),
            layout: config.publishing.layout.clone(),
            theme: config.publishing.theme.clone(),
            featured: config.publishing.featured,
            tag_file_path: PathBuf::from(&config.publishing.tag_file_path),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.devlog/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| DevlogError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.devlog/devlog.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DevlogError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DevlogError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DevlogError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DevlogError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DevlogError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the generation API key from `var_name`. Unset or empty is a config error.
pub fn read_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(DevlogError::config(format!(
            "generation API key not found. Set the {var_name} environment variable."
        ))),
    }
}
