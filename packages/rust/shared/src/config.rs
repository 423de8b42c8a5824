//! Application configuration for Coursewise.
//!
//! User config lives at `~/.coursewise/coursewise.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets (API key, passwords) are never stored in the file; the file only
//! names the environment variables that hold them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoursewiseError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "coursewise.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".coursewise";

/// User-Agent sent by the link verifier unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("Coursewise/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Config structs (matching coursewise.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// File locations.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// OpenRouter (completion service) settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Link verifier settings.
    #[serde(default)]
    pub verifier: LinkCheckConfig,

    /// The two login accounts.
    #[serde(default)]
    pub users: UsersConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Course catalog table (also the link verifier's input).
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Where link verification results are written.
    #[serde(default = "default_scraped_path")]
    pub scraped_path: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            scraped_path: default_scraped_path(),
        }
    }
}

fn default_catalog_path() -> String {
    "data/courses.csv".into()
}
fn default_scraped_path() -> String {
    "data/courses_with_scraped_info.csv".into()
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for classification, replies and moderation.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// OpenAI-compatible API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,

    /// Whether user input and replies are moderated.
    #[serde(default = "default_true")]
    pub moderation: bool,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            base_url: default_base_url(),
            temperature: 0.0,
            moderation: true,
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_true() -> bool {
    true
}

/// `[verifier]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkCheckConfig {
    /// Per-URL navigation ceiling in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum snippet length in characters.
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,

    /// Number of pages navigating in parallel (1 = strictly sequential).
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// User-Agent header sent with each navigation.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for LinkCheckConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            snippet_chars: default_snippet_chars(),
            concurrency: default_concurrency(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_snippet_chars() -> usize {
    300
}
fn default_concurrency() -> u32 {
    1
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

/// `[users]` section — exactly one admin and one regular account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersConfig {
    #[serde(default = "default_admin_username")]
    pub admin_username: String,

    /// Env var holding the admin password.
    #[serde(default = "default_admin_password_env")]
    pub admin_password_env: String,

    #[serde(default = "default_user_username")]
    pub user_username: String,

    /// Env var holding the regular user's password.
    #[serde(default = "default_user_password_env")]
    pub user_password_env: String,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            admin_username: default_admin_username(),
            admin_password_env: default_admin_password_env(),
            user_username: default_user_username(),
            user_password_env: default_user_password_env(),
        }
    }
}

fn default_admin_username() -> String {
    "admin".into()
}
fn default_admin_password_env() -> String {
    "COURSEWISE_ADMIN_PASSWORD".into()
}
fn default_user_username() -> String {
    "user".into()
}
fn default_user_password_env() -> String {
    "COURSEWISE_USER_PASSWORD".into()
}

// ---------------------------------------------------------------------------
// Verifier config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime link verifier configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Per-URL navigation ceiling.
    pub timeout: Duration,
    /// Maximum snippet length in characters.
    pub snippet_chars: usize,
    /// Pages navigating in parallel; 1 keeps the batch strictly sequential.
    pub concurrency: usize,
    /// User-Agent header.
    pub user_agent: String,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for VerifierConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.verifier.timeout_secs),
            snippet_chars: config.verifier.snippet_chars,
            concurrency: config.verifier.concurrency.max(1) as usize,
            user_agent: config.verifier.user_agent.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.coursewise/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CoursewiseError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.coursewise/coursewise.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| CoursewiseError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CoursewiseError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path()?;
    init_config_at(&path)?;
    Ok(path)
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| CoursewiseError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CoursewiseError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| CoursewiseError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}

/// Read the OpenRouter API key from the configured env var.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(CoursewiseError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
        ))),
    }
}
