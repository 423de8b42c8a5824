//! Shared types, error model, and configuration for Coursewise.
//!
//! This crate is the foundation depended on by all other Coursewise crates.
//! It provides:
//! - [`CoursewiseError`] — the unified error type, and [`FetchError`] for
//!   per-URL verification failures
//! - Domain types ([`CourseRecord`], [`ChatMessage`], [`ScrapeResult`], [`SessionId`])
//! - Configuration ([`AppConfig`], [`VerifierConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_USER_AGENT, DefaultsConfig, LinkCheckConfig, OpenRouterConfig,
    UsersConfig, VerifierConfig, config_dir, config_file_path, init_config, init_config_at,
    load_config, load_config_from, resolve_api_key,
};
pub use error::{CoursewiseError, FetchError, Result};
pub use types::{
    COL_COMPETENCY, COL_PROFICIENCY, COL_PROVIDER, COL_TITLE, COL_URL, ChatMessage,
    CourseRecord, ERROR_TITLE, MessageRole, ScrapeResult, SessionId,
};
