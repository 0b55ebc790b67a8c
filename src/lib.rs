//! Catalog-Harvest: an incremental catalog crawler
//!
//! This crate harvests project records (title, year, description, images) from a
//! paginated catalog site into a local corpus that can be refreshed without
//! re-downloading anything that is already complete.

pub mod config;
pub mod crawler;
pub mod output;
pub mod store;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Catalog-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Failed to render {url}: {message}")]
    Render { url: String, message: String },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns true for failures scoped to one URL that a later run can retry
    ///
    /// Persistence and configuration failures are not transient: they abort the run.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http { .. }
                | Self::HttpStatus { .. }
                | Self::Timeout { .. }
                | Self::Render { .. }
                | Self::UrlParse(_)
                | Self::Reqwest(_)
        )
    }

    /// Classifies a reqwest failure for `url` into a timeout or a generic HTTP error
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Http {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Catalog-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Harvester, RunReport};
pub use store::{Corpus, ProjectRecord, SearchPageCache};
