//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `ACTON_CRITERIA_`)
//! 2. Config file: `./criteria.toml`, or an explicit path
//! 3. Default values
//!
//! Nested keys in environment variables are separated by `__`, so
//! `ACTON_CRITERIA_PER_PAGE=50` sets `per_page`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Default number of records per page
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Default name of the query-string parameter carrying the page number
pub const DEFAULT_PAGE_NAME: &str = "page";

/// Default name of the request parameter read by column filters
pub const DEFAULT_FILTER_PARAMETER: &str = "filter";

/// Default separator between requested filter columns
pub const DEFAULT_FILTER_DELIMITER: &str = ";";

/// Default config file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "criteria.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ACTON_CRITERIA_";

/// Repository behaviour defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Records per page when the caller does not say
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Upper bound for any requested page size
    #[serde(default = "default_max_per_page")]
    pub max_per_page: u32,

    /// Query-string parameter carrying the page number
    #[serde(default = "default_page_name")]
    pub page_name: String,

    /// Request parameter read by column filters
    #[serde(default = "default_filter_parameter")]
    pub filter_parameter: String,

    /// Separator between requested filter columns
    #[serde(default = "default_filter_delimiter")]
    pub filter_delimiter: String,

    /// Whether new repositories apply their registered criteria
    #[serde(default = "default_true")]
    pub criteria_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            max_per_page: default_max_per_page(),
            page_name: default_page_name(),
            filter_parameter: default_filter_parameter(),
            filter_delimiter: default_filter_delimiter(),
            criteria_enabled: default_true(),
            log_level: default_log_level(),
        }
    }
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

fn default_max_per_page() -> u32 {
    100
}

fn default_page_name() -> String {
    DEFAULT_PAGE_NAME.to_string()
}

fn default_filter_parameter() -> String {
    DEFAULT_FILTER_PARAMETER.to_string()
}

fn default_filter_delimiter() -> String {
    DEFAULT_FILTER_DELIMITER.to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RepositoryConfig {
    /// Load configuration from `./criteria.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file
    ///
    /// A missing file is not an error; defaults and environment variables
    /// still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("Loading repository configuration from: {}", path.display());
        } else {
            tracing::debug!("No repository configuration at {}, using defaults", path.display());
        }

        let config = Self::figment(path).extract()?;
        Ok(config)
    }

    /// The provider chain used by [`load_from`](Self::load_from)
    ///
    /// Exposed so callers can merge further providers on top.
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Self::default()))
            // Load from config file (if exists)
            .merge(Toml::file(path))
            // Override with environment variables
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Clamp a requested page size to `1..=max_per_page`
    ///
    /// # Example
    ///
    /// ```rust
    /// use acton_criteria::config::RepositoryConfig;
    ///
    /// let config = RepositoryConfig::default();
    /// assert_eq!(config.clamp_per_page(0), 1);
    /// assert_eq!(config.clamp_per_page(500), 100);
    /// assert_eq!(config.clamp_per_page(25), 25);
    /// ```
    #[must_use]
    pub fn clamp_per_page(&self, per_page: u32) -> u32 {
        per_page.clamp(1, self.max_per_page.max(1))
    }
}
