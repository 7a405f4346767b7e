use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SIXDEGREES_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub sixdegrees: SixDegreesConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// Store location and logging
#[derive(Debug, Clone, Deserialize)]
pub struct SixDegreesConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Shortest-path search limits
#[derive(Debug, Clone, Deserialize)]
pub struct TraversalConfig {
    /// Maximum number of project hops between the two people.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// How many show lookups may be in flight while enriching episodes.
    #[serde(default = "default_enrichment_concurrency")]
    pub enrichment_concurrency: usize,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            enrichment_concurrency: default_enrichment_concurrency(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl TraversalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_max_depth() -> usize {
    crate::query::DEFAULT_MAX_DEPTH
}

fn default_enrichment_concurrency() -> usize {
    8
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_http_port() -> u16 {
    8080
}

fn default_allowed_origins() -> Vec<String> {
    // Empty means any origin; list origins explicitly for production
    vec![]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in SIXDEGREES_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::from_file(&config_path)
    }

    /// Load and validate a specific config file.
    pub fn from_file(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.sixdegrees.db_path.as_os_str().is_empty() {
            anyhow::bail!("sixdegrees.db_path must not be empty");
        }

        if !(1..=20).contains(&self.traversal.max_depth) {
            anyhow::bail!(
                "traversal.max_depth must be between 1 and 20, got {}",
                self.traversal.max_depth
            );
        }

        if self.traversal.enrichment_concurrency == 0 {
            anyhow::bail!("traversal.enrichment_concurrency must be greater than 0");
        }

        if self.traversal.timeout_ms == 0 {
            anyhow::bail!("traversal.timeout_ms must be greater than 0");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.sixdegrees.db_path
    }
}
