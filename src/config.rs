use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::kek::CachingMode;
use crate::view::Order;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// Upstream API and on-disk cache settings
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Directory holding `graph.dot`, the list files and per-entity JSON.
    pub data_dir: PathBuf,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub caching: CachingMode,
    /// Maximum number of entity downloads in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Table and relation view defaults
#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_per_page")]
    pub per_page: usize,
    #[serde(default = "default_order")]
    pub default_order: String,
    #[serde(default = "default_relation_level")]
    pub relation_level: usize,
    /// Number of parsed entity records kept in memory by the server.
    #[serde(default = "default_object_cache")]
    pub object_cache: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            default_order: default_order(),
            relation_level: default_relation_level(),
            object_cache: default_object_cache(),
        }
    }
}

/// Network session settings
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_session_capacity")]
    pub session_capacity: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            session_capacity: default_session_capacity(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Optional directory with the compiled browser viewer.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            allowed_origins: Vec::new(),
            static_dir: None,
        }
    }
}

fn default_api_url() -> String {
    "https://medienvielfaltsmonitor.de/api/v1/".to_string()
}

fn default_user_agent() -> String {
    "github.com/defgsus/kek-online-archive".to_string()
}

fn default_concurrency() -> usize {
    8
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_per_page() -> usize {
    10
}

fn default_order() -> String {
    "-out_degree".to_string()
}

fn default_relation_level() -> usize {
    1
}

fn default_object_cache() -> usize {
    512
}

fn default_session_capacity() -> usize {
    64
}

fn default_http_port() -> u16 {
    8080
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in KEKGRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config_path = std::env::var("KEKGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::load_from(&config_path)
    }

    /// Load and validate a specific config file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml(&config_str)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.archive.data_dir.as_os_str().is_empty() {
            anyhow::bail!("archive.data_dir must not be empty");
        }

        url::Url::parse(&self.archive.api_url)
            .with_context(|| format!("archive.api_url is not a valid URL: {}", self.archive.api_url))?;

        if self.archive.concurrency == 0 {
            anyhow::bail!("archive.concurrency must be greater than 0");
        }

        if self.viewer.per_page == 0 {
            anyhow::bail!("viewer.per_page must be greater than 0");
        }

        if self.viewer.relation_level == 0 {
            anyhow::bail!("viewer.relation_level must be at least 1");
        }

        Order::parse(&self.viewer.default_order)
            .with_context(|| format!("viewer.default_order is invalid: {}", self.viewer.default_order))?;

        if self.network.session_capacity == 0 {
            anyhow::bail!("network.session_capacity must be greater than 0");
        }

        Ok(())
    }

    /// Get the data directory
    pub fn data_dir(&self) -> &Path {
        &self.archive.data_dir
    }

    /// Path of the derived dot graph
    pub fn graph_path(&self) -> PathBuf {
        self.archive.data_dir.join("graph.dot")
    }

    /// Default log filter, used when RUST_LOG is unset
    pub fn log_level(&self) -> &str {
        &self.archive.log_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const MINIMAL: &str = r#"
[archive]
data_dir = "./docs/data"
"#;

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.archive.api_url, "https://medienvielfaltsmonitor.de/api/v1/");
        assert_eq!(config.archive.caching, CachingMode::Always);
        assert_eq!(config.archive.concurrency, 8);
        assert_eq!(config.viewer.per_page, 10);
        assert_eq!(config.viewer.default_order, "-out_degree");
        assert_eq!(config.network.session_capacity, 64);
        assert_eq!(config.http_server.port, 8080);
        assert!(config.http_server.static_dir.is_none());
        assert_eq!(config.graph_path(), PathBuf::from("./docs/data/graph.dot"));
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
[archive]
data_dir = "/tmp/kek"
caching = "upgrade"
concurrency = 2
log_level = "debug"

[viewer]
per_page = 25
default_order = "label"

[http_server]
port = 9000
allowed_origins = ["http://localhost:3000"]
static_dir = "frontend/build"
"#,
        )
        .unwrap();
        assert_eq!(config.archive.caching, CachingMode::Upgrade);
        assert_eq!(config.archive.concurrency, 2);
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.viewer.per_page, 25);
        assert_eq!(config.http_server.port, 9000);
        assert_eq!(config.http_server.allowed_origins.len(), 1);
    }

    #[test]
    fn test_invalid_caching_mode() {
        let result = Config::from_toml(
            r#"
[archive]
data_dir = "x"
caching = "sometimes"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_per_page_rejected() {
        let result = Config::from_toml(
            r#"
[archive]
data_dir = "x"

[viewer]
per_page = 0
"#,
        );
        assert!(result.unwrap_err().to_string().contains("per_page"));
    }

    #[test]
    fn test_bad_default_order_rejected() {
        let result = Config::from_toml(
            r#"
[archive]
data_dir = "x"

[viewer]
default_order = "-colour"
"#,
        );
        assert!(result.unwrap_err().to_string().contains("default_order"));
    }

    #[test]
    fn test_config_load_from_env_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("kek.toml");
        fs::write(&config_path, MINIMAL).unwrap();

        let original = std::env::var("KEKGRAPH_CONFIG").ok();
        std::env::set_var("KEKGRAPH_CONFIG", config_path.to_str().unwrap());
        let config = Config::load();
        std::env::remove_var("KEKGRAPH_CONFIG");
        if let Some(v) = original {
            std::env::set_var("KEKGRAPH_CONFIG", v);
        }
        assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("KEKGRAPH_CONFIG").ok();
        std::env::set_var("KEKGRAPH_CONFIG", "nonexistent.toml");
        let config = Config::load();
        assert!(config.is_err());
        std::env::remove_var("KEKGRAPH_CONFIG");
        if let Some(v) = original {
            std::env::set_var("KEKGRAPH_CONFIG", v);
        }
    }
}
