//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Report engine configuration.
    #[serde(default)]
    pub reports: ReportsConfig,
    /// Data snapshot locations.
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Report engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportsConfig {
    /// Deadline for the fetch phase when the caller supplies none.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// Time-to-live of a cached chart of accounts.
    #[serde(default = "default_accounts_cache_ttl")]
    pub accounts_cache_ttl_secs: u64,
}

fn default_fetch_timeout_ms() -> u64 {
    5_000
}

fn default_accounts_cache_ttl() -> u64 {
    300 // 5 minutes
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: default_fetch_timeout_ms(),
            accounts_cache_ttl_secs: default_accounts_cache_ttl(),
        }
    }
}

/// Locations of the JSON snapshots read by the report driver.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Ledger transactions.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: String,
    /// Chart of accounts.
    #[serde(default = "default_accounts_path")]
    pub accounts_path: String,
    /// Segment catalog, only needed for per-segment breakdowns.
    #[serde(default)]
    pub segments_path: Option<String>,
}

fn default_ledger_path() -> String {
    "data/ledger.json".to_string()
}

fn default_accounts_path() -> String {
    "data/accounts.json".to_string()
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            ledger_path: default_ledger_path(),
            accounts_path: default_accounts_path(),
            segments_path: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "contabil=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("CONTABIL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
