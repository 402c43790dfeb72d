use serde::Deserialize;

/// Main configuration structure for catwalk
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Catalog API endpoints and HTTP client settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the catalog API, e.g. `https://shop.example/api/v1`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path below the base URL that returns the root category list
    #[serde(rename = "menu-path", default = "default_menu_path")]
    pub menu_path: String,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds. Absent means no timeout.
    #[serde(rename = "request-timeout-secs", default)]
    pub request_timeout_secs: Option<u64>,
}

impl ApiConfig {
    /// URL of the bootstrap (menu) endpoint
    pub fn menu_url(&self) -> String {
        join_path(&self.base_url, &self.menu_path)
    }

    /// URL of the per-category endpoint for `slug`
    pub fn category_url(&self, slug: &str) -> String {
        join_path(&self.base_url, &format!("category/{}", slug))
    }
}

fn join_path(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Tree walker behaviour
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlerConfig {
    /// Upper bound on fetches in flight. Absent means unbounded.
    #[serde(rename = "max-concurrent-fetches", default)]
    pub max_concurrent_fetches: Option<usize>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Thresholds and limits for the slow/error report
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Requests slower than this (in seconds) with a 200 status are "slow"
    #[serde(rename = "slow-threshold-secs", default = "default_slow_threshold")]
    pub slow_threshold_secs: f64,

    /// Maximum number of slow requests in a report
    #[serde(rename = "slow-limit", default = "default_slow_limit")]
    pub slow_limit: u32,

    /// Maximum number of failed requests in a report
    #[serde(rename = "error-limit", default = "default_error_limit")]
    pub error_limit: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            slow_threshold_secs: default_slow_threshold(),
            slow_limit: default_slow_limit(),
            error_limit: default_error_limit(),
        }
    }
}

/// Telegram bot credentials for digest delivery
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub token: String,

    #[serde(rename = "chat-id")]
    pub chat_id: String,

    #[serde(rename = "api-base", default = "default_telegram_api")]
    pub api_base: String,
}

/// Log destination
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Append logs to this file instead of stdout
    #[serde(default)]
    pub file: Option<String>,
}

fn default_menu_path() -> String {
    "menu".to_string()
}

fn default_user_agent() -> String {
    format!("catwalk/{}", env!("CARGO_PKG_VERSION"))
}

fn default_database_path() -> String {
    "requests.db".to_string()
}

fn default_slow_threshold() -> f64 {
    2.0
}

fn default_slow_limit() -> u32 {
    10
}

fn default_error_limit() -> u32 {
    20
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}
