//! catwalk: a catalog latency prober
//!
//! This crate walks the category tree published by a catalog API, fetches
//! every category concurrently, records status and latency for each fetch in
//! SQLite, and reports slow and failed requests through a notifier.

pub mod config;
pub mod crawler;
pub mod notify;
pub mod report;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for catwalk operations
#[derive(Debug, Error)]
pub enum CatwalkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Bootstrap request to {url} failed: {source}")]
    Bootstrap { url: String, source: reqwest::Error },

    #[error("Bootstrap response from {url} returned HTTP {status}")]
    BootstrapStatus { url: String, status: u16 },

    #[error("Failed to decode bootstrap payload from {url}: {source}")]
    BootstrapDecode {
        url: String,
        source: serde_json::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Notification error: {0}")]
    Notify(#[from] notify::NotifyError),
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

/// Result type alias for catwalk operations
pub type Result<T> = std::result::Result<T, CatwalkError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CategoryNode, Walker};
pub use state::VisitState;
