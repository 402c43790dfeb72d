//! Configuration module for catwalk
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use catwalk::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("catwalk.toml")).unwrap();
//! println!("Menu endpoint: {}", config.api.menu_url());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, Config, CrawlerConfig, LoggingConfig, OutputConfig, ReportConfig, TelegramConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
