//! Report module for summarizing slow and failed requests
//!
//! This module handles:
//! - Querying persisted requests for the current run's window
//! - Formatting the plain-text digest sent through a notifier

mod aggregator;
mod digest;

pub use aggregator::{collect_report, Report};
pub use digest::format_digest;
