//! Builds the slow/error report from persisted requests

use crate::config::ReportConfig;
use crate::storage::{ReportRow, ReportSource};
use chrono::{DateTime, Utc};

/// Slow and failed requests for one reporting window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    /// HTTP 200 responses slower than the threshold, slowest first
    pub slow: Vec<ReportRow>,
    /// Non-200 responses, slowest first
    pub errors: Vec<ReportRow>,
}

impl Report {
    /// True when there is nothing worth sending
    pub fn is_empty(&self) -> bool {
        self.slow.is_empty() && self.errors.is_empty()
    }
}

/// Collects the report for requests created at or after `since`
///
/// Query failures are logged and leave the affected section empty; they are
/// never returned to the caller.
pub fn collect_report(
    source: &dyn ReportSource,
    since: &DateTime<Utc>,
    config: &ReportConfig,
) -> Report {
    let slow = source
        .slow_requests(since, config.slow_threshold_secs, config.slow_limit)
        .unwrap_or_else(|e| {
            tracing::error!("Slow request query failed: {}", e);
            Vec::new()
        });

    let errors = source
        .error_requests(since, config.error_limit)
        .unwrap_or_else(|e| {
            tracing::error!("Error request query failed: {}", e);
            Vec::new()
        });

    tracing::info!(
        "Report since {}: {} slow, {} failed",
        since,
        slow.len(),
        errors.len()
    );

    Report { slow, errors }
}
