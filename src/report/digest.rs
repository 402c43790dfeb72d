//! Plain-text digest of a report

use crate::report::aggregator::Report;

/// Formats `report` as a numbered plain-text digest
///
/// Empty sections are left out. Returns `None` when both sections are
/// empty, in which case nothing should be sent.
pub fn format_digest(report: &Report, threshold_secs: f64) -> Option<String> {
    if report.is_empty() {
        return None;
    }

    let mut sections = Vec::new();

    if !report.slow.is_empty() {
        let mut text = format!("Slow requests (over {}s):\n", threshold_secs);
        for (i, row) in report.slow.iter().enumerate() {
            text.push_str(&format!(
                "{}. {} ({:.3}s)\n",
                i + 1,
                row.url,
                row.elapsed_seconds
            ));
        }
        sections.push(text);
    }

    if !report.errors.is_empty() {
        let mut text = String::from("Failed requests:\n");
        for (i, row) in report.errors.iter().enumerate() {
            text.push_str(&format!(
                "{}. {} - HTTP {} ({:.3}s)\n",
                i + 1,
                row.url,
                row.status,
                row.elapsed_seconds
            ));
        }
        sections.push(text);
    }

    Some(sections.join("\n").trim_end().to_string())
}
