//! Crawler module for walking the catalog tree
//!
//! This module contains the core walking logic, including:
//! - Decoding the category tree and per-category bodies
//! - HTTP fetching with latency measurement
//! - Recursive concurrent fan-out with a single join point
//! - Overall run coordination

mod bootstrap;
mod cancel;
mod category;
mod coordinator;
mod fetcher;
mod wait_group;
mod walker;

pub use bootstrap::fetch_root_categories;
pub use cancel::CancelHandle;
pub use category::{
    count_nodes, decode_categories, decode_category_info, CategoryInfo, CategoryNode, Pagination,
};
pub use coordinator::{report_since, Coordinator, RunSummary};
pub use fetcher::{build_http_client, fetch_category, FetchError, FetchOutcome};
pub use wait_group::{WaitGroup, WorkGuard};
pub use walker::{WalkStats, Walker, WalkerBuilder};

use crate::config::Config;
use crate::notify::Notifier;
use crate::CatwalkError;

/// Runs a complete probe with a fresh coordinator
///
/// This is the main entry point for a run. It will:
/// 1. Open the store
/// 2. Fetch the root categories
/// 3. Walk and join the whole tree
/// 4. Report and notify
///
/// # Example
///
/// ```no_run
/// use catwalk::config::load_config;
/// use catwalk::crawler::run;
/// use catwalk::notify::StdoutNotifier;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("catwalk.toml"))?;
/// run(config, &StdoutNotifier).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run(config: Config, notifier: &dyn Notifier) -> Result<RunSummary, CatwalkError> {
    Coordinator::new(config)?.run(notifier).await
}
