//! Run coordinator - one complete probe run
//!
//! This module ties the pieces together in order:
//! - Record the run start (the report window)
//! - Fetch the root categories
//! - Walk the whole tree and join
//! - Build the slow/error report and deliver the digest

use crate::config::Config;
use crate::crawler::bootstrap::fetch_root_categories;
use crate::crawler::cancel::CancelHandle;
use crate::crawler::category::count_nodes;
use crate::crawler::walker::{WalkStats, Walker};
use crate::crawler::build_http_client;
use crate::notify::Notifier;
use crate::report::{collect_report, format_digest, Report};
use crate::storage::SqliteStorage;
use crate::CatwalkError;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;

/// What one run did
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub roots: usize,
    pub nodes: usize,
    pub walk: WalkStats,
    pub report: Report,
    /// Whether a digest was handed to the notifier
    pub notified: bool,
}

/// Main run coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    storage: Arc<SqliteStorage>,
    client: Client,
    cancel: CancelHandle,
}

impl Coordinator {
    /// Creates a coordinator, opening the database named in the config
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Storage opened and HTTP client built
    /// * `Err(CatwalkError)` - Store initialization failed (fatal)
    pub fn new(config: Config) -> Result<Self, CatwalkError> {
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        Self::with_storage(config, Arc::new(storage))
    }

    /// Creates a coordinator over an already opened store
    pub fn with_storage(config: Config, storage: Arc<SqliteStorage>) -> Result<Self, CatwalkError> {
        let client = build_http_client(&config.api)?;
        Ok(Self {
            config: Arc::new(config),
            storage,
            client,
            cancel: CancelHandle::new(),
        })
    }

    /// Handle that stops the walk early; the report still runs afterwards
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// HTTP client shared by the walker and the notifier
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn storage(&self) -> &Arc<SqliteStorage> {
        &self.storage
    }

    /// Runs one complete probe
    ///
    /// Bootstrap failure aborts before anything is written. Per-node failures
    /// are logged by the walker. A notifier error is returned after the walk
    /// and the report are complete; persisted data is unaffected.
    pub async fn run(&self, notifier: &dyn Notifier) -> Result<RunSummary, CatwalkError> {
        let started_at = Utc::now();
        let menu_url = self.config.api.menu_url();

        tracing::info!("Fetching root categories from {}", menu_url);
        let roots = fetch_root_categories(&self.client, &menu_url).await?;
        let root_count = roots.len();
        let nodes = count_nodes(&roots);
        tracing::info!("{} root categories, {} nodes in tree", root_count, nodes);

        let walker = Walker::builder(
            self.client.clone(),
            self.config.api.clone(),
            self.storage.clone(),
        )
        .concurrency_limit(self.config.crawler.max_concurrent_fetches)
        .cancel_handle(self.cancel.clone())
        .build();
        match walker.concurrency_limit() {
            Some(cap) => tracing::info!("Walking with at most {} concurrent fetches", cap),
            None => tracing::debug!("Walking without a concurrency cap"),
        }

        let walk_started = std::time::Instant::now();
        let walk = walker.walk(roots).await;
        tracing::info!("Walk completed in {:?}", walk_started.elapsed());

        let report = collect_report(self.storage.as_ref(), &started_at, &self.config.report);

        let notified = match format_digest(&report, self.config.report.slow_threshold_secs) {
            Some(digest) => {
                notifier.send(&digest).await.map_err(|e| {
                    tracing::error!("Failed to deliver digest: {}", e);
                    e
                })?;
                true
            }
            None => {
                tracing::info!("No slow or failed requests; nothing to send");
                false
            }
        };

        Ok(RunSummary {
            started_at,
            roots: root_count,
            nodes,
            walk,
            report,
            notified,
        })
    }
}

/// Builds the report for an arbitrary window from stored data only
pub fn report_since(
    storage: &SqliteStorage,
    since: &DateTime<Utc>,
    config: &Config,
) -> (Report, Option<String>) {
    let report = collect_report(storage, since, &config.report);
    let digest = format_digest(&report, config.report.slow_threshold_secs);
    (report, digest)
}
