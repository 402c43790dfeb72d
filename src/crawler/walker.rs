//! Concurrent tree walker
//!
//! Each category node is visited by its own tokio task. A visit fetches the
//! node, hands status and timing to the persistence gateway, then spawns a
//! visit for every child known from the bootstrap tree. There is no depth
//! limit and no deduplication: a slug that appears under two parents is
//! fetched twice and coalesces only at the page row.
//!
//! The walk is finished when the [`WaitGroup`] drains; see `wait_group.rs` for
//! why the count cannot reach zero early.

use crate::config::ApiConfig;
use crate::crawler::cancel::CancelHandle;
use crate::crawler::category::CategoryNode;
use crate::crawler::fetcher::{fetch_category, FetchOutcome};
use crate::crawler::wait_group::WaitGroup;
use crate::state::VisitState;
use crate::storage::{PersistenceGateway, StorageError, StorageResult};
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Totals for one walk, read after the join
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Visits that ran to completion (any outcome)
    pub visited: usize,
    /// Fetches that produced a status code
    pub fetched: usize,
    /// Fetches that failed before a status code
    pub network_failures: usize,
    /// Responses whose body could not be decoded
    pub decode_failures: usize,
    /// Request records written
    pub persisted: usize,
    /// Upsert or insert failures
    pub persist_failures: usize,
    /// Visits skipped or abandoned because of cancellation
    pub cancelled: usize,
}

#[derive(Default)]
struct WalkCounters {
    visited: AtomicUsize,
    fetched: AtomicUsize,
    network_failures: AtomicUsize,
    decode_failures: AtomicUsize,
    persisted: AtomicUsize,
    persist_failures: AtomicUsize,
    cancelled: AtomicUsize,
}

impl WalkCounters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> WalkStats {
        WalkStats {
            visited: self.visited.load(Ordering::Relaxed),
            fetched: self.fetched.load(Ordering::Relaxed),
            network_failures: self.network_failures.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Everything a visit task needs; shared by all tasks of one walk
struct VisitContext {
    client: Client,
    api: ApiConfig,
    gateway: Arc<dyn PersistenceGateway>,
    limit: Option<usize>,
    limiter: Option<Arc<Semaphore>>,
    cancel: CancelHandle,
    wait_group: WaitGroup,
    counters: WalkCounters,
}

/// How a single fetch attempt ended
enum VisitOutcome {
    Recorded,
    Failed,
    Cancelled,
}

/// Walks a category tree, one task per node
pub struct Walker {
    ctx: Arc<VisitContext>,
}

/// Collects walk settings before any task can see them
pub struct WalkerBuilder {
    client: Client,
    api: ApiConfig,
    gateway: Arc<dyn PersistenceGateway>,
    limit: Option<usize>,
    cancel: CancelHandle,
}

impl WalkerBuilder {
    /// Caps the number of fetches in flight; `None` keeps it unbounded
    ///
    /// The permit covers fetch and persistence only. Children are dispatched
    /// after it is released, so a small cap cannot stall the fan-out.
    pub fn concurrency_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Uses an externally owned cancel handle
    pub fn cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> Walker {
        let limit = self.limit.map(|n| n.max(1));
        Walker {
            ctx: Arc::new(VisitContext {
                client: self.client,
                api: self.api,
                gateway: self.gateway,
                limit,
                limiter: limit.map(|n| Arc::new(Semaphore::new(n))),
                cancel: self.cancel,
                wait_group: WaitGroup::new(),
                counters: WalkCounters::default(),
            }),
        }
    }
}

impl Walker {
    /// Starts configuring a walker
    pub fn builder(
        client: Client,
        api: ApiConfig,
        gateway: Arc<dyn PersistenceGateway>,
    ) -> WalkerBuilder {
        WalkerBuilder {
            client,
            api,
            gateway,
            limit: None,
            cancel: CancelHandle::new(),
        }
    }

    /// Creates a walker with no concurrency cap and its own cancel handle
    pub fn new(client: Client, api: ApiConfig, gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self::builder(client, api, gateway).build()
    }

    /// Cap on concurrent fetches, if any
    pub fn concurrency_limit(&self) -> Option<usize> {
        self.ctx.limit
    }

    /// Handle that stops the walk early when cancelled
    pub fn cancel_handle(&self) -> CancelHandle {
        self.ctx.cancel.clone()
    }

    /// Visits still dispatched and not finished
    pub fn in_flight(&self) -> usize {
        self.ctx.wait_group.pending()
    }

    /// Dispatches a visit for every root; returns without waiting
    pub fn spawn(&self, roots: Vec<CategoryNode>) {
        for root in roots {
            dispatch(&self.ctx, root);
        }
    }

    /// Waits until every dispatched visit, including all descendants, is done
    pub async fn join(&self) -> WalkStats {
        self.ctx.wait_group.wait().await;
        let stats = self.ctx.counters.snapshot();
        tracing::info!(
            "Walk finished: {} visited, {} fetched, {} network failures, {} persisted",
            stats.visited,
            stats.fetched,
            stats.network_failures,
            stats.persisted
        );
        stats
    }

    /// Dispatches `roots` and waits for the whole tree
    pub async fn walk(&self, roots: Vec<CategoryNode>) -> WalkStats {
        self.spawn(roots);
        self.join().await
    }
}

/// Registers and spawns one visit
///
/// The guard is taken here, in the caller, so the parent's own guard is
/// still alive when the child is counted.
fn dispatch(ctx: &Arc<VisitContext>, node: CategoryNode) {
    let guard = ctx.wait_group.add();
    let ctx = Arc::clone(ctx);
    tokio::spawn(async move {
        visit(&ctx, node).await;
        drop(guard);
    });
}

async fn visit(ctx: &Arc<VisitContext>, node: CategoryNode) {
    let CategoryNode { id, slug, children } = node;
    let mut state = VisitState::Pending;

    if ctx.cancel.is_cancelled() {
        WalkCounters::bump(&ctx.counters.cancelled);
        advance(&mut state, VisitState::Expanded, &slug);
        WalkCounters::bump(&ctx.counters.visited);
        return;
    }

    let url = ctx.api.category_url(&slug);
    advance(&mut state, VisitState::Fetching, &slug);

    match fetch_and_record(ctx, id, &url).await {
        VisitOutcome::Recorded => advance(&mut state, VisitState::Recorded, &slug),
        VisitOutcome::Failed => advance(&mut state, VisitState::Failed, &slug),
        VisitOutcome::Cancelled => {
            WalkCounters::bump(&ctx.counters.cancelled);
            WalkCounters::bump(&ctx.counters.visited);
            return;
        }
    }

    // Children come from the bootstrap tree, so a failed fetch still expands
    if !ctx.cancel.is_cancelled() {
        for child in children {
            dispatch(ctx, child);
        }
    }
    advance(&mut state, VisitState::Expanded, &slug);
    WalkCounters::bump(&ctx.counters.visited);
}

fn advance(state: &mut VisitState, next: VisitState, slug: &str) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal visit transition {} -> {}",
        state,
        next
    );
    tracing::trace!("{}: {} -> {}", slug, state, next);
    *state = next;
}

async fn fetch_and_record(ctx: &VisitContext, id: i64, url: &str) -> VisitOutcome {
    let _permit = match &ctx.limiter {
        Some(limiter) => tokio::select! {
            permit = limiter.acquire() => permit.ok(),
            _ = ctx.cancel.cancelled() => return VisitOutcome::Cancelled,
        },
        None => None,
    };

    let result = tokio::select! {
        result = fetch_category(&ctx.client, url) => result,
        _ = ctx.cancel.cancelled() => return VisitOutcome::Cancelled,
    };

    let FetchOutcome {
        status,
        elapsed,
        body,
    } = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            // No status means nothing to score, so nothing is persisted
            tracing::warn!("Category {} fetch failed: {}", id, e);
            WalkCounters::bump(&ctx.counters.network_failures);
            return VisitOutcome::Failed;
        }
    };
    WalkCounters::bump(&ctx.counters.fetched);

    match &body {
        Ok(info) => {
            if let Some(pagination) = &info.pagination {
                tracing::debug!(
                    "Category {} -> HTTP {} in {:?} ({:?} pages)",
                    id,
                    status,
                    elapsed,
                    pagination.last_page
                );
            } else {
                tracing::debug!("Category {} -> HTTP {} in {:?}", id, status, elapsed);
            }
        }
        Err(e) => {
            tracing::warn!("Category {} ({}) returned HTTP {}: {}", id, url, status, e);
            WalkCounters::bump(&ctx.counters.decode_failures);
        }
    }

    match persist(Arc::clone(&ctx.gateway), url.to_string(), status, elapsed).await {
        Ok(page_id) => {
            tracing::trace!("Recorded request for page {} ({})", page_id, url);
            WalkCounters::bump(&ctx.counters.persisted);
        }
        Err(e) => {
            tracing::error!("Failed to persist request for {}: {}", url, e);
            WalkCounters::bump(&ctx.counters.persist_failures);
        }
    }

    VisitOutcome::Recorded
}

/// Upserts the page then appends the request, off the async workers
///
/// Both steps run in one blocking closure so the request insert always sees
/// the page id produced by the upsert.
async fn persist(
    gateway: Arc<dyn PersistenceGateway>,
    url: String,
    status: u16,
    elapsed: std::time::Duration,
) -> StorageResult<i64> {
    tokio::task::spawn_blocking(move || -> StorageResult<i64> {
        let page_id = gateway.upsert_page(&url)?;
        gateway.insert_request(page_id, status, elapsed)?;
        Ok(page_id)
    })
    .await
    .map_err(|e| StorageError::Task(e.to_string()))?
}
