//! Crawl coordinator - entry point for submitting root websites
//!
//! The coordinator owns everything shared between roots: the HTTP client,
//! the crawl limits, the scheduler and the runtime statistics. Each submitted
//! root gets its own [`VisitedSet`] and runs as a tree of page tasks on the
//! tokio runtime the coordinator was created on.
//!
//! Every submitted root triggers its completion hook exactly once, after the
//! whole subtree has finished, even when nothing was found.

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::fetcher::build_http_client;
use crate::crawler::scheduler::{PoolState, Scheduler, TaskGuard};
use crate::crawler::task::{CrawlConfig, CrawlContext, EmailSet, PageTask, Website};
use crate::crawler::visited::VisitedSet;
use crate::output::stats::RuntimeStatistics;
use crate::HarvestError;
use indexmap::IndexMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;

/// Receives each root's result once its crawl has finished
///
/// Implemented for any `Fn(&Website, &EmailSet)` closure.
pub trait CompletionSink: Send + Sync {
    fn on_complete(&self, website: &Website, emails: &EmailSet);
}

impl<F> CompletionSink for F
where
    F: Fn(&Website, &EmailSet) + Send + Sync,
{
    fn on_complete(&self, website: &Website, emails: &EmailSet) {
        self(website, emails)
    }
}

/// Number of worker threads used when the configuration leaves it at 0
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Builds the multi-threaded work-stealing runtime the crawl runs on
///
/// # Arguments
///
/// * `workers` - Number of worker threads, 0 for one per available core
pub fn build_runtime(workers: usize) -> std::io::Result<Runtime> {
    let workers = if workers == 0 { default_workers() } else { workers };

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .thread_name("harvest-worker")
        .enable_all()
        .build()
}

/// Coordinator accepts root websites and drives their crawls
pub struct Coordinator {
    ctx: Arc<CrawlContext>,
    handle: Handle,
    workers: usize,
    shut_down: AtomicBool,
}

impl Coordinator {
    /// Creates a coordinator from the crawler and user-agent configuration
    ///
    /// Must be called from within a tokio runtime; tasks are spawned on that
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the HTTP client
    /// cannot be built, or no runtime is running.
    pub fn new(crawler: &CrawlerConfig, user_agent: &UserAgentConfig) -> Result<Self, HarvestError> {
        let config = CrawlConfig::try_from(crawler)?;
        let client = build_http_client(user_agent, Duration::from_secs(crawler.request_timeout_secs))?;

        let workers = if crawler.workers == 0 {
            default_workers()
        } else {
            crawler.workers
        };
        let max_active_roots = if crawler.max_active_roots == 0 {
            workers
        } else {
            crawler.max_active_roots
        };

        let scheduler = Scheduler::new(crawler.max_concurrent_fetches as usize, max_active_roots);

        Self::with_parts(config, client, scheduler, workers)
    }

    /// Creates a coordinator from already-built parts
    pub fn with_parts(
        config: CrawlConfig,
        client: reqwest::Client,
        scheduler: Scheduler,
        workers: usize,
    ) -> Result<Self, HarvestError> {
        let handle = Handle::try_current().map_err(|e| HarvestError::NoRuntime(e.to_string()))?;

        tracing::info!(
            "Coordinator ready: {} workers, {} links per page, depth {}",
            workers,
            config.max_links_per_page,
            config.max_depth
        );

        Ok(Self {
            ctx: Arc::new(CrawlContext {
                config,
                client,
                stats: Arc::new(RuntimeStatistics::new()),
                scheduler: Arc::new(scheduler),
            }),
            handle,
            workers,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Worker count the pool was sized for
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn statistics(&self) -> Arc<RuntimeStatistics> {
        self.ctx.stats.clone()
    }

    pub fn scheduler(&self) -> Arc<Scheduler> {
        self.ctx.scheduler.clone()
    }

    pub fn pool_state(&self) -> PoolState {
        self.ctx.scheduler.state()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Submits a root whose result is only logged
    pub fn submit(&self, website: Website) -> Result<(), HarvestError> {
        self.spawn_root(website, None).map(drop)
    }

    /// Submits a root and returns immediately
    ///
    /// `sink` is called exactly once, after the root's whole subtree has
    /// finished.
    ///
    /// # Errors
    ///
    /// Returns `HarvestError::ShutDown` after [`Coordinator::shutdown`].
    pub fn submit_with(
        &self,
        website: Website,
        sink: Arc<dyn CompletionSink>,
    ) -> Result<(), HarvestError> {
        self.spawn_root(website, Some(sink)).map(drop)
    }

    /// Crawls one root and returns its e-mails
    pub async fn crawl(&self, website: Website) -> Result<EmailSet, HarvestError> {
        let handle = self.spawn_root(website, None)?;
        Ok(join_root(handle).await)
    }

    /// Crawls all roots concurrently and returns their e-mails by URL
    ///
    /// Malformed URLs are logged and left out of the result. Results are in
    /// the order the URLs were given; a repeated URL is crawled once.
    pub async fn crawl_batch<S: AsRef<str>>(
        &self,
        domains: &[S],
    ) -> Result<IndexMap<String, EmailSet>, HarvestError> {
        let mut handles = IndexMap::new();

        for raw in domains {
            let raw = raw.as_ref();
            if handles.contains_key(raw) {
                continue;
            }
            match Website::parse(None, raw) {
                Ok(website) => {
                    handles.insert(raw.to_string(), self.spawn_root(website, None)?);
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }

        let mut results = IndexMap::with_capacity(handles.len());
        for (raw, handle) in handles {
            results.insert(raw, join_root(handle).await);
        }

        Ok(results)
    }

    /// Waits until every submitted root has finished
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub async fn await_idle(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.ctx.scheduler.wait_idle())
            .await
            .is_ok()
    }

    /// Waits until fewer than `n` roots are waiting for admission
    pub async fn await_queue_below(&self, n: usize) {
        self.ctx.scheduler.wait_queue_below(n).await
    }

    /// Stops accepting new roots; running crawls are unaffected
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            tracing::info!("Coordinator shut down. {}", self.ctx.scheduler.state());
        }
    }

    fn spawn_root(
        &self,
        website: Website,
        sink: Option<Arc<dyn CompletionSink>>,
    ) -> Result<JoinHandle<EmailSet>, HarvestError> {
        if self.is_shut_down() {
            return Err(HarvestError::ShutDown);
        }

        let scheduler = &self.ctx.scheduler;
        let pending = scheduler.task_started();
        scheduler.root_queued();

        let ctx = self.ctx.clone();
        Ok(self
            .handle
            .spawn(crawl_root(ctx, website, sink, pending)))
    }
}

async fn join_root(handle: JoinHandle<EmailSet>) -> EmailSet {
    match handle.await {
        Ok(emails) => emails,
        Err(e) => {
            tracing::error!("Root crawl failed: {}", e);
            EmailSet::new()
        }
    }
}

async fn crawl_root(
    ctx: Arc<CrawlContext>,
    website: Website,
    sink: Option<Arc<dyn CompletionSink>>,
    _pending: TaskGuard,
) -> EmailSet {
    let _admission = ctx.scheduler.admit_root().await;
    let stats = ctx.stats.clone();
    let website_stage = stats.website.start();

    tracing::debug!("Crawling root {}", website.url);

    let visited = Arc::new(VisitedSet::new());
    visited.claim(&website.url);

    let root = PageTask::root(website.url.clone(), visited, ctx.clone());
    let root_pending = ctx.scheduler.task_started();
    let emails = join_root(tokio::spawn(async move {
        let _pending = root_pending;
        root.run().await
    }))
    .await;

    let callback = stats.callback.start();
    match &sink {
        Some(sink) => sink.on_complete(&website, &emails),
        None => tracing::info!("Finished {}: {:?}", website.url, emails),
    }
    callback.succeed();

    website_stage.succeed();
    emails
}
