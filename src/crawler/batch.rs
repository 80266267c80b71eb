//! Batch driver: crawls every website of the input table
//!
//! Websites are read in pages of `batch-size` rows. Before each page is
//! submitted the driver waits until the coordinator's admission queue is
//! shorter than the worker count, so memory stays bounded no matter how
//! large the table is. Each finished root writes its e-mails back through
//! the completion hook.

use crate::config::Config;
use crate::crawler::coordinator::{CompletionSink, Coordinator};
use crate::crawler::task::{EmailSet, Website};
use crate::output::format_emails;
use crate::output::stats::RuntimeStatistics;
use crate::storage::{open_storage, EmailStore, StorageError, WebsiteSource};
use crate::HarvestError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Totals of one batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Rows read from the input table
    pub websites_read: usize,
    /// Roots submitted to the coordinator
    pub websites_submitted: usize,
    /// Rows skipped because their URL was malformed
    pub malformed: usize,
    /// Rows whose e-mails were written back
    pub results_stored: usize,
}

/// Runs a complete batch crawl
///
/// This is the main entry point for harvesting a database. It will:
/// 1. Open the storage database
/// 2. Create the coordinator on the current runtime
/// 3. Read websites page by page and submit them
/// 4. Store each root's e-mails as soon as its crawl finishes
/// 5. Wait for the pool to drain and log final statistics
///
/// # Arguments
///
/// * `config` - The harvester configuration
///
/// # Returns
///
/// * `Ok(BatchSummary)` - Every website was processed
/// * `Err(HarvestError)` - Storage or setup failed
pub async fn run_batch(config: Config) -> Result<BatchSummary, HarvestError> {
    let storage = Arc::new(Mutex::new(open_storage(&config)?));
    run_batch_with_storage(&config, storage).await
}

/// Runs a batch crawl against an already-open storage
///
/// Websites are read from `storage` and each root's e-mails are written back
/// to it. The table layout in `config` only matters to the storage itself.
pub async fn run_batch_with_storage<S>(
    config: &Config,
    storage: Arc<Mutex<S>>,
) -> Result<BatchSummary, HarvestError>
where
    S: WebsiteSource + EmailStore + Send + 'static,
{
    let coordinator = Coordinator::new(&config.crawler, &config.user_agent)?;
    let stats = coordinator.statistics();
    let processing = &config.processing;

    tracing::info!(
        "Starting batch crawl of {}.{} from offset {}",
        config.input.table,
        config.input.url_field,
        processing.start_offset
    );

    let reporter = spawn_reporter(&coordinator, processing.report_interval_ms);

    let stored = Arc::new(AtomicUsize::new(0));
    let sink: Arc<dyn CompletionSink> = Arc::new(StoringSink {
        storage: storage.clone(),
        max_len: config.output.emails_field_length,
        stored: stored.clone(),
    });

    let mut summary = BatchSummary::default();
    let start_time = Instant::now();
    let batch_size = processing.batch_size;
    let mut offset = u64::from(processing.start_offset);

    loop {
        coordinator.await_queue_below(coordinator.workers()).await;

        let records = {
            let request = stats.data_request.start();
            let records = storage
                .lock()
                .map_err(|_| StorageError::LockPoisoned)?
                .fetch_batch(offset, batch_size)?;
            request.succeed();
            records
        };

        if records.is_empty() {
            tracing::info!("No more websites at offset {}", offset);
            break;
        }

        summary.websites_read += records.len();
        offset += records.len() as u64;

        for record in records {
            match Website::parse(record.id, &record.url) {
                Ok(website) => {
                    coordinator.submit_with(website, sink.clone())?;
                    summary.websites_submitted += 1;
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    summary.malformed += 1;
                }
            }
        }

        tracing::debug!(
            "Submitted {} websites so far. {}",
            summary.websites_submitted,
            coordinator.pool_state()
        );
    }

    while !coordinator.await_idle(Duration::from_secs(60)).await {
        tracing::debug!("Waiting for crawls to finish. {}", coordinator.pool_state());
    }
    coordinator.shutdown();

    if let Some(reporter) = reporter {
        reporter.abort();
    }

    summary.results_stored = stored.load(Ordering::SeqCst);

    tracing::info!("{}", stats.snapshot());
    tracing::info!(
        "Batch completed: {} websites read, {} crawled, {} malformed, {} stored in {:?}",
        summary.websites_read,
        summary.websites_submitted,
        summary.malformed,
        summary.results_stored,
        start_time.elapsed()
    );

    Ok(summary)
}

/// Writes each finished root's e-mails to the output table
struct StoringSink<S> {
    storage: Arc<Mutex<S>>,
    max_len: usize,
    stored: Arc<AtomicUsize>,
}

impl<S: EmailStore + Send> CompletionSink for StoringSink<S> {
    fn on_complete(&self, website: &Website, emails: &EmailSet) {
        let Some(id) = website.id.as_deref() else {
            tracing::warn!("Website {} has no id, results not stored", website.url);
            return;
        };

        let Some(joined) = format_emails(emails, self.max_len) else {
            tracing::debug!("Nothing to store for {}", website.url);
            return;
        };

        let mut storage = match self.storage.lock() {
            Ok(storage) => storage,
            Err(_) => {
                tracing::error!("Storage lock poisoned, results for {} lost", website.url);
                return;
            }
        };

        match storage.update_emails(id, &joined) {
            Ok(0) => tracing::warn!("No output row with id {} for {}", id, website.url),
            Ok(_) => {
                self.stored.fetch_add(1, Ordering::SeqCst);
                tracing::info!("Stored {} e-mails for {}", emails.len(), website.url);
            }
            Err(e) => tracing::error!("Failed to store e-mails for {}: {}", website.url, e),
        }
    }
}

/// Logs statistics and pool state periodically, if an interval is set
fn spawn_reporter(coordinator: &Coordinator, interval_ms: u64) -> Option<JoinHandle<()>> {
    if interval_ms == 0 {
        return None;
    }

    let stats: Arc<RuntimeStatistics> = coordinator.statistics();
    let scheduler = coordinator.scheduler();

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
        interval.tick().await;
        loop {
            interval.tick().await;
            tracing::info!("{} {}", stats.snapshot(), scheduler.state());
        }
    }))
}
