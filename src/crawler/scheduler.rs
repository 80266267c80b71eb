//! Scheduler for pool bookkeeping and concurrency limits
//!
//! This module handles:
//! - Global concurrency limiting of HTTP fetches via a semaphore
//! - Admission of roots, so only a bounded number are crawled at once
//! - Counting pending tasks, queued roots and active roots
//! - Waking waiters when those counts change
//!
//! Counts live in a `watch` channel. Every change notifies waiters, so
//! [`Scheduler::wait_idle`] and [`Scheduler::wait_queue_below`] never poll.

use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore, SemaphorePermit};

/// Point-in-time view of the task pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolState {
    /// Page tasks and root tasks submitted but not yet finished
    pub pending_tasks: usize,
    /// Roots waiting for admission
    pub queued_roots: usize,
    /// Roots currently being crawled
    pub active_roots: usize,
}

impl PoolState {
    pub fn is_idle(&self) -> bool {
        self.pending_tasks == 0
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pool: {} pending, {} queued roots, {} active roots",
            self.pending_tasks, self.queued_roots, self.active_roots
        )
    }
}

/// Scheduler shares fetch capacity and tracks the pool's progress
///
/// The scheduler coordinates:
/// - Global concurrency limits (max HTTP requests in flight)
/// - Root admission (max roots crawled at once)
/// - Task accounting used by idle and backpressure waits
pub struct Scheduler {
    /// Global semaphore for limiting concurrent fetches
    fetch_semaphore: Semaphore,

    /// Semaphore admitting roots into the pool
    root_semaphore: Arc<Semaphore>,

    /// Current pool counts
    state: watch::Sender<PoolState>,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `max_concurrent_fetches` - HTTP requests allowed in flight at once
    /// * `max_active_roots` - Roots allowed to crawl at once
    pub fn new(max_concurrent_fetches: usize, max_active_roots: usize) -> Self {
        let (state, _) = watch::channel(PoolState::default());

        Self {
            fetch_semaphore: Semaphore::new(max_concurrent_fetches.max(1)),
            root_semaphore: Arc::new(Semaphore::new(max_active_roots.max(1))),
            state,
        }
    }

    /// Current pool counts
    pub fn state(&self) -> PoolState {
        *self.state.borrow()
    }

    /// Waits for a fetch slot
    ///
    /// The slot is released when the returned permit is dropped. `None` is
    /// only returned if the semaphore was closed, which never happens while
    /// the scheduler is alive.
    pub async fn acquire_fetch(&self) -> Option<SemaphorePermit<'_>> {
        self.fetch_semaphore.acquire().await.ok()
    }

    /// Counts a newly submitted task as pending until the guard is dropped
    pub fn task_started(self: &Arc<Self>) -> TaskGuard {
        self.state.send_modify(|s| s.pending_tasks += 1);
        TaskGuard {
            scheduler: self.clone(),
        }
    }

    /// Counts a root as queued until it is admitted
    pub fn root_queued(&self) {
        self.state.send_modify(|s| s.queued_roots += 1);
    }

    /// Waits until a root may start crawling
    ///
    /// The root must have been counted with [`Scheduler::root_queued`]. It
    /// stays active until the returned permit is dropped.
    pub async fn admit_root(self: &Arc<Self>) -> RootPermit {
        let permit = self.root_semaphore.clone().acquire_owned().await.ok();

        self.state.send_modify(|s| {
            s.queued_roots = s.queued_roots.saturating_sub(1);
            s.active_roots += 1;
        });

        RootPermit {
            scheduler: self.clone(),
            _permit: permit,
        }
    }

    /// Waits until no task is pending
    pub async fn wait_idle(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(PoolState::is_idle).await;
    }

    /// Waits until fewer than `n` roots are queued for admission
    ///
    /// A bound of 0 is treated as 1, since no queue can hold fewer than
    /// zero roots.
    pub async fn wait_queue_below(&self, n: usize) {
        let n = n.max(1);
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| s.queued_roots < n).await;
    }
}

/// Marks one task as pending while alive
#[must_use = "the task stops being pending as soon as the guard is dropped"]
pub struct TaskGuard {
    scheduler: Arc<Scheduler>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.scheduler
            .state
            .send_modify(|s| s.pending_tasks = s.pending_tasks.saturating_sub(1));
    }
}

/// Marks one root as active while alive
pub struct RootPermit {
    scheduler: Arc<Scheduler>,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Drop for RootPermit {
    fn drop(&mut self) {
        self.scheduler
            .state
            .send_modify(|s| s.active_roots = s.active_roots.saturating_sub(1));
    }
}
