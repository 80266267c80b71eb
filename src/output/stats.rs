//! Runtime statistics for crawl pipeline stages
//!
//! Every stage keeps four independent atomic counters. They are read while
//! being written, so a snapshot is only approximately consistent: the average
//! duration may briefly lag behind the success count.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters for a single pipeline stage
#[derive(Debug, Default)]
pub struct StageStatistic {
    in_progress: AtomicUsize,
    attempts: AtomicU64,
    successes: AtomicU64,
    total_millis: AtomicU64,
}

/// Scoped handle returned by [`StageStatistic::start`]
///
/// Dropping the handle marks the stage as no longer in progress, whether or
/// not it succeeded.
#[must_use = "the stage stops being in progress as soon as the guard is dropped"]
pub struct StageGuard<'a> {
    stage: &'a StageStatistic,
    started: Instant,
}

impl StageGuard<'_> {
    /// Records a success with the elapsed time and releases the guard
    pub fn succeed(self) {
        self.stage.success(self.started.elapsed());
    }
}

impl Drop for StageGuard<'_> {
    fn drop(&mut self) {
        self.stage.in_progress.fetch_sub(1, Ordering::Relaxed);
    }
}

impl StageStatistic {
    /// Marks the start of one execution of this stage
    pub fn start(&self) -> StageGuard<'_> {
        self.in_progress.fetch_add(1, Ordering::Relaxed);
        self.attempts.fetch_add(1, Ordering::Relaxed);
        StageGuard {
            stage: self,
            started: Instant::now(),
        }
    }

    /// Records a successful execution that took `elapsed`
    pub fn success(&self, elapsed: Duration) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.total_millis
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn in_progress(&self) -> usize {
        self.in_progress.load(Ordering::Relaxed)
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    pub fn total_millis(&self) -> u64 {
        self.total_millis.load(Ordering::Relaxed)
    }

    /// Average duration of successful executions, 0 before the first success
    pub fn average_millis(&self) -> u64 {
        match self.successes() {
            0 => 0,
            n => self.total_millis() / n,
        }
    }

    pub fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            in_progress: self.in_progress(),
            attempts: self.attempts(),
            successes: self.successes(),
            average_millis: self.average_millis(),
        }
    }
}

/// Point-in-time reading of one stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSnapshot {
    pub in_progress: usize,
    pub attempts: u64,
    pub successes: u64,
    pub average_millis: u64,
}

/// Statistics for every stage of the harvesting pipeline
#[derive(Debug)]
pub struct RuntimeStatistics {
    started: Instant,
    /// Reading a page of websites from the input store
    pub data_request: StageStatistic,
    /// A whole root crawl, including every descendant page and the callback
    pub website: StageStatistic,
    /// A single page including its children's join
    pub page: StageStatistic,
    /// The HTTP request and body download
    pub fetch: StageStatistic,
    /// HTML parsing
    pub parse: StageStatistic,
    /// E-mail extraction and link selection
    pub extract: StageStatistic,
    /// The per-root completion hook
    pub callback: StageStatistic,
}

impl Default for RuntimeStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeStatistics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            data_request: StageStatistic::default(),
            website: StageStatistic::default(),
            page: StageStatistic::default(),
            fetch: StageStatistic::default(),
            parse: StageStatistic::default(),
            extract: StageStatistic::default(),
            callback: StageStatistic::default(),
        }
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            elapsed: self.started.elapsed(),
            data_request: self.data_request.snapshot(),
            website: self.website.snapshot(),
            page: self.page.snapshot(),
            fetch: self.fetch.snapshot(),
            parse: self.parse.snapshot(),
            extract: self.extract.snapshot(),
            callback: self.callback.snapshot(),
        }
    }
}

/// Copyable reading of all stages
#[derive(Debug, Clone, Copy)]
pub struct StatisticsSnapshot {
    pub elapsed: Duration,
    pub data_request: StageSnapshot,
    pub website: StageSnapshot,
    pub page: StageSnapshot,
    pub fetch: StageSnapshot,
    pub parse: StageSnapshot,
    pub extract: StageSnapshot,
    pub callback: StageSnapshot,
}

impl fmt::Display for StatisticsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed.as_secs();
        write!(
            f,
            "Time: {:02}:{:02}. Data: {}-{} ms. Websites: {}/{}-{} ms. Pages: {}/{}-{} ms. \
             Requests: {}-{} ms. Parsings: {}-{} ms. Extractions: {}-{} ms. Callbacks: {}/{}-{} ms.",
            secs / 60,
            secs % 60,
            self.data_request.in_progress,
            self.data_request.average_millis,
            self.website.in_progress,
            self.website.attempts,
            self.website.average_millis,
            self.page.in_progress,
            self.page.attempts,
            self.page.average_millis,
            self.fetch.in_progress,
            self.fetch.average_millis,
            self.parse.in_progress,
            self.parse.average_millis,
            self.extract.in_progress,
            self.extract.average_millis,
            self.callback.in_progress,
            self.callback.attempts,
            self.callback.average_millis,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_tracks_in_progress() {
        let stage = StageStatistic::default();

        let first = stage.start();
        let second = stage.start();
        assert_eq!(stage.in_progress(), 2);
        assert_eq!(stage.attempts(), 2);

        drop(first);
        assert_eq!(stage.in_progress(), 1);

        second.succeed();
        assert_eq!(stage.in_progress(), 0);
        assert_eq!(stage.attempts(), 2);
        assert_eq!(stage.successes(), 1);
    }

    #[test]
    fn test_average_without_successes_is_zero() {
        let stage = StageStatistic::default();
        let _guard = stage.start();
        assert_eq!(stage.average_millis(), 0);
    }

    #[test]
    fn test_average_duration() {
        let stage = StageStatistic::default();
        stage.success(Duration::from_millis(100));
        stage.success(Duration::from_millis(300));

        assert_eq!(stage.successes(), 2);
        assert_eq!(stage.total_millis(), 400);
        assert_eq!(stage.average_millis(), 200);
    }

    #[test]
    fn test_concurrent_updates() {
        let stage = std::sync::Arc::new(StageStatistic::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stage = stage.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stage.start().succeed();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stage.attempts(), 8000);
        assert_eq!(stage.successes(), 8000);
        assert_eq!(stage.in_progress(), 0);
    }

    #[test]
    fn test_snapshot_display() {
        let stats = RuntimeStatistics::new();
        stats.page.success(Duration::from_millis(42));
        let _guard = stats.website.start();

        let line = stats.snapshot().to_string();
        assert!(line.starts_with("Time: 00:00."));
        assert!(line.contains("Websites: 1/1-0 ms."));
        assert!(line.contains("Pages: 0/0-42 ms."));
    }
}
