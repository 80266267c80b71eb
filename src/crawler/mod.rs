//! Crawler module for bounded e-mail harvesting
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching without retries
//! - HTML parsing and e-mail extraction
//! - Recursive page tasks bounded by depth and links per page
//! - Fetch and root admission limits
//! - Root submission, completion hooks and the batch driver

mod batch;
mod coordinator;
mod fetcher;
mod parser;
mod scheduler;
mod task;
mod visited;

pub use batch::{run_batch, run_batch_with_storage, BatchSummary};
pub use coordinator::{build_runtime, default_workers, CompletionSink, Coordinator};
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use parser::{extract_emails, parse_html, ParsedPage};
pub use scheduler::{PoolState, Scheduler};
pub use task::{CrawlConfig, EmailSet, Website};
pub use visited::VisitedSet;

/// Link keywords followed first when none are configured
pub const DEFAULT_PRIORITY_KEYWORDS: &[&str] = &["contact", "email", "about"];
