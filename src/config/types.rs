use crate::crawler::DEFAULT_PRIORITY_KEYWORDS;
use serde::Deserialize;

/// Main configuration structure for Email Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub database: DatabaseConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of runtime worker threads (0 selects the default parallelism)
    #[serde(default)]
    pub workers: usize,

    /// Maximum number of child pages spawned from a single page
    #[serde(rename = "max-links-per-page")]
    pub max_links_per_page: u32,

    /// Maximum number of link hops from the root URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of HTTP requests in flight across all roots
    #[serde(rename = "max-concurrent-fetches", default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: u32,

    /// Maximum number of roots crawled at once (0 means one per worker)
    #[serde(rename = "max-active-roots", default)]
    pub max_active_roots: usize,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Hosts never followed (exact, or `*.example.com` wildcards)
    #[serde(rename = "skip-domains", default)]
    pub skip_domains: Vec<String>,

    /// Regular expressions; a matching e-mail is dropped from results
    #[serde(rename = "skip-email-patterns", default)]
    pub skip_email_patterns: Vec<String>,

    /// Substrings that move a link to the front of the follow order
    #[serde(rename = "priority-keywords", default = "default_priority_keywords")]
    pub priority_keywords: Vec<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Location of the SQLite database holding websites and results
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Table the root websites are read from
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    pub table: String,

    #[serde(rename = "id-field")]
    pub id_field: String,

    #[serde(rename = "url-field")]
    pub url_field: String,
}

/// Table the harvested e-mails are written to
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub table: String,

    #[serde(rename = "id-field")]
    pub id_field: String,

    #[serde(rename = "emails-field")]
    pub emails_field: String,

    /// Maximum length of the stored comma-separated e-mail list
    #[serde(rename = "emails-field-length")]
    pub emails_field_length: usize,
}

/// Batch processing settings
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    /// Number of websites read from the input table per page
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Row offset of the first page
    #[serde(rename = "start-offset", default)]
    pub start_offset: u32,

    /// Interval between statistics log lines (0 disables the reporter)
    #[serde(rename = "report-interval-ms", default = "default_report_interval_ms")]
    pub report_interval_ms: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            start_offset: 0,
            report_interval_ms: default_report_interval_ms(),
        }
    }
}

fn default_max_concurrent_fetches() -> u32 {
    32
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_priority_keywords() -> Vec<String> {
    DEFAULT_PRIORITY_KEYWORDS
        .iter()
        .map(|keyword| keyword.to_string())
        .collect()
}

fn default_batch_size() -> u32 {
    100
}

fn default_report_interval_ms() -> u64 {
    1000
}
