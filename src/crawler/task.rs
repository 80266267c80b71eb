//! Page tasks: the recursive unit of crawl work
//!
//! A page task fetches one URL, parses it, records the addresses it finds,
//! spawns child tasks for a bounded number of unvisited same-site links and
//! finally joins those children in spawn order. The whole subtree of a root
//! shares one [`VisitedSet`].
//!
//! Failures never escape a page task. A page that cannot be fetched or
//! parsed contributes an empty set, and a child that panicked is treated
//! the same way.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{fetch_url, FetchResult};
use crate::crawler::parser::{parse_html, ParsedPage};
use crate::crawler::scheduler::Scheduler;
use crate::crawler::visited::VisitedSet;
use crate::crawler::DEFAULT_PRIORITY_KEYWORDS;
use crate::output::stats::RuntimeStatistics;
use crate::url::{
    classify_link, is_in_scope, is_skipped_host, normalize_url, prioritize_links, resolve_link,
};
use crate::{ConfigError, HarvestError};
use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexSet;
use regex::Regex;
use reqwest::Client;
use std::sync::Arc;
use tokio::task::JoinHandle;
use url::Url;

/// Ordered, duplicate-free collection of addresses in discovery order
pub type EmailSet = IndexSet<String>;

/// A root crawl target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Website {
    /// Identifier of the row the website came from, if any
    pub id: Option<String>,
    /// Absolute http(s) URL where the crawl starts
    pub url: Url,
}

impl Website {
    pub fn new(id: Option<String>, url: Url) -> Self {
        Self { id, url }
    }

    /// Builds a website from a raw URL string
    ///
    /// # Errors
    ///
    /// Returns `HarvestError::MalformedRootUrl` if the string is not an
    /// absolute http(s) URL with a host.
    pub fn parse(id: Option<String>, raw: &str) -> Result<Self, HarvestError> {
        let url = normalize_url(raw).map_err(|e| HarvestError::MalformedRootUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { id, url })
    }
}

/// Immutable crawl limits and filters shared by every task
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum number of children a single page may spawn
    pub max_links_per_page: usize,
    /// Maximum depth below the root; the root is depth 0
    pub max_depth: u32,
    /// Wildcard host patterns that are never followed
    pub skip_domains: Vec<String>,
    /// Addresses matching any of these in full are dropped
    pub skip_email_patterns: Vec<Regex>,
    /// Lowercase substrings that move a link to the front of the queue
    pub priority_keywords: Vec<String>,
}

impl CrawlConfig {
    pub fn new(max_links_per_page: usize, max_depth: u32) -> Self {
        Self {
            max_links_per_page,
            max_depth,
            skip_domains: Vec::new(),
            skip_email_patterns: Vec::new(),
            priority_keywords: DEFAULT_PRIORITY_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }

    pub fn with_skip_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the skip-email patterns
    ///
    /// Each pattern must match an entire address to exclude it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPattern` for a pattern that does not
    /// compile.
    pub fn with_skip_email_patterns<I, S>(mut self, patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.skip_email_patterns = patterns
            .into_iter()
            .map(|p| compile_full_match(p.as_ref()))
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    pub fn with_priority_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.priority_keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .collect();
        self
    }

    /// Returns false for addresses matching a skip pattern
    pub fn accepts_email(&self, email: &str) -> bool {
        !self.skip_email_patterns.iter().any(|re| re.is_match(email))
    }
}

impl TryFrom<&CrawlerConfig> for CrawlConfig {
    type Error = ConfigError;

    fn try_from(config: &CrawlerConfig) -> Result<Self, Self::Error> {
        crate::config::validate_crawler_config(config)?;

        CrawlConfig::new(config.max_links_per_page as usize, config.max_depth)
            .with_skip_domains(config.skip_domains.iter().cloned())
            .with_priority_keywords(&config.priority_keywords)
            .with_skip_email_patterns(&config.skip_email_patterns)
    }
}

fn compile_full_match(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| ConfigError::InvalidPattern(format!("{}: {}", pattern, e)))
}

/// State shared by every task of every root
pub(crate) struct CrawlContext {
    pub config: CrawlConfig,
    pub client: Client,
    pub stats: Arc<RuntimeStatistics>,
    pub scheduler: Arc<Scheduler>,
}

/// One page of a root's crawl tree
pub(crate) struct PageTask {
    root: Arc<Url>,
    url: Url,
    depth: u32,
    visited: Arc<VisitedSet>,
    ctx: Arc<CrawlContext>,
}

impl PageTask {
    /// Creates the depth-0 task for a root whose URL is already claimed
    pub fn root(url: Url, visited: Arc<VisitedSet>, ctx: Arc<CrawlContext>) -> Self {
        Self {
            root: Arc::new(url.clone()),
            url,
            depth: 0,
            visited,
            ctx,
        }
    }

    /// Runs the task and its whole subtree
    ///
    /// Boxed because the future spawns further instances of itself.
    pub fn run(self) -> BoxFuture<'static, EmailSet> {
        async move {
            let ctx = self.ctx.clone();
            let guard = ctx.stats.page.start();

            match self.process().await {
                Ok(emails) => {
                    guard.succeed();
                    emails
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    EmailSet::new()
                }
            }
        }
        .boxed()
    }

    async fn process(&self) -> Result<EmailSet, HarvestError> {
        let page = self.fetch_and_parse().await?;
        let config = &self.ctx.config;

        let extract = self.ctx.stats.extract.start();
        let mut emails = EmailSet::new();

        for email in page.mailto_emails {
            self.record(&mut emails, email, config);
        }

        let children = self.spawn_children(page.hrefs);

        for email in page.text_emails {
            self.record(&mut emails, email, config);
        }
        extract.succeed();

        for child in children {
            match child.await {
                Ok(found) => emails.extend(found),
                Err(e) => tracing::warn!("Page task below {} failed: {}", self.url, e),
            }
        }

        tracing::info!("For url {} we got {:?}", self.url, emails);
        Ok(emails)
    }

    async fn fetch_and_parse(&self) -> Result<ParsedPage, HarvestError> {
        let stats = &self.ctx.stats;

        let body = {
            let _permit = self.ctx.scheduler.acquire_fetch().await;
            let fetch = stats.fetch.start();

            match fetch_url(&self.ctx.client, &self.url).await {
                FetchResult::Success {
                    final_url,
                    status_code,
                    body,
                } => {
                    fetch.succeed();
                    tracing::debug!("Fetched {} ({}) via {}", self.url, status_code, final_url);
                    body
                }
                FetchResult::ContentMismatch { content_type } => {
                    fetch.succeed();
                    return Err(HarvestError::HtmlParse {
                        url: self.url.to_string(),
                        message: format!("unsupported content type {}", content_type),
                    });
                }
                FetchResult::NetworkError { error } => {
                    return Err(HarvestError::Fetch {
                        url: self.url.to_string(),
                        message: error,
                    });
                }
            }
        };

        let parse = stats.parse.start();
        let page = parse_html(&body);
        parse.succeed();

        Ok(page)
    }

    fn record(&self, emails: &mut EmailSet, email: String, config: &CrawlConfig) {
        if !config.accepts_email(&email) {
            tracing::debug!("Skipping {} found on {}", email, self.url);
            return;
        }
        if emails.insert(email.clone()) {
            tracing::debug!("Found {} on {}", email, self.url);
        }
    }

    /// Selects links to follow and spawns a task for each, in priority order
    fn spawn_children(&self, mut hrefs: Vec<String>) -> Vec<JoinHandle<EmailSet>> {
        let config = &self.ctx.config;
        let mut children = Vec::new();

        if self.depth >= config.max_depth || config.max_links_per_page == 0 {
            return children;
        }

        prioritize_links(&mut hrefs, &config.priority_keywords);

        for href in hrefs {
            if children.len() >= config.max_links_per_page {
                break;
            }

            let Some(kind) = classify_link(&self.root, &href) else {
                continue;
            };

            let url = match resolve_link(&self.root, &href) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("{} on {}", e, self.url);
                    continue;
                }
            };

            if !is_in_scope(&self.root, kind, &url) {
                tracing::debug!("Ignoring off-site link {} on {}", url, self.url);
                continue;
            }

            if url
                .host_str()
                .map(|host| is_skipped_host(host, &config.skip_domains))
                .unwrap_or(true)
            {
                tracing::debug!("Skipping link {} on {}", url, self.url);
                continue;
            }

            if !self.visited.claim(&url) {
                continue;
            }

            tracing::debug!("Adding task for {:?} link {}", kind, url);
            children.push(self.fork(url));
        }

        children
    }

    fn fork(&self, url: Url) -> JoinHandle<EmailSet> {
        let child = PageTask {
            root: self.root.clone(),
            url,
            depth: self.depth + 1,
            visited: self.visited.clone(),
            ctx: self.ctx.clone(),
        };
        let pending = self.ctx.scheduler.task_started();

        tokio::spawn(async move {
            let _pending = pending;
            child.run().await
        })
    }
}
