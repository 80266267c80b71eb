//! Output formatting for harvested e-mails
//!
//! This module provides:
//! - Joining a root's e-mails into the stored comma-separated form
//! - Truncation at an address boundary when the stored field is limited
//! - Runtime statistics for the crawl pipeline (see [`stats`])

pub mod stats;

use crate::crawler::EmailSet;

/// Joins e-mails into a comma-separated string no longer than `max_len` bytes
///
/// When the joined string is too long it is cut at the last comma at or
/// before `max_len`, so an address is never split. Returns `None` when there
/// is nothing to store: an empty set, or a first address that alone exceeds
/// the limit.
///
/// # Examples
///
/// ```
/// use email_harvester::crawler::EmailSet;
/// use email_harvester::output::format_emails;
///
/// let emails: EmailSet = ["a@ex.com", "bb@ex.com", "ccc@ex.com"]
///     .into_iter()
///     .map(String::from)
///     .collect();
///
/// assert_eq!(format_emails(&emails, 20).as_deref(), Some("a@ex.com,bb@ex.com"));
/// assert_eq!(format_emails(&emails, 100).as_deref(), Some("a@ex.com,bb@ex.com,ccc@ex.com"));
/// ```
pub fn format_emails(emails: &EmailSet, max_len: usize) -> Option<String> {
    let joined = emails
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",");

    if joined.is_empty() {
        return None;
    }

    if joined.len() <= max_len {
        return Some(joined);
    }

    tracing::warn!(
        "E-mail list is longer than {} bytes and will be truncated: {}",
        max_len,
        joined
    );

    joined.as_bytes()[..=max_len]
        .iter()
        .rposition(|&b| b == b',')
        .filter(|&cut| cut > 0)
        .map(|cut| joined[..cut].to_string())
}
