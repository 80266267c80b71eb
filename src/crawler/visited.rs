//! Per-root set of claimed URLs
//!
//! One `VisitedSet` is created for every root crawl and shared by reference
//! with each page task the root spawns. Its only mutating operation is
//! [`VisitedSet::claim`], an atomic insert-if-absent keyed by the URL's
//! dedup key, so racing siblings can never both fetch the same page.

use crate::url::dedup_key;
use dashmap::DashSet;
use url::Url;

#[derive(Debug, Default)]
pub struct VisitedSet {
    claimed: DashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a URL for the calling task
    ///
    /// Returns `true` exactly once per dedup key, no matter how many tasks
    /// call it concurrently; every later call returns `false`.
    pub fn claim(&self, url: &Url) -> bool {
        self.claimed.insert(dedup_key(url))
    }

    /// Returns true if the URL (or an equivalent one) has been claimed
    pub fn contains(&self, url: &Url) -> bool {
        self.claimed.contains(&dedup_key(url))
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}
