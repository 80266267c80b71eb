//! URL handling module for Email Harvester
//!
//! This module provides href classification and resolution against a crawl
//! root, link prioritization, dedup-key normalization and skip-domain
//! wildcard matching. Everything here is pure and stateless.

mod domain;
mod matcher;
mod normalize;
mod priority;
mod resolve;

pub use domain::{same_host, same_host_family};
pub use matcher::{is_skipped_host, matches_wildcard};
pub use normalize::{dedup_key, normalize_url};
pub use priority::{is_priority_link, prioritize_links};
pub use resolve::{classify_link, is_in_scope, resolve_link, LinkKind};
