//! HTML parser for extracting links and e-mail addresses
//!
//! This module handles parsing HTML content to extract:
//! - Raw `href` values of `<a>` tags, in document order
//! - E-mail addresses inside `mailto:` hrefs
//! - E-mail addresses in the visible text of every element
//!
//! Parsing is synchronous and returns owned data only, so nothing from the
//! parsed document is held across an await point.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

/// E-mail address pattern, matched case-insensitively
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,4}\b").expect("valid e-mail regex")
});

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid anchor selector"));

static ELEMENT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("*").expect("valid universal selector"));

/// Elements whose text is never shown to a reader
const NON_TEXT_ELEMENTS: &[&str] = &["script", "style", "template"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Non-mailto hrefs exactly as written, in document order
    pub hrefs: Vec<String>,

    /// Addresses found inside `mailto:` hrefs, in document order
    pub mailto_emails: Vec<String>,

    /// Addresses found in element text, in document order
    pub text_emails: Vec<String>,
}

/// Parses HTML content and extracts hrefs and e-mail addresses
///
/// # Extraction Rules
///
/// - Every `<a href>` whose value starts with `mailto:` (any case) is scanned
///   for addresses and never returned as a link.
/// - Every other non-empty href is returned trimmed but otherwise untouched;
///   resolution against the crawl root happens later.
/// - Each element contributes only its own text nodes, so an address nested
///   in several elements is reported once per occurrence, not once per
///   ancestor. Text inside `<script>`, `<style>` and `<template>` is ignored.
///
/// # Example
///
/// ```
/// use email_harvester::crawler::parse_html;
///
/// let html = r#"<p>Write to a@ex.com</p><a href="mailto:b@ex.com">mail</a><a href="/about">About</a>"#;
/// let parsed = parse_html(html);
/// assert_eq!(parsed.hrefs, vec!["/about"]);
/// assert_eq!(parsed.mailto_emails, vec!["b@ex.com"]);
/// assert_eq!(parsed.text_emails, vec!["a@ex.com"]);
/// ```
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);
    let mut parsed = ParsedPage::default();

    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();

        if is_mailto(href) {
            parsed.mailto_emails.extend(extract_emails(href));
        } else if !href.is_empty() {
            parsed.hrefs.push(href.to_string());
        }
    }

    for element in document.select(&ELEMENT_SELECTOR) {
        if NON_TEXT_ELEMENTS.contains(&element.value().name()) {
            continue;
        }
        let text = own_text(&element);
        if !text.is_empty() {
            parsed.text_emails.extend(extract_emails(&text));
        }
    }

    parsed
}

/// Returns every e-mail address in `text`, in order of appearance
pub fn extract_emails(text: &str) -> Vec<String> {
    EMAIL_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn is_mailto(href: &str) -> bool {
    href.get(..7)
        .map(|scheme| scheme.eq_ignore_ascii_case("mailto:"))
        .unwrap_or(false)
}

/// Concatenates the direct text children of an element
fn own_text(element: &ElementRef) -> String {
    let mut text = String::new();
    for child in element.children() {
        if let Node::Text(chunk) = child.value() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(chunk.trim());
        }
    }
    text.trim().to_string()
}
