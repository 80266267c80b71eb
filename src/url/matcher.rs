/// Checks if a host matches a skip-domain pattern
///
/// Two kinds of pattern are supported, both compared case-insensitively:
/// 1. Exact: "example.com" matches only "example.com"
/// 2. Wildcard: "*.example.com" matches "example.com" itself and any
///    subdomain such as "blog.example.com" or "api.v2.example.com"
///
/// # Examples
///
/// ```
/// use email_harvester::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "EXAMPLE.com"));
/// assert!(!matches_wildcard("example.com", "blog.example.com"));
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "myexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    let candidate = candidate.to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();

    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Returns true when `host` matches any of the skip-domain patterns
pub fn is_skipped_host(host: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| matches_wildcard(pattern, host))
}
