/// Returns true when two hosts name the same site, ignoring case and a
/// leading `www.` on either side
pub fn same_host(a: &str, b: &str) -> bool {
    strip_www(&a.to_ascii_lowercase()) == strip_www(&b.to_ascii_lowercase())
}

/// Returns true when `host` is the root host or one of its subdomains
///
/// Case and a leading `www.` are ignored on both sides, as in [`same_host`].
///
/// # Examples
///
/// ```
/// use email_harvester::url::same_host_family;
///
/// assert!(same_host_family("cdn.example.com", "www.example.com"));
/// assert!(!same_host_family("example.com.evil.org", "example.com"));
/// ```
pub fn same_host_family(host: &str, root: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let root = root.to_ascii_lowercase();
    let (host, root) = (strip_www(&host), strip_www(&root));

    host == root
        || host
            .strip_suffix(root)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
