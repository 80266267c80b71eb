use crate::url::domain::{same_host, same_host_family};
use crate::UrlError;
use url::{ParseError, Url};

/// The shapes of href a page task is willing to follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `//host/path` - host from the href, scheme from the root
    ProtocolRelative,
    /// `/path` - resolved against the root's scheme and host
    RootRelative,
    /// `https://root-host/path` - absolute URL on the root's host
    SameHostAbsolute,
    /// `root-host/path` - schemeless text starting with the root host
    BareHost,
}

/// Classifies an href against the root of the crawl
///
/// Returns `None` for hrefs that are never followed: page-relative paths,
/// fragments, queries, non-HTTP schemes and absolute links to other hosts.
///
/// # Examples
///
/// ```
/// use email_harvester::url::{classify_link, LinkKind};
/// use url::Url;
///
/// let root = Url::parse("https://example.com/").unwrap();
/// assert_eq!(classify_link(&root, "/contact"), Some(LinkKind::RootRelative));
/// assert_eq!(classify_link(&root, "//cdn.example.com/x"), Some(LinkKind::ProtocolRelative));
/// assert_eq!(classify_link(&root, "https://example.com/about"), Some(LinkKind::SameHostAbsolute));
/// assert_eq!(classify_link(&root, "example.com/team"), Some(LinkKind::BareHost));
/// assert_eq!(classify_link(&root, "https://other.org/"), None);
/// assert_eq!(classify_link(&root, "team.html"), None);
/// ```
pub fn classify_link(root: &Url, href: &str) -> Option<LinkKind> {
    let href = href.trim();
    let root_host = root.host_str()?;

    if href.starts_with("//") {
        return Some(LinkKind::ProtocolRelative);
    }

    if href.starts_with('/') {
        return Some(LinkKind::RootRelative);
    }

    if href
        .get(..root_host.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(root_host))
    {
        return Some(LinkKind::BareHost);
    }

    match Url::parse(href) {
        Ok(url)
            if (url.scheme() == "http" || url.scheme() == "https")
                && url.host_str().is_some_and(|host| same_host(host, root_host)) =>
        {
            Some(LinkKind::SameHostAbsolute)
        }
        _ => None,
    }
}

/// Returns true when a resolved link stays within the root's site
///
/// Protocol-relative links may point at the root host or any subdomain of
/// it. Every other kind must land on the root host itself. Ports are not
/// compared.
///
/// # Examples
///
/// ```
/// use email_harvester::url::{is_in_scope, LinkKind};
/// use url::Url;
///
/// let root = Url::parse("https://ex.com/").unwrap();
/// let cdn = Url::parse("https://cdn.ex.com/x").unwrap();
/// let share = Url::parse("https://twitter.com/share").unwrap();
/// assert!(is_in_scope(&root, LinkKind::ProtocolRelative, &cdn));
/// assert!(!is_in_scope(&root, LinkKind::ProtocolRelative, &share));
/// ```
pub fn is_in_scope(root: &Url, kind: LinkKind, url: &Url) -> bool {
    let (Some(host), Some(root_host)) = (url.host_str(), root.host_str()) else {
        return false;
    };

    match kind {
        LinkKind::ProtocolRelative => same_host_family(host, root_host),
        LinkKind::RootRelative | LinkKind::SameHostAbsolute | LinkKind::BareHost => {
            same_host(host, root_host)
        }
    }
}

/// Resolves an href against the root URL of a crawl
///
/// Handles absolute URLs, root-relative paths (`/path`), protocol-relative
/// references (`//host/path`) and schemeless `host/path` strings. The
/// fragment is dropped from the result.
///
/// # Errors
///
/// Returns `UrlError::MalformedLink` when the href cannot be turned into an
/// HTTP(S) URL with a host. Callers treat this as "skip the link".
///
/// # Examples
///
/// ```
/// use email_harvester::url::resolve_link;
/// use url::Url;
///
/// let root = Url::parse("https://ex.com/a/b").unwrap();
/// assert_eq!(resolve_link(&root, "/path").unwrap().as_str(), "https://ex.com/path");
/// assert_eq!(resolve_link(&root, "//cdn.ex.com/x").unwrap().as_str(), "https://cdn.ex.com/x");
/// ```
pub fn resolve_link(root: &Url, href: &str) -> Result<Url, UrlError> {
    let href = href.trim();
    let malformed = |reason: String| UrlError::MalformedLink {
        href: href.to_string(),
        reason,
    };

    let parsed = if href.starts_with("//") {
        Url::parse(&format!("{}:{}", root.scheme(), href))
    } else if href.starts_with('/') {
        root.join(href)
    } else {
        match Url::parse(href) {
            Err(ParseError::RelativeUrlWithoutBase) => {
                Url::parse(&format!("{}://{}", root.scheme(), href))
            }
            other => other,
        }
    };

    let mut url = parsed.map_err(|e| malformed(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(malformed(format!("unsupported scheme '{}'", url.scheme())));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(malformed("missing host".to_string()));
    }

    url.set_fragment(None);
    Ok(url)
}
