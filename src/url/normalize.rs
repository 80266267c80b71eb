use crate::UrlError;
use url::Url;

/// List of tracking query parameters dropped from dedup keys
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
    "ref",
    "source",
];

/// Parses and normalizes a root URL string
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace and parse; reject if malformed
/// 2. Accept only `http` and `https`
/// 3. Require a host (lowercased by the parser)
/// 4. Remove the fragment
///
/// The result is the URL that will actually be fetched, so the host is kept
/// as written (no `www.` stripping) and the path is left untouched.
///
/// # Examples
///
/// ```
/// use email_harvester::url::normalize_url;
///
/// let url = normalize_url("  https://WWW.Example.COM/contact#form ").unwrap();
/// assert_eq!(url.as_str(), "https://www.example.com/contact");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Builds the key under which a URL is claimed in a visited set
///
/// Two hrefs that address the same page map to one key:
/// - host lowercased with a leading `www.` removed
/// - `http` and `https` treated alike, default port dropped
/// - dot segments, duplicate slashes and a trailing slash removed
/// - fragment removed
/// - tracking parameters removed, remaining parameters sorted
///
/// # Examples
///
/// ```
/// use email_harvester::url::dedup_key;
/// use url::Url;
///
/// let a = Url::parse("https://www.example.com/contact/?b=2&a=1#top").unwrap();
/// let b = Url::parse("http://example.com/contact?a=1&b=2&utm_source=x").unwrap();
/// assert_eq!(dedup_key(&a), dedup_key(&b));
/// ```
pub fn dedup_key(url: &Url) -> String {
    let host = url
        .host_str()
        .map(|h| h.to_lowercase())
        .unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let mut key = format!("//{}", host);
    if let Some(port) = url.port() {
        key.push_str(&format!(":{}", port));
    }

    key.push_str(&normalize_path(url.path()));

    let params = filter_and_sort_query_params(url);
    if !params.is_empty() {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        key.push('?');
        key.push_str(&query);
    }

    key
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
