/// Returns true if the href contains any of the keywords (case-insensitive)
///
/// Keywords are expected in lowercase.
pub fn is_priority_link(href: &str, keywords: &[String]) -> bool {
    let href = href.to_lowercase();
    keywords.iter().any(|keyword| href.contains(keyword.as_str()))
}

/// Orders hrefs so that links likely to lead to contact details come first
///
/// Links containing a priority keyword move ahead of all others. The sort is
/// stable: within each group the original document order is preserved.
///
/// # Examples
///
/// ```
/// use email_harvester::url::prioritize_links;
///
/// let keywords = vec!["contact".to_string(), "about".to_string()];
/// let mut hrefs = vec!["/blog", "/About-us", "/shop", "/contact"];
/// prioritize_links(&mut hrefs, &keywords);
/// assert_eq!(hrefs, vec!["/About-us", "/contact", "/blog", "/shop"]);
/// ```
pub fn prioritize_links<S: AsRef<str>>(hrefs: &mut [S], keywords: &[String]) {
    hrefs.sort_by_key(|href| !is_priority_link(href.as_ref(), keywords));
}
