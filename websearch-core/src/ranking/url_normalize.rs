//! URL and domain canonicalisation for deduplication.
//!
//! Two results refer to the same page when their scheme, host, port and
//! path agree case-insensitively. Query strings and fragments are
//! dropped entirely, so tracking parameters never split a group.

use url::Url;

/// Normalise a URL into its deduplication key.
///
/// The key is `scheme://host[:port]/path`, lower-cased, with a trailing
/// slash removed unless the path is the root. Default ports are omitted.
/// Input that does not parse, or has no host, falls back to the trimmed
/// lower-cased raw string.
///
/// # Examples
///
/// ```
/// use websearch_core::ranking::url_normalize::normalize_url;
///
/// let a = normalize_url("https://Example.COM/Docs/?utm_source=x#top");
/// let b = normalize_url("https://example.com/docs");
/// assert_eq!(a, b);
/// ```
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(parsed) = Url::parse(trimmed) else {
        return trimmed.to_lowercase();
    };
    let Some(host) = parsed.host_str() else {
        return trimmed.to_lowercase();
    };

    let mut path = parsed.path();
    if path.len() > 1 && path.ends_with('/') {
        path = &path[..path.len() - 1];
    }

    let key = match parsed.port() {
        Some(port) => format!("{}://{host}:{port}{path}", parsed.scheme()),
        None => format!("{}://{host}{path}", parsed.scheme()),
    };
    key.to_lowercase()
}

/// Extract the registrable-looking domain of a URL: the host, lower-cased,
/// with a leading `www.` removed.
///
/// Never fails; unparseable or host-less input yields the raw string
/// lower-cased.
pub fn extract_domain(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => {
                let host = host.to_lowercase();
                match host.strip_prefix("www.") {
                    Some(rest) => rest.to_string(),
                    None => host,
                }
            }
            None => raw.to_lowercase(),
        },
        Err(_) => raw.to_lowercase(),
    }
}
