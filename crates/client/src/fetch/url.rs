//! URL helpers for origin checks and cache keys.

/// Error type for URL handling failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse the origin the agent is responsible for.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Drop path, query and fragment
pub fn parse_origin(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    let host = parsed
        .host_str()
        .map(str::to_lowercase)
        .ok_or_else(|| UrlError::InvalidUrl(format!("{trimmed} has no host")))?;
    parsed
        .set_host(Some(&host))
        .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    parsed.set_path("/");
    parsed.set_query(None);
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether two URLs share scheme, host and port.
pub fn same_origin(a: &url::Url, b: &url::Url) -> bool {
    a.origin() == b.origin()
}

/// Key under which a response for `url` is cached: path plus query.
pub fn cache_key(url: &url::Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Resolve a manifest path against the agent's origin.
pub fn resolve(origin: &url::Url, path: &str) -> Result<url::Url, UrlError> {
    origin.join(path).map_err(|e| UrlError::InvalidUrl(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> url::Url {
        url::Url::parse(s).unwrap()
    }

    #[test]
    fn test_parse_origin_basic() {
        let origin = parse_origin("https://app.test").unwrap();
        assert_eq!(origin.as_str(), "https://app.test/");
    }

    #[test]
    fn test_parse_origin_default_scheme() {
        let origin = parse_origin("app.test").unwrap();
        assert_eq!(origin.scheme(), "https");
        assert_eq!(origin.host_str(), Some("app.test"));
    }

    #[test]
    fn test_parse_origin_lowercase_and_strip() {
        let origin = parse_origin("  https://APP.test:8443/deep/page?q=1#frag  ").unwrap();
        assert_eq!(origin.as_str(), "https://app.test:8443/");
    }

    #[test]
    fn test_parse_origin_unsupported_scheme() {
        let result = parse_origin("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_parse_origin_empty() {
        assert!(matches!(parse_origin(""), Err(UrlError::Empty)));
        assert!(matches!(parse_origin("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_same_origin() {
        assert!(same_origin(&url("https://app.test/a"), &url("https://app.test/b?c")));
        assert!(same_origin(&url("http://app.test:80/"), &url("http://app.test/")));
        assert!(!same_origin(&url("https://app.test/"), &url("http://app.test/")));
        assert!(!same_origin(&url("https://app.test/"), &url("https://cdn.app.test/")));
        assert!(!same_origin(&url("https://app.test/"), &url("https://app.test:8443/")));
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key(&url("https://app.test/")), "/");
        assert_eq!(cache_key(&url("https://app.test/images/homer.png")), "/images/homer.png");
        assert_eq!(cache_key(&url("https://app.test/search?q=donut#top")), "/search?q=donut");
    }

    #[test]
    fn test_resolve() {
        let origin = url("https://app.test/");
        assert_eq!(resolve(&origin, "/images/homer.png").unwrap().as_str(), "https://app.test/images/homer.png");
        assert_eq!(resolve(&origin, "/").unwrap().as_str(), "https://app.test/");
    }
}
