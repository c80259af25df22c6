//! URL canonicalization and resolution against the application origin.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for expedition_core::Error {
    fn from(err: UrlError) -> Self {
        expedition_core::Error::InvalidUrl(err.to_string())
    }
}

/// Canonicalize an absolute URL string so equal requests share a cache key.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Lowercase the host
/// 3. Remove fragment (#...)
/// 4. Keep query string intact (do not reorder)
///
/// Any scheme the `url` crate parses is accepted; callers decide which
/// schemes they fetch.
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            parsed
                .set_host(Some(&lowered))
                .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
        }
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve `reference` (absolute, root-relative or `./`-relative) against `origin`.
pub fn resolve(origin: &url::Url, reference: &str) -> Result<url::Url, UrlError> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }
    let joined = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    canonicalize(joined.as_str())
}

/// Parse an origin, requiring http(s).
pub fn parse_origin(input: &str) -> Result<url::Url, UrlError> {
    let parsed = canonicalize(input)?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://EXAMPLE.COM/App.js").unwrap();
        assert_eq!(url.as_str(), "https://example.com/App.js");
    }

    #[test]
    fn test_canonicalize_remove_fragment() {
        let url = canonicalize("https://example.com/#section").unwrap();
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_canonicalize_keeps_query() {
        let url = canonicalize("https://example.com/?b=2&a=1").unwrap();
        assert_eq!(url.query(), Some("b=2&a=1"));
    }

    #[test]
    fn test_canonicalize_other_schemes_parse() {
        let url = canonicalize("chrome-extension://abcdef/script.js").unwrap();
        assert_eq!(url.scheme(), "chrome-extension");
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_canonicalize_relative_rejected() {
        assert!(matches!(canonicalize("./app.js"), Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_resolve_dot_relative() {
        let origin = url::Url::parse("https://example.com/countdown/").unwrap();
        assert_eq!(resolve(&origin, "./").unwrap().as_str(), "https://example.com/countdown/");
        assert_eq!(resolve(&origin, "./app.js").unwrap().as_str(), "https://example.com/countdown/app.js");
        assert_eq!(resolve(&origin, "/index.html").unwrap().as_str(), "https://example.com/index.html");
    }

    #[test]
    fn test_resolve_absolute() {
        let origin = url::Url::parse("https://example.com/").unwrap();
        let url = resolve(&origin, "https://cdn.example.org/font.woff2").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.org"));
    }

    #[test]
    fn test_parse_origin_scheme() {
        assert!(parse_origin("http://localhost:8080/").is_ok());
        assert!(matches!(parse_origin("ftp://example.com/"), Err(UrlError::UnsupportedScheme(_))));
    }
}
