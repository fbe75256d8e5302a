//! URL normalization and validation
//!
//! Every URL entering the pipeline passes through here: job target URLs
//! before scheduling, and extracted link/image/video URLs before cleaning.
//! Only `http` and `https` URLs are accepted; everything else is rejected
//! with a [`UrlError`].

use crate::UrlError;
use url::Url;

/// Schemes that are always rejected, even when they parse as absolute URLs
const DISALLOWED_SCHEMES: &[&str] = &["javascript", "data", "file", "mailto", "tel"];

/// Optional stripping applied on top of base normalization
///
/// These correspond to the `clean_url` step options in the cleaning
/// configuration; plain validation uses the default (nothing stripped).
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    /// Remove the query string
    pub strip_query: bool,

    /// Remove the fragment
    pub strip_fragment: bool,

    /// Remove a trailing slash (except for the root path)
    pub strip_trailing_slash: bool,
}

/// Normalizes and validates a URL
///
/// Relative URLs are resolved against `base` when provided. The host is
/// lower-cased and default ports (80/443) are stripped. Query, fragment,
/// and trailing slash are kept; use [`normalize_url_with`] to strip them.
///
/// Normalization is idempotent: feeding the output back in yields the
/// same URL.
///
/// # Errors
///
/// * `UrlError::InvalidScheme` for non-http(s) schemes (`javascript:`,
///   `data:`, `file:`, `mailto:`, ...)
/// * `UrlError::RelativeWithoutBase` for relative input with no base
/// * `UrlError::Parse` / `UrlError::MissingHost` for malformed input
pub fn normalize_url(input: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    normalize_url_with(input, base, &NormalizeOptions::default())
}

/// Normalizes a URL with explicit stripping options
pub fn normalize_url_with(
    input: &str,
    base: Option<&Url>,
    opts: &NormalizeOptions,
) -> Result<Url, UrlError> {
    let input = input.trim();

    let mut url = match Url::parse(input) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => base
                .join(input)
                .map_err(|e| UrlError::Parse(e.to_string()))?,
            None => return Err(UrlError::RelativeWithoutBase(input.to_string())),
        },
        Err(e) => return Err(UrlError::Parse(e.to_string())),
    };

    // Scheme check after resolution so relative links inherit the base scheme
    let scheme = url.scheme().to_string();
    if DISALLOWED_SCHEMES.contains(&scheme.as_str()) {
        return Err(UrlError::InvalidScheme(scheme));
    }
    if scheme != "http" && scheme != "https" {
        return Err(UrlError::InvalidScheme(scheme));
    }

    // The url crate already lower-cases the host and drops default ports
    // for http/https; verify a host is actually present.
    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    if opts.strip_query {
        url.set_query(None);
    }

    if opts.strip_fragment {
        url.set_fragment(None);
    }

    if opts.strip_trailing_slash {
        let path = url.path();
        if path.len() > 1 && path.ends_with('/') {
            let trimmed = path.trim_end_matches('/').to_string();
            url.set_path(&trimmed);
        }
    }

    Ok(url)
}

/// Returns true if a raw href uses a scheme the pipeline never follows
///
/// Used by the extractor to skip obvious non-candidates without paying
/// for a full parse.
pub fn has_disallowed_scheme(href: &str) -> bool {
    let href = href.trim();
    DISALLOWED_SCHEMES
        .iter()
        .any(|scheme| href.len() > scheme.len() && href[..scheme.len()].eq_ignore_ascii_case(scheme) && href.as_bytes()[scheme.len()] == b':')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_all() -> NormalizeOptions {
        NormalizeOptions {
            strip_query: true,
            strip_fragment: true,
            strip_trailing_slash: true,
        }
    }

    #[test]
    fn test_lowercase_host() {
        let url = normalize_url("https://EXAMPLE.COM/Page", None).unwrap();
        assert_eq!(url.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_strip_default_port() {
        let url = normalize_url("http://example.com:80/page", None).unwrap();
        assert_eq!(url.as_str(), "http://example.com/page");

        let url = normalize_url("https://example.com:443/page", None).unwrap();
        assert_eq!(url.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keep_nondefault_port() {
        let url = normalize_url("http://example.com:8080/page", None).unwrap();
        assert_eq!(url.as_str(), "http://example.com:8080/page");
    }

    #[test]
    fn test_resolve_relative_against_base() {
        let base = Url::parse("https://example.com/dir/page").unwrap();
        let url = normalize_url("/other", Some(&base)).unwrap();
        assert_eq!(url.as_str(), "https://example.com/other");

        let url = normalize_url("sibling", Some(&base)).unwrap();
        assert_eq!(url.as_str(), "https://example.com/dir/sibling");
    }

    #[test]
    fn test_relative_without_base_rejected() {
        let result = normalize_url("/page", None);
        assert!(matches!(result, Err(UrlError::RelativeWithoutBase(_))));
    }

    #[test]
    fn test_disallowed_schemes_rejected() {
        for input in [
            "javascript:void(0)",
            "data:text/html,<p>x</p>",
            "file:///etc/passwd",
            "mailto:test@example.com",
            "ftp://example.com/file",
        ] {
            let result = normalize_url(input, None);
            assert!(
                matches!(result, Err(UrlError::InvalidScheme(_))),
                "expected scheme rejection for {input}"
            );
        }
    }

    #[test]
    fn test_strip_query_and_fragment() {
        let url =
            normalize_url_with("https://example.com/page?a=1#top", None, &strip_all()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_strip_trailing_slash_keeps_root() {
        let url = normalize_url_with("https://example.com/page/", None, &strip_all()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/page");

        let url = normalize_url_with("https://example.com/", None, &strip_all()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_default_options_keep_query() {
        let url = normalize_url("https://example.com/page?a=1#top", None).unwrap();
        assert_eq!(url.as_str(), "https://example.com/page?a=1#top");
    }

    #[test]
    fn test_idempotent() {
        let opts = strip_all();
        for input in [
            "https://Example.com/A/B/?q=1#frag",
            "http://example.com:80/x/",
            "https://example.com",
        ] {
            let once = normalize_url_with(input, None, &opts).unwrap();
            let twice = normalize_url_with(once.as_str(), None, &opts).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_malformed_url() {
        assert!(normalize_url("http://", None).is_err());
        assert!(normalize_url("not a url at all", None).is_err());
    }

    #[test]
    fn test_has_disallowed_scheme() {
        assert!(has_disallowed_scheme("javascript:void(0)"));
        assert!(has_disallowed_scheme("MAILTO:x@y.com"));
        assert!(!has_disallowed_scheme("https://example.com"));
        assert!(!has_disallowed_scheme("/relative/path"));
    }
}
