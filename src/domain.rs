//! Domain extraction for grouping keys and display titles.
//!
//! The raw hostname (leading `www.` included) is the grouping key, so two
//! hostnames that differ only in the `www.` label form separate groups.
//! Display titles strip one leading `www.` label. Keeping the two forms
//! apart avoids conflating distinct string matches accidentally.

use url::Url;

/// Extract the raw hostname used as a grouping key.
///
/// Returns `None` when the URL cannot be parsed or has no host component
/// (`about:blank`, `chrome://`-style pages, plain fragments). Such tabs are
/// not bucketable by domain but still take part in rule matching and
/// similarity clustering, which work on raw title/URL text.
///
/// Examples:
/// - https://www.google.com/search → www.google.com
/// - https://news.bbc.co.uk/article → news.bbc.co.uk
/// - about:blank → None
pub fn extract_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(|host| host.to_ascii_lowercase())
}

/// Display form of a grouping key: one leading `www.` label removed.
pub fn display_domain(domain: &str) -> &str {
    domain.strip_prefix("www.").unwrap_or(domain)
}

/// Domain text fed into similarity features: the display form, or an empty
/// string when the URL has no parsable host.
pub fn similarity_domain(url: &str) -> String {
    extract_domain(url)
        .map(|domain| display_domain(&domain).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain_basic() {
        assert_eq!(extract_domain("https://google.com"), Some("google.com".to_string()));
        assert_eq!(extract_domain("http://google.com"), Some("google.com".to_string()));
        assert_eq!(
            extract_domain("https://github.com/rust-lang/rust"),
            Some("github.com".to_string())
        );
    }

    #[test]
    fn test_extract_domain_keeps_www() {
        assert_eq!(
            extract_domain("https://www.google.com/search?q=rust"),
            Some("www.google.com".to_string())
        );
    }

    #[test]
    fn test_extract_domain_keeps_subdomains() {
        assert_eq!(
            extract_domain("https://docs.microsoft.com/en-us"),
            Some("docs.microsoft.com".to_string())
        );
        assert_eq!(
            extract_domain("https://news.bbc.co.uk/article"),
            Some("news.bbc.co.uk".to_string())
        );
    }

    #[test]
    fn test_extract_domain_lowercases() {
        assert_eq!(extract_domain("https://GitHub.COM/x"), Some("github.com".to_string()));
    }

    #[test]
    fn test_extract_domain_special_hosts() {
        assert_eq!(extract_domain("http://localhost:3000/app"), Some("localhost".to_string()));
        assert_eq!(extract_domain("http://127.0.0.1:8080"), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_extract_domain_unparsable() {
        assert_eq!(extract_domain(""), None);
        assert_eq!(extract_domain("not a url"), None);
        assert_eq!(extract_domain("about:blank"), None);
        assert_eq!(extract_domain("/relative/path"), None);
    }

    #[test]
    fn test_display_domain_strips_leading_www() {
        assert_eq!(display_domain("www.google.com"), "google.com");
        assert_eq!(display_domain("google.com"), "google.com");
        // Only a leading label is stripped.
        assert_eq!(display_domain("docs.www.example.com"), "docs.www.example.com");
    }

    #[test]
    fn test_similarity_domain_empty_on_failure() {
        assert_eq!(similarity_domain("not a url"), "");
        assert_eq!(similarity_domain("https://www.rust-lang.org"), "rust-lang.org");
    }
}
