use std::collections::HashSet;

use url::{Host, Url};

use crate::types::EvidenceItem;

/// Parse a URL, accepting bare domains (`example.com/path`) by assuming `https`.
///
/// Domain hosts must contain a dot; IP literals are kept as-is.
fn parse_url(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return None;
    }

    let url = if trimmed.contains("://") {
        Url::parse(trimmed).ok()?
    } else {
        Url::parse(&format!("https://{}", trimmed)).ok()?
    };

    match url.host()? {
        Host::Domain(domain) if !domain.trim_end_matches('.').contains('.') => None,
        _ => Some(url),
    }
}

fn bare_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.trim_end_matches('.');
    let host = host.strip_prefix("www.").unwrap_or(host);
    Some(host.to_string())
}

/// Lowercased host without a leading `www.`.
pub fn host_of(url_or_domain: &str) -> Option<String> {
    parse_url(url_or_domain).as_ref().and_then(bare_host)
}

/// Canonical form used for deduplication: `scheme://host/path` with
/// `www.`, query, fragment and trailing slashes removed. `http` and `https`
/// collapse to the same key.
pub fn normalize_url(raw: &str) -> Option<String> {
    let url = parse_url(raw)?;
    let host = bare_host(&url)?;
    let scheme = match url.scheme() {
        "http" => "https",
        other => other,
    };
    let path = url.path().trim_end_matches('/');
    Some(format!("{}://{}{}", scheme, host, path))
}

/// Drop items whose normalized URL was already seen, keeping the first.
/// Items with unparseable URLs are dropped.
pub fn dedup_by_url(items: Vec<EvidenceItem>) -> Vec<EvidenceItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| match normalize_url(&item.url) {
            Some(key) => seen.insert(key),
            None => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EvidenceSource, SupportType};

    fn item(url: &str) -> EvidenceItem {
        EvidenceItem {
            id: url.to_string(),
            url: url.to_string(),
            publisher: "p".to_string(),
            title: String::new(),
            snippet: String::new(),
            publication_date: None,
            rating: None,
            credibility_score: 50,
            relevance_score: 0,
            support_type: SupportType::Neutral,
            source_type: EvidenceSource::SearchResult,
        }
    }

    #[test]
    fn test_normalize_strips_www_and_trailing_slash() {
        assert_eq!(
            normalize_url("https://www.Example.com/a/b/").as_deref(),
            Some("https://example.com/a/b")
        );
        assert_eq!(
            normalize_url("https://example.com/a/b").as_deref(),
            Some("https://example.com/a/b")
        );
        assert_eq!(
            normalize_url("http://www.example.com/").as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn test_normalize_drops_query_fragment_port() {
        assert_eq!(
            normalize_url("https://example.com:443/x?utm=1#top").as_deref(),
            Some("https://example.com/x")
        );
    }

    #[test]
    fn test_ipv6_host_is_kept() {
        assert_eq!(
            normalize_url("http://[2001:db8::1]/x").as_deref(),
            Some("https://[2001:db8::1]/x")
        );
        assert_eq!(host_of("http://[2001:db8::1]:8080/x").as_deref(), Some("[2001:db8::1]"));
    }

    #[test]
    fn test_dot_segments_collapse() {
        assert_eq!(
            normalize_url("https://example.com/a/./b").as_deref(),
            Some("https://example.com/a/b")
        );
        let out = dedup_by_url(vec![
            item("https://example.com/a/./b"),
            item("https://example.com/a/c/../b"),
            item("https://example.com/a/b"),
        ]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_bare_domain() {
        assert_eq!(host_of("reuters.com").as_deref(), Some("reuters.com"));
        assert_eq!(host_of("www.bbc.co.uk/news").as_deref(), Some("bbc.co.uk"));
        assert!(host_of("localhost").is_none());
        assert!(host_of("not a url").is_none());
        assert!(host_of("").is_none());
    }

    #[test]
    fn test_dedup_keeps_first_variant() {
        let items = vec![
            item("https://www.example.com/story/"),
            item("https://example.com/story"),
            item("https://example.com/other"),
            item("::::"),
        ];
        let out = dedup_by_url(items);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].url, "https://www.example.com/story/");
        assert_eq!(out[1].url, "https://example.com/other");
    }
}
