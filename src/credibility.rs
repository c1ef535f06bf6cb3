//! Source credibility scoring
//!
//! Maps a URL or bare domain to a credibility score, a source category and a
//! verification status. Pure and synchronous: the same input always yields
//! the same output, so results can be cached and tested without collaborators.
//!
//! # Base scores
//!
//! ```text
//! government / academic TLDs   90+   verified
//! curated outlets              80–98 verified
//! social platforms             30    unverified
//! unknown domains              40    unverified
//! denylisted domains           ≤20   flagged
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::evidence::normalize::host_of;

/// Score assigned to any domain the scorer knows nothing about.
pub const UNKNOWN_SCORE: u8 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceCategory {
    Academic,
    Government,
    News,
    Social,
    Unknown,
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Academic => write!(f, "academic"),
            Self::Government => write!(f, "government"),
            Self::News => write!(f, "news"),
            Self::Social => write!(f, "social"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Verified,
    Unverified,
    Flagged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCredibility {
    pub credibility_score: u8,
    pub category: SourceCategory,
    pub verification_status: VerificationStatus,
}

/// Curated outlets: (domain, score, category).
const CURATED: &[(&str, u8, SourceCategory)] = &[
    ("reuters.com", 95, SourceCategory::News),
    ("apnews.com", 95, SourceCategory::News),
    ("bbc.com", 92, SourceCategory::News),
    ("bbc.co.uk", 92, SourceCategory::News),
    ("npr.org", 90, SourceCategory::News),
    ("economist.com", 90, SourceCategory::News),
    ("nytimes.com", 90, SourceCategory::News),
    ("wsj.com", 88, SourceCategory::News),
    ("washingtonpost.com", 88, SourceCategory::News),
    ("theguardian.com", 88, SourceCategory::News),
    ("ft.com", 88, SourceCategory::News),
    ("bloomberg.com", 88, SourceCategory::News),
    ("pbs.org", 88, SourceCategory::News),
    ("cnn.com", 82, SourceCategory::News),
    ("cbsnews.com", 82, SourceCategory::News),
    ("nbcnews.com", 82, SourceCategory::News),
    ("abcnews.go.com", 82, SourceCategory::News),
    ("aljazeera.com", 80, SourceCategory::News),
    ("factcheck.org", 92, SourceCategory::News),
    ("politifact.com", 90, SourceCategory::News),
    ("fullfact.org", 90, SourceCategory::News),
    ("snopes.com", 88, SourceCategory::News),
    ("afp.com", 94, SourceCategory::News),
    ("nature.com", 96, SourceCategory::Academic),
    ("science.org", 96, SourceCategory::Academic),
    ("thelancet.com", 95, SourceCategory::Academic),
    ("nejm.org", 95, SourceCategory::Academic),
    ("pubmed.ncbi.nlm.nih.gov", 95, SourceCategory::Academic),
    ("arxiv.org", 85, SourceCategory::Academic),
    ("scholar.google.com", 85, SourceCategory::Academic),
    ("jstor.org", 90, SourceCategory::Academic),
    ("who.int", 95, SourceCategory::Government),
    ("un.org", 92, SourceCategory::Government),
    ("europa.eu", 92, SourceCategory::Government),
    ("worldbank.org", 92, SourceCategory::Government),
    ("imf.org", 92, SourceCategory::Government),
];

const SOCIAL: &[&str] = &[
    "twitter.com",
    "x.com",
    "facebook.com",
    "instagram.com",
    "tiktok.com",
    "reddit.com",
    "youtube.com",
    "t.me",
    "medium.com",
    "substack.com",
];

const SOCIAL_SCORE: u8 = 30;

/// Known fabricated-news or satire outlets.
const DENYLIST: &[(&str, u8)] = &[
    ("infowars.com", 5),
    ("naturalnews.com", 5),
    ("beforeitsnews.com", 5),
    ("worldnewsdailyreport.com", 5),
    ("yournewswire.com", 8),
    ("newspunch.com", 8),
    ("theonion.com", 15),
    ("babylonbee.com", 15),
    ("thepeoplesvoice.tv", 10),
];

const GOVERNMENT_SUFFIXES: &[&str] = &[".gov", ".mil", ".gov.uk", ".gov.au", ".gc.ca", ".gouv.fr", ".int"];
const ACADEMIC_SUFFIXES: &[&str] = &[".edu", ".ac.uk", ".edu.au", ".ac.jp", ".ac.nz"];

pub struct SourceCredibilityScorer {
    curated: HashMap<String, (u8, SourceCategory)>,
    denylist: HashMap<String, u8>,
}

impl Default for SourceCredibilityScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceCredibilityScorer {
    pub fn new() -> Self {
        Self {
            curated: CURATED
                .iter()
                .map(|(d, s, c)| (d.to_string(), (*s, *c)))
                .collect(),
            denylist: DENYLIST.iter().map(|(d, s)| (d.to_string(), *s)).collect(),
        }
    }

    /// Add or replace a curated entry.
    pub fn with_entry(mut self, domain: &str, score: u8, category: SourceCategory) -> Self {
        self.curated
            .insert(domain.to_lowercase(), (score.min(100), category));
        self
    }

    /// Add a denylisted domain. Scores above 20 are capped.
    pub fn with_denied(mut self, domain: &str, score: u8) -> Self {
        self.denylist.insert(domain.to_lowercase(), score.min(20));
        self
    }

    /// Score a URL or bare domain.
    pub fn score(&self, url_or_domain: &str) -> SourceCredibility {
        let Some(host) = host_of(url_or_domain) else {
            return unknown();
        };

        if let Some(score) = lookup_suffix(&host, &self.denylist) {
            return SourceCredibility {
                credibility_score: score,
                category: SourceCategory::Unknown,
                verification_status: VerificationStatus::Flagged,
            };
        }

        if let Some((score, category)) = lookup_suffix(&host, &self.curated) {
            return SourceCredibility {
                credibility_score: score,
                category,
                verification_status: VerificationStatus::Verified,
            };
        }

        if GOVERNMENT_SUFFIXES.iter().any(|s| host.ends_with(s)) {
            return SourceCredibility {
                credibility_score: 92,
                category: SourceCategory::Government,
                verification_status: VerificationStatus::Verified,
            };
        }

        if ACADEMIC_SUFFIXES.iter().any(|s| host.ends_with(s)) {
            return SourceCredibility {
                credibility_score: 90,
                category: SourceCategory::Academic,
                verification_status: VerificationStatus::Verified,
            };
        }

        if SOCIAL.iter().any(|d| domain_matches(&host, d)) {
            return SourceCredibility {
                credibility_score: SOCIAL_SCORE,
                category: SourceCategory::Social,
                verification_status: VerificationStatus::Unverified,
            };
        }

        unknown()
    }
}

fn unknown() -> SourceCredibility {
    SourceCredibility {
        credibility_score: UNKNOWN_SCORE,
        category: SourceCategory::Unknown,
        verification_status: VerificationStatus::Unverified,
    }
}

/// `host` equals `domain` or is a subdomain of it.
fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

/// Walk from the full host up through parent domains.
fn lookup_suffix<V: Copy>(host: &str, table: &HashMap<String, V>) -> Option<V> {
    let mut candidate = host;
    loop {
        if let Some(v) = table.get(candidate) {
            return Some(*v);
        }
        let (_, parent) = candidate.split_once('.')?;
        if !parent.contains('.') {
            return None;
        }
        candidate = parent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> SourceCredibilityScorer {
        SourceCredibilityScorer::new()
    }

    #[test]
    fn test_government_and_academic_tlds() {
        let s = scorer().score("https://www.bls.gov/news.release/cpi.nr0.htm");
        assert_eq!(s.category, SourceCategory::Government);
        assert!(s.credibility_score >= 90);
        assert_eq!(s.verification_status, VerificationStatus::Verified);

        let s = scorer().score("https://web.mit.edu/research");
        assert_eq!(s.category, SourceCategory::Academic);
        assert!(s.credibility_score >= 90);

        let s = scorer().score("ox.ac.uk");
        assert_eq!(s.category, SourceCategory::Academic);
    }

    #[test]
    fn test_curated_news_range() {
        for url in [
            "https://www.reuters.com/world/",
            "apnews.com",
            "https://edition.cnn.com/2025/story",
            "http://snopes.com/fact-check/x",
        ] {
            let s = scorer().score(url);
            assert_eq!(s.category, SourceCategory::News, "{}", url);
            assert!((80..=98).contains(&s.credibility_score), "{}", url);
        }
    }

    #[test]
    fn test_unknown_default() {
        let s = scorer().score("https://some-random-blog.example/post");
        assert_eq!(s.credibility_score, UNKNOWN_SCORE);
        assert_eq!(s.category, SourceCategory::Unknown);
        assert_eq!(s.verification_status, VerificationStatus::Unverified);
    }

    #[test]
    fn test_denylisted_is_flagged() {
        let s = scorer().score("https://www.infowars.com/posts/moon");
        assert!(s.credibility_score <= 20);
        assert_eq!(s.verification_status, VerificationStatus::Flagged);

        let s = scorer().with_denied("fake.example", 90).score("fake.example");
        assert_eq!(s.credibility_score, 20);
    }

    #[test]
    fn test_social_platforms() {
        let s = scorer().score("https://x.com/someone/status/1");
        assert_eq!(s.category, SourceCategory::Social);
        // Suffix match must respect label boundaries.
        let s = scorer().score("https://box.com/file");
        assert_eq!(s.category, SourceCategory::Unknown);
    }

    #[test]
    fn test_custom_entry_overrides() {
        let s = scorer()
            .with_entry("example.org", 85, SourceCategory::News)
            .score("https://news.example.org/a");
        assert_eq!(s.credibility_score, 85);
        assert_eq!(s.verification_status, VerificationStatus::Verified);
    }

    #[test]
    fn test_garbage_input_is_unknown() {
        assert_eq!(scorer().score("").category, SourceCategory::Unknown);
        assert_eq!(scorer().score("   ").credibility_score, UNKNOWN_SCORE);
    }

    #[test]
    fn test_pure_function() {
        let a = scorer().score("https://www.nature.com/articles/x");
        let b = scorer().score("https://www.nature.com/articles/x");
        assert_eq!(a, b);
    }
}
