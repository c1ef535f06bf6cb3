use std::collections::HashSet;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "has", "had", "have", "with", "that", "this",
    "from", "about", "into", "than", "then", "there", "their", "they", "them", "what", "which",
    "where", "when", "who", "whom", "does", "did", "been", "being", "will", "would", "could",
    "should", "shall", "also", "just", "very", "more", "most", "only", "some", "such", "its",
    "our", "his", "her", "not", "but", "all", "any", "can", "may", "over", "under", "per",
    "said", "says", "according",
];

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Lowercased content words, hyphenated terms kept whole and split, first
/// occurrence order. `limit = 0` keeps everything.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut keywords = Vec::new();

    for word in text.split_whitespace() {
        let clean: String = word
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '%' || *c == '.')
            .collect::<String>()
            .trim_matches(|c: char| c == '.' || c == '-')
            .to_lowercase();
        if clean.is_empty() {
            continue;
        }

        let numeric = clean.chars().any(|c| c.is_ascii_digit());
        if clean.contains('-') {
            keywords.push(clean.clone());
            for part in clean.split('-') {
                if part.len() > 2 && !is_stop_word(part) {
                    keywords.push(part.to_string());
                }
            }
        } else if numeric || (clean.len() > 2 && !is_stop_word(&clean)) {
            keywords.push(clean);
        }
    }

    let mut seen = HashSet::new();
    keywords.retain(|k| seen.insert(k.clone()));
    if limit > 0 {
        keywords.truncate(limit);
    }
    keywords
}

/// Share of `claim` keywords present in `text`, 0.0–1.0.
pub fn overlap_ratio(claim_keywords: &[String], text: &str) -> f64 {
    if claim_keywords.is_empty() {
        return 0.0;
    }
    let haystack: HashSet<String> = extract_keywords(text, 0).into_iter().collect();
    let hits = claim_keywords
        .iter()
        .filter(|k| haystack.contains(*k) || stem_match(k, &haystack))
        .count();
    hits as f64 / claim_keywords.len() as f64
}

/// Cheap plural/suffix tolerance: "rates" matches "rate", "fell" does not match "fall".
fn stem_match(keyword: &str, haystack: &HashSet<String>) -> bool {
    let stem = keyword.trim_end_matches('s');
    stem.len() > 3
        && haystack
            .iter()
            .any(|w| w.trim_end_matches('s') == stem)
}
