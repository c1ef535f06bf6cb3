//! Turns atomic claims into a ranked, capped list of search queries.
//!
//! Every claim yields a fact-claim database query plus a general web query;
//! statistical or policy claims add a government-scoped query and causal or
//! research claims an academic one. Ranking is claim priority, then
//! verifiability, then generation order.

use std::collections::HashSet;

use tracing::debug;

use crate::analysis::keywords::extract_keywords;
use crate::types::{content_id, AtomicClaim, ClaimCategory, Entity, QueryTarget, SearchQuery, Verifiability};

const WEB_KEYWORDS: usize = 8;
const MAX_QUOTED_ENTITIES: usize = 2;

const GOVERNMENT_CUES: &[&str] = &[
    "government", "federal", "congress", "parliament", "senate", "ministry", "agency", "census",
    "law", "bill", "policy", "unemployment", "inflation", "gdp", "budget", "tax",
];
const ACADEMIC_CUES: &[&str] = &[
    "study", "studies", "research", "scientists", "researchers", "journal", "trial", "vaccine",
    "climate", "species", "disease",
];

struct Candidate {
    query: SearchQuery,
    claim_index: usize,
    verifiability: Verifiability,
    order: usize,
}

pub struct QuerySynthesizer {
    max_queries: usize,
}

impl QuerySynthesizer {
    pub fn new(max_queries: usize) -> Self {
        Self { max_queries }
    }

    pub fn synthesize(&self, claims: &[AtomicClaim], entities: &[Entity]) -> Vec<SearchQuery> {
        let mut candidates: Vec<Candidate> = Vec::new();

        for (claim_index, claim) in claims.iter().enumerate() {
            for query in queries_for(claim, entities) {
                candidates.push(Candidate {
                    query,
                    claim_index,
                    verifiability: claim.verifiability,
                    order: candidates.len(),
                });
            }
        }

        candidates.sort_by(|a, b| {
            b.query
                .priority
                .cmp(&a.query.priority)
                .then(b.verifiability.rank().cmp(&a.verifiability.rank()))
                .then(a.order.cmp(&b.order))
        });

        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert(c.query.id.clone()));

        // Best-ranked query of every high-verifiability claim is kept even past the cap
        let mut selected = vec![false; candidates.len()];
        let mut covered = HashSet::new();
        for (i, c) in candidates.iter().enumerate() {
            if c.verifiability == Verifiability::High && covered.insert(c.claim_index) {
                selected[i] = true;
            }
        }

        let mut count = selected.iter().filter(|s| **s).count();
        for flag in selected.iter_mut() {
            if count >= self.max_queries {
                break;
            }
            if !*flag {
                *flag = true;
                count += 1;
            }
        }

        let queries: Vec<SearchQuery> = candidates
            .into_iter()
            .zip(selected)
            .filter_map(|(c, keep)| keep.then_some(c.query))
            .collect();

        debug!(
            claims = claims.len(),
            queries = queries.len(),
            cap = self.max_queries,
            "queries synthesized"
        );
        queries
    }
}

fn queries_for(claim: &AtomicClaim, entities: &[Entity]) -> Vec<SearchQuery> {
    let claim_text = claim
        .text
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .trim()
        .to_string();
    let lower = claim_text.to_lowercase();

    let mut keywords = extract_keywords(&claim_text, WEB_KEYWORDS).join(" ");
    if keywords.is_empty() {
        keywords = claim_text.clone();
    }

    let quoted: Vec<String> = referenced_entities(claim, entities)
        .into_iter()
        .filter(|e| e.contains(char::is_whitespace))
        .take(MAX_QUOTED_ENTITIES)
        .map(|e| format!("\"{}\"", e))
        .collect();

    let mut queries = vec![
        build(claim_text, vec![QueryTarget::FactClaim], claim.priority, Vec::new()),
        build(keywords.clone(), vec![QueryTarget::News], claim.priority, quoted),
    ];

    let keyword_cue = |cues: &[&str]| {
        extract_keywords(&lower, 0)
            .iter()
            .any(|w| cues.contains(&w.as_str()))
    };

    if claim.category == ClaimCategory::Statistical || keyword_cue(GOVERNMENT_CUES) {
        queries.push(build(
            keywords.clone(),
            vec![QueryTarget::Government],
            claim.priority,
            vec!["site:gov".to_string()],
        ));
    }

    if claim.category == ClaimCategory::Causal || keyword_cue(ACADEMIC_CUES) {
        queries.push(build(keywords, vec![QueryTarget::Academic], claim.priority, Vec::new()));
    }

    queries
}

/// Entity texts the claim refers to: its own refs first, then any known
/// entity that appears verbatim in the claim.
fn referenced_entities(claim: &AtomicClaim, entities: &[Entity]) -> Vec<String> {
    let lower = claim.text.to_lowercase();
    let mut refs = claim.entity_refs.clone();
    for entity in entities {
        if !refs.contains(&entity.text) && lower.contains(&entity.text.to_lowercase()) {
            refs.push(entity.text.clone());
        }
    }
    refs
}

fn build(text: String, targets: Vec<QueryTarget>, priority: u8, operators: Vec<String>) -> SearchQuery {
    let tags: Vec<String> = targets
        .iter()
        .map(|t| serde_json::to_string(t).unwrap_or_default())
        .collect();
    let full = if operators.is_empty() {
        text.clone()
    } else {
        format!("{} {}", text, operators.join(" "))
    };
    SearchQuery {
        id: content_id(&["query", &tags.join(","), &full.to_lowercase()]),
        text,
        target_source_types: targets,
        priority,
        operators,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityType;
    use pretty_assertions::assert_eq;

    fn claim(id: &str, text: &str, priority: u8, verifiability: Verifiability) -> AtomicClaim {
        AtomicClaim {
            id: id.to_string(),
            text: text.to_string(),
            category: ClaimCategory::Factual,
            verifiability,
            priority,
            entity_refs: Vec::new(),
        }
    }

    #[test]
    fn test_each_claim_gets_fact_claim_and_web_query() {
        let qs = QuerySynthesizer::new(10)
            .synthesize(&[claim("a", "The moon is made of cheese.", 5, Verifiability::High)], &[]);
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[0].text, "The moon is made of cheese");
        assert!(qs[0].targets_fact_claims());
        assert_eq!(qs[1].text, "moon made cheese");
        assert_eq!(qs[1].target_source_types, vec![QueryTarget::News]);
    }

    #[test]
    fn test_ranking_tie_break_order() {
        let claims = vec![
            claim("medium", "Alpha beta gamma.", 5, Verifiability::Medium),
            claim("top", "Delta epsilon zeta.", 8, Verifiability::Low),
            claim("high", "Theta iota kappa.", 5, Verifiability::High),
        ];
        let qs = QuerySynthesizer::new(20).synthesize(&claims, &[]);
        let order: Vec<&str> = qs.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "Delta epsilon zeta",
                "delta epsilon zeta",
                "Theta iota kappa",
                "theta iota kappa",
                "Alpha beta gamma",
                "alpha beta gamma",
            ]
        );
    }

    #[test]
    fn test_cap_applies_to_non_high_claims() {
        let claims = vec![
            claim("a", "Alpha beta gamma.", 5, Verifiability::Medium),
            claim("b", "Delta epsilon zeta.", 4, Verifiability::Low),
        ];
        let qs = QuerySynthesizer::new(3).synthesize(&claims, &[]);
        assert_eq!(qs.len(), 3);
    }

    #[test]
    fn test_high_verifiability_guaranteed_past_cap() {
        let claims = vec![
            claim("a", "Alpha beta gamma.", 5, Verifiability::High),
            claim("b", "Delta epsilon zeta.", 5, Verifiability::High),
            claim("c", "Theta iota kappa.", 5, Verifiability::High),
            claim("d", "Lambda sigma omega.", 9, Verifiability::Low),
        ];
        let qs = QuerySynthesizer::new(2).synthesize(&claims, &[]);
        assert_eq!(qs.len(), 3);
        for text in ["Alpha beta gamma", "Delta epsilon zeta", "Theta iota kappa"] {
            assert!(qs.iter().any(|q| q.text == text), "{}", text);
        }
    }

    #[test]
    fn test_statistical_claim_adds_government_query() {
        let mut c = claim("s", "In August 2025, inflation fell to 3%.", 6, Verifiability::High);
        c.category = ClaimCategory::Statistical;
        let qs = QuerySynthesizer::new(10).synthesize(&[c], &[]);
        let gov = qs
            .iter()
            .find(|q| q.target_source_types == vec![QueryTarget::Government])
            .unwrap();
        assert_eq!(gov.operators, vec!["site:gov"]);
        assert_eq!(gov.full_text(), "august 2025 inflation fell 3% site:gov");
    }

    #[test]
    fn test_multi_word_entities_become_quoted_operators() {
        let entities = vec![Entity {
            text: "Federal Reserve".to_string(),
            entity_type: EntityType::Organization,
            relevance: 80,
            aliases: Vec::new(),
        }];
        let qs = QuerySynthesizer::new(10).synthesize(
            &[claim("f", "The Federal Reserve raised rates.", 5, Verifiability::High)],
            &entities,
        );
        let web = qs
            .iter()
            .find(|q| q.target_source_types == vec![QueryTarget::News])
            .unwrap();
        assert_eq!(web.operators, vec!["\"Federal Reserve\""]);
    }

    #[test]
    fn test_duplicate_claims_dedup_and_ids_stable() {
        let claims = vec![
            claim("a", "The moon is made of cheese.", 5, Verifiability::High),
            claim("b", "The moon is made of cheese.", 5, Verifiability::High),
        ];
        let first = QuerySynthesizer::new(10).synthesize(&claims, &[]);
        let second = QuerySynthesizer::new(10).synthesize(&claims, &[]);
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_ne!(first[0].id, first[1].id);
    }
}
