pub mod keywords;
pub mod parse;
pub mod prompts;

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::temporal;
use crate::traits::{GenerationConfig, TextGenerator};
use crate::types::{
    clamp_score, content_id, AnalysisMethod, AtomicClaim, ClaimAnalysis, ClaimCategory,
    Complexity, Entity, EntityType, TemporalContext, Verifiability,
};

use self::keywords::is_stop_word;
use self::parse::{parse_json, Parsed};

const DEFAULT_PRIORITY: u8 = 5;
const OPINION_PRIORITY: u8 = 3;

const OPINION_CUES: &[&str] = &[
    "i think", "i believe", "i feel", "in my opinion", "should", "ought to", "best", "worst",
    "beautiful", "terrible", "amazing", "awful", "greatest",
];
const CAUSAL_CUES: &[&str] = &[
    "because", "caused", "causes", "due to", "leads to", "led to", "result of", "resulted in",
    "responsible for",
];
const COMPARATIVE_CUES: &[&str] = &[
    " than ", "compared to", "compared with", "more ", "less ", "fewer ", "largest", "smallest",
    "highest", "lowest",
];
const TIME_SENSITIVE_CUES: &[&str] = &["currently", "now", "latest", "recent", "this year", "today"];

const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

/// Analysis plus the degradations encountered while producing it.
#[derive(Debug, Clone)]
pub struct Analyzed {
    pub analysis: ClaimAnalysis,
    pub warnings: Vec<String>,
}

pub struct ClaimAnalyzer {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
}

impl ClaimAnalyzer {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Decompose `text`. Never fails: any generator problem falls back to
    /// the heuristic path and is reported as a warning.
    pub async fn analyze(&self, text: &str) -> Analyzed {
        let Some(generator) = &self.generator else {
            debug!("no generator configured, using heuristic analysis");
            return Analyzed {
                analysis: Self::heuristic(text),
                warnings: Vec::new(),
            };
        };

        match self.generate(generator.as_ref(), text).await {
            Ok(analysis) => {
                info!(
                    claims = analysis.atomic_claims.len(),
                    entities = analysis.entities.len(),
                    "claim analysis complete"
                );
                Analyzed {
                    analysis,
                    warnings: Vec::new(),
                }
            }
            Err(e) => {
                warn!(error = %e, "claim analysis fell back to heuristic");
                Analyzed {
                    analysis: Self::heuristic(text),
                    warnings: vec![format!("claim analysis: {}; used heuristic decomposition", e)],
                }
            }
        }
    }

    async fn generate(
        &self,
        generator: &dyn TextGenerator,
        text: &str,
    ) -> Result<ClaimAnalysis, PipelineError> {
        let config = GenerationConfig {
            temperature: 0.1,
            max_tokens: 2048,
        };
        let prompt = prompts::analysis_prompt(text);

        let raw = match tokio::time::timeout(self.timeout, generator.generate(&prompt, config)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(PipelineError::unavailable(generator.name(), e)),
            Err(_) => return Err(PipelineError::timed_out(generator.name(), self.timeout)),
        };

        let parsed: RawAnalysis = match parse_json(&raw) {
            Parsed::Strict(v) => v,
            Parsed::Repaired(v) => {
                debug!("analysis JSON needed repair");
                v
            }
            Parsed::ParseFailed(reason) => return Err(PipelineError::malformed(generator.name(), reason)),
        };

        parsed
            .validate(text)
            .ok_or_else(|| PipelineError::malformed(generator.name(), "no usable atomic claims"))
    }

    /// Deterministic decomposition: sentence split, capitalized-token
    /// entities, cue-word categories, fixed priorities.
    pub fn heuristic(text: &str) -> ClaimAnalysis {
        let mut sentences = split_sentences(text);
        if sentences.is_empty() {
            sentences.push(text.trim().to_string());
        }

        let entities = extract_entities(&sentences);

        let atomic_claims: Vec<AtomicClaim> = sentences
            .iter()
            .enumerate()
            .map(|(i, sentence)| {
                let entity_refs: Vec<String> = entities
                    .iter()
                    .filter(|e| sentence.contains(&e.text))
                    .map(|e| e.text.clone())
                    .collect();
                let category = categorize(sentence);
                let verifiability = match category {
                    ClaimCategory::Opinion => Verifiability::Low,
                    ClaimCategory::Causal | ClaimCategory::Comparative => Verifiability::Medium,
                    _ if !entity_refs.is_empty() => Verifiability::High,
                    _ => Verifiability::Medium,
                };
                let priority = if category == ClaimCategory::Opinion {
                    OPINION_PRIORITY
                } else {
                    DEFAULT_PRIORITY
                };
                AtomicClaim {
                    id: claim_id(i, sentence),
                    text: sentence.clone(),
                    category,
                    verifiability,
                    priority,
                    entity_refs,
                }
            })
            .collect();

        ClaimAnalysis {
            complexity: Complexity::from_claim_count(atomic_claims.len()),
            temporal_context: temporal_context(text),
            atomic_claims,
            entities,
            method: AnalysisMethod::Heuristic,
        }
    }
}

fn claim_id(index: usize, text: &str) -> String {
    content_id(&["claim", &index.to_string(), text])
}

fn temporal_context(text: &str) -> TemporalContext {
    let mentions = temporal::date_mentions(text);
    let lower = text.to_lowercase();
    let time_sensitive =
        !mentions.is_empty() || TIME_SENSITIVE_CUES.iter().any(|c| contains_word(&lower, c));
    TemporalContext {
        mentions,
        time_sensitive,
    }
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(i, _)| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Split on `.`, `!` or `?` followed by whitespace or end of text, so
/// decimals like `3.5%` stay intact.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') && chars.peek().map_or(true, |c| c.is_whitespace()) {
            push_sentence(&mut sentences, &current);
            current.clear();
        }
    }
    push_sentence(&mut sentences, &current);
    sentences
}

fn push_sentence(out: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.chars().filter(|c| c.is_alphanumeric()).count() >= 3 {
        out.push(trimmed.to_string());
    }
}

fn categorize(sentence: &str) -> ClaimCategory {
    let lower = format!(" {} ", sentence.to_lowercase());
    if OPINION_CUES.iter().any(|c| contains_word(&lower, c.trim())) {
        ClaimCategory::Opinion
    } else if sentence.chars().any(|c| c.is_ascii_digit() && !is_year_only(sentence))
        || lower.contains('%')
        || lower.contains("percent")
    {
        ClaimCategory::Statistical
    } else if CAUSAL_CUES.iter().any(|c| lower.contains(c)) {
        ClaimCategory::Causal
    } else if COMPARATIVE_CUES.iter().any(|c| lower.contains(c)) {
        ClaimCategory::Comparative
    } else if temporal::has_date_reference(sentence) {
        ClaimCategory::Temporal
    } else {
        ClaimCategory::Factual
    }
}

/// Every digit in the sentence belongs to a four-digit year.
fn is_year_only(sentence: &str) -> bool {
    sentence
        .split(|c: char| !c.is_ascii_digit())
        .filter(|t| !t.is_empty())
        .all(|t| t.len() == 4 && is_year(t))
}

fn is_year(token: &str) -> bool {
    token
        .parse::<u32>()
        .is_ok_and(|y| (1900..=2100).contains(&y))
}

/// Runs of capitalized words become named entities; numeric tokens become
/// statistics (or dates for bare years).
fn extract_entities(sentences: &[String]) -> Vec<Entity> {
    let mut entities: Vec<Entity> = Vec::new();
    let mut push = |text: String, entity_type: EntityType, relevance: u8| {
        if !entities.iter().any(|e| e.text == text) {
            entities.push(Entity {
                text,
                entity_type,
                relevance,
                aliases: Vec::new(),
            });
        }
    };

    for sentence in sentences {
        let mut run: Vec<&str> = Vec::new();
        let words: Vec<&str> = sentence.split_whitespace().collect();

        for (i, raw) in words.iter().enumerate() {
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '%');
            let ends_clause = raw.ends_with([',', ';', ':']);

            if word.chars().any(|c| c.is_ascii_digit()) {
                flush_run(&mut run, &mut push);
                if is_year(word) {
                    push(word.to_string(), EntityType::Date, 50);
                } else {
                    push(word.to_string(), EntityType::Statistic, 60);
                }
                continue;
            }

            let capitalized = word.chars().next().is_some_and(char::is_uppercase);
            let sentence_initial_filler = i == 0 && {
                let lower = word.to_lowercase();
                lower.len() <= 3 || is_stop_word(&lower)
            };

            if capitalized && !sentence_initial_filler {
                run.push(word);
                if ends_clause {
                    flush_run(&mut run, &mut push);
                }
            } else {
                flush_run(&mut run, &mut push);
            }
        }
        flush_run(&mut run, &mut push);
    }

    entities
}

fn flush_run(run: &mut Vec<&str>, push: &mut impl FnMut(String, EntityType, u8)) {
    if run.is_empty() {
        return;
    }
    let text = run.join(" ");
    run.clear();

    let lower = text.to_lowercase();
    if MONTHS.contains(&lower.as_str()) {
        push(text, EntityType::Date, 50);
    } else if !is_stop_word(&lower) {
        push(text, EntityType::Other, 70);
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    #[serde(default)]
    atomic_claims: Vec<RawClaim>,
    #[serde(default)]
    entities: Vec<RawEntity>,
    #[serde(default)]
    temporal_context: Option<RawTemporal>,
    #[serde(default)]
    complexity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawClaim {
    #[serde(default)]
    text: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    verifiability: String,
    #[serde(default)]
    priority: Value,
    #[serde(default)]
    entities: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(default)]
    text: String,
    #[serde(default, rename = "type")]
    entity_type: String,
    #[serde(default)]
    relevance: Value,
    #[serde(default)]
    aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTemporal {
    #[serde(default)]
    mentions: Vec<String>,
    #[serde(default)]
    time_sensitive: bool,
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl RawAnalysis {
    /// Coerce generator output into range. `None` when no claim survives.
    fn validate(self, original: &str) -> Option<ClaimAnalysis> {
        let atomic_claims: Vec<AtomicClaim> = self
            .atomic_claims
            .into_iter()
            .filter(|c| !c.text.trim().is_empty())
            .enumerate()
            .map(|(i, c)| {
                let text = c.text.trim().to_string();
                AtomicClaim {
                    id: claim_id(i, &text),
                    category: ClaimCategory::parse(&c.category).unwrap_or(ClaimCategory::Factual),
                    verifiability: Verifiability::parse(&c.verifiability)
                        .unwrap_or(Verifiability::Medium),
                    priority: as_number(&c.priority)
                        .map(|p| p.round().clamp(1.0, 10.0) as u8)
                        .unwrap_or(DEFAULT_PRIORITY),
                    entity_refs: c
                        .entities
                        .into_iter()
                        .map(|e| e.trim().to_string())
                        .filter(|e| !e.is_empty())
                        .collect(),
                    text,
                }
            })
            .collect();

        if atomic_claims.is_empty() {
            return None;
        }

        let mut entities: Vec<Entity> = Vec::new();
        for e in self.entities {
            let text = e.text.trim().to_string();
            if text.is_empty() || entities.iter().any(|x| x.text == text) {
                continue;
            }
            entities.push(Entity {
                entity_type: EntityType::parse(&e.entity_type),
                relevance: as_number(&e.relevance).map(clamp_score).unwrap_or(50),
                aliases: e.aliases,
                text,
            });
        }

        let mut temporal_context = temporal_context(original);
        if let Some(raw) = self.temporal_context {
            for mention in raw.mentions {
                if !temporal_context.mentions.contains(&mention) {
                    temporal_context.mentions.push(mention);
                }
            }
            temporal_context.time_sensitive |= raw.time_sensitive;
        }

        let complexity = match self.complexity.as_deref().map(str::trim) {
            Some("simple") => Complexity::Simple,
            Some("moderate") => Complexity::Moderate,
            Some("complex") => Complexity::Complex,
            _ => Complexity::from_claim_count(atomic_claims.len()),
        };

        Some(ClaimAnalysis {
            atomic_claims,
            entities,
            temporal_context,
            complexity,
            method: AnalysisMethod::Generative,
        })
    }
}
