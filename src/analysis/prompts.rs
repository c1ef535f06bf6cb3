pub const ANALYSIS_PROMPT: &str = r#"You are a fact-checking analyst. Decompose the claim below into atomic, independently verifiable statements.

Respond with JSON only, no prose, in exactly this shape:
{
  "atomicClaims": [
    {
      "text": "one self-contained statement",
      "category": "factual | statistical | temporal | causal | comparative | opinion",
      "verifiability": "high | medium | low",
      "priority": 1-10,
      "entities": ["entity text as it appears in the claim"]
    }
  ],
  "entities": [
    {
      "text": "Federal Reserve",
      "type": "person | organization | location | date | event | statistic | other",
      "relevance": 0-100,
      "aliases": ["the Fed"]
    }
  ],
  "temporalContext": {
    "mentions": ["August 2025"],
    "timeSensitive": true
  },
  "complexity": "simple | moderate | complex"
}

Rules:
- Split compound sentences into separate atomic claims.
- Opinions and predictions are "opinion" with low verifiability.
- Statements with numbers, percentages or measurable quantities are "statistical".
- Higher priority means more central to the overall claim.

Claim:
"#;

pub const EVALUATION_PROMPT: &str = r#"You are a fact-checking analyst. For each numbered evidence item, decide whether it supports, contradicts, or is neutral toward the claim, and how relevant it is.

Respond with JSON only, no prose, as an array:
[
  {"index": 0, "supportType": "supporting | contradicting | neutral", "relevance": 0-100}
]

Claim:
{claim}

Evidence:
{evidence}
"#;

pub fn analysis_prompt(claim: &str) -> String {
    format!("{}{}", ANALYSIS_PROMPT, claim.trim())
}

/// Evidence rendered as `[i] title - snippet (publisher)` lines.
pub fn evaluation_prompt(claim: &str, evidence: &[(usize, &str, &str, &str)]) -> String {
    let rendered = evidence
        .iter()
        .map(|(i, title, snippet, publisher)| format!("[{}] {} - {} ({})", i, title, snippet, publisher))
        .collect::<Vec<_>>()
        .join("\n");
    EVALUATION_PROMPT
        .replace("{claim}", claim.trim())
        .replace("{evidence}", &rendered)
}
