//! Temporal validation of date references in claim text
//!
//! Every date-like substring is resolved to a span of days and compared with
//! a context date. The signed day delta `Δ = context − reference` decides the
//! classification:
//!
//! ```text
//! Δ < −365           far_future   invalid  20
//! −365 ≤ Δ < −30     near_future  valid    80 → 60
//! −30 ≤ Δ ≤ 30       present      valid    95
//! 30 < Δ ≤ 365       past         valid    90
//! Δ > 365            past         valid    90 → 60 (ten-year decay)
//! ```

use chrono::{Datelike, Duration, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{DateType, TemporalValidation};

/// Configurable classification bands, in days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalConfig {
    /// |Δ| within which a reference counts as present (default: 30)
    pub present_window_days: i64,
    /// Distance separating near from far (default: 365)
    pub horizon_days: i64,
    /// Age over which past confidence decays to its floor (default: 3650)
    pub decay_span_days: i64,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            present_window_days: 30,
            horizon_days: 365,
            decay_span_days: 3650,
        }
    }
}

const MONTHS: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|sept|oct|nov|dec";

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("valid ISO date pattern"));

static MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({MONTHS})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"))
        .expect("valid month-day-year pattern")
});

static MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({MONTHS})\.?,?\s+(\d{{4}})\b")).expect("valid month-year pattern")
});

static PREP_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:in|since|by|during|until|before|after|from|of)\s+((?:1[0-9]|20|21)\d{2})\b")
        .expect("valid year pattern")
});

static RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(today|yesterday|tomorrow|(?:this|last|next)\s+(?:week|month|year)|(\d{1,3})\s+(days?|weeks?|months?|years?)\s+ago|in\s+(\d{1,3})\s+(days?|weeks?|months?|years?))\b",
    )
    .expect("valid relative pattern")
});

/// Inclusive day span a reference resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DateSpan {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateSpan {
    fn day(d: NaiveDate) -> Self {
        Self { start: d, end: d }
    }

    fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = start.checked_add_months(Months::new(1))? - Duration::days(1);
        Some(Self { start, end })
    }

    fn year(year: i32) -> Option<Self> {
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year, 12, 31)?,
        })
    }

    /// Signed distance from `context` to the nearest day of the span.
    fn delta_from(&self, context: NaiveDate) -> i64 {
        if context < self.start {
            (context - self.start).num_days()
        } else if context > self.end {
            (context - self.end).num_days()
        } else {
            0
        }
    }
}

/// One extracted reference: matched text, byte range, resolved span.
#[derive(Debug, Clone)]
struct DateReference {
    text: String,
    start: usize,
    end: usize,
    span: Option<DateSpan>,
}

pub struct TemporalValidator {
    config: TemporalConfig,
}

impl Default for TemporalValidator {
    fn default() -> Self {
        Self::new(TemporalConfig::default())
    }
}

impl TemporalValidator {
    pub fn new(config: TemporalConfig) -> Self {
        Self { config }
    }

    /// One validation per detected date reference, in text order.
    pub fn validate(&self, text: &str, context: NaiveDate) -> Vec<TemporalValidation> {
        extract_references(text, context)
            .into_iter()
            .map(|r| match r.span {
                Some(span) => self.classify(&r.text, span.delta_from(context)),
                None => TemporalValidation {
                    date_text: r.text.clone(),
                    is_valid: false,
                    date_type: None,
                    confidence: 0,
                    reasoning: format!("could not interpret \"{}\" as a calendar date", r.text),
                },
            })
            .collect()
    }

    /// Mean confidence across validations; 100 when there are none.
    pub fn score(validations: &[TemporalValidation]) -> u8 {
        if validations.is_empty() {
            return 100;
        }
        let total: u32 = validations.iter().map(|v| v.confidence as u32).sum();
        ((total as f64) / (validations.len() as f64)).round() as u8
    }

    fn classify(&self, date_text: &str, delta: i64) -> TemporalValidation {
        let window = self.config.present_window_days;
        let horizon = self.config.horizon_days;

        let (date_type, is_valid, confidence, reasoning) = if delta < -horizon {
            (
                DateType::FarFuture,
                false,
                20,
                format!("refers to {} days in the future, beyond the {}-day horizon", -delta, horizon),
            )
        } else if delta < -window {
            // 80 just past the present window, 60 at the horizon
            let t = (-delta - window) as f64 / (horizon - window).max(1) as f64;
            let confidence = (80.0 - 20.0 * t).round() as u8;
            (
                DateType::NearFuture,
                true,
                confidence,
                format!("refers to {} days in the future", -delta),
            )
        } else if delta <= window {
            (
                DateType::Present,
                true,
                95,
                format!("within {} days of the context date", window),
            )
        } else if delta <= horizon {
            (DateType::Past, true, 90, format!("{} days before the context date", delta))
        } else {
            let t = ((delta - horizon) as f64 / self.config.decay_span_days.max(1) as f64).min(1.0);
            let confidence = (90.0 - 30.0 * t).round() as u8;
            (
                DateType::Past,
                true,
                confidence,
                format!("{} days before the context date; older references carry less weight", delta),
            )
        };

        TemporalValidation {
            date_text: date_text.to_string(),
            is_valid,
            date_type: Some(date_type),
            confidence,
            reasoning,
        }
    }
}

/// Whether the text contains any date-like reference.
pub fn has_date_reference(text: &str) -> bool {
    ISO_DATE.is_match(text)
        || MONTH_DAY_YEAR.is_match(text)
        || MONTH_YEAR.is_match(text)
        || PREP_YEAR.is_match(text)
        || RELATIVE.is_match(text)
}

/// Raw date-like mentions, in text order, without resolving them.
pub fn date_mentions(text: &str) -> Vec<String> {
    extract_references(text, chrono::Utc::now().date_naive())
        .into_iter()
        .map(|r| r.text)
        .collect()
}

fn extract_references(text: &str, context: NaiveDate) -> Vec<DateReference> {
    let mut refs: Vec<DateReference> = Vec::new();

    let push = |refs: &mut Vec<DateReference>, start: usize, end: usize, span: Option<DateSpan>| {
        if refs.iter().any(|r| start < r.end && r.start < end) {
            return;
        }
        refs.push(DateReference {
            text: text[start..end].to_string(),
            start,
            end,
            span,
        });
    };

    for caps in ISO_DATE.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        let span = parse_num(&caps[1]).and_then(|y| {
            NaiveDate::from_ymd_opt(y, parse_num(&caps[2])? as u32, parse_num(&caps[3])? as u32)
        });
        push(&mut refs, m.start(), m.end(), span.map(DateSpan::day));
    }

    for caps in MONTH_DAY_YEAR.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        let span = month_number(&caps[1]).and_then(|month| {
            NaiveDate::from_ymd_opt(parse_num(&caps[3])?, month, parse_num(&caps[2])? as u32)
        });
        push(&mut refs, m.start(), m.end(), span.map(DateSpan::day));
    }

    for caps in MONTH_YEAR.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        let span = month_number(&caps[1])
            .and_then(|month| DateSpan::month(parse_num(&caps[2])?, month));
        push(&mut refs, m.start(), m.end(), span);
    }

    for caps in PREP_YEAR.captures_iter(text) {
        let Some(m) = caps.get(1) else { continue };
        let span = parse_num(m.as_str()).and_then(DateSpan::year);
        push(&mut refs, m.start(), m.end(), span);
    }

    for caps in RELATIVE.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        let span = resolve_relative(&caps, context);
        push(&mut refs, m.start(), m.end(), span);
    }

    refs.sort_by_key(|r| r.start);
    refs
}

fn resolve_relative(caps: &regex::Captures<'_>, context: NaiveDate) -> Option<DateSpan> {
    let phrase = caps[1].to_lowercase();
    let phrase: Vec<&str> = phrase.split_whitespace().collect();

    match phrase.as_slice() {
        ["today"] => Some(DateSpan::day(context)),
        ["yesterday"] => Some(DateSpan::day(context - Duration::days(1))),
        ["tomorrow"] => Some(DateSpan::day(context + Duration::days(1))),
        [which, unit] if matches!(*which, "this" | "last" | "next") => {
            let offset: i32 = match *which {
                "last" => -1,
                "next" => 1,
                _ => 0,
            };
            match *unit {
                "week" => {
                    let monday = context - Duration::days(context.weekday().num_days_from_monday() as i64);
                    let start = monday + Duration::weeks(offset as i64);
                    Some(DateSpan {
                        start,
                        end: start + Duration::days(6),
                    })
                }
                "month" => {
                    let first = NaiveDate::from_ymd_opt(context.year(), context.month(), 1)?;
                    let first = shift_months(first, offset)?;
                    DateSpan::month(first.year(), first.month())
                }
                _ => DateSpan::year(context.year() + offset),
            }
        }
        _ => {
            let (amount, unit, sign) = if let Some(n) = caps.get(2) {
                (n.as_str(), caps.get(3)?.as_str(), -1)
            } else {
                (caps.get(4)?.as_str(), caps.get(5)?.as_str(), 1)
            };
            let amount: i64 = amount.parse().ok()?;
            let unit = unit.to_lowercase();
            let date = if unit.starts_with("day") {
                context + Duration::days(sign * amount)
            } else if unit.starts_with("week") {
                context + Duration::weeks(sign * amount)
            } else if unit.starts_with("month") {
                shift_months(context, (sign * amount) as i32)?
            } else {
                shift_months(context, (sign * amount * 12) as i32)?
            };
            Some(DateSpan::day(date))
        }
    }
}

fn shift_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    }
}

fn parse_num(raw: &str) -> Option<i32> {
    raw.parse().ok()
}

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let month = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ctx() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
    }

    fn validator() -> TemporalValidator {
        TemporalValidator::default()
    }

    #[test]
    fn test_month_year_scenario_present() {
        let v = validator().validate("In August 2025, inflation fell to 3%.", ctx());
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].date_text, "August 2025");
        assert_eq!(v[0].date_type, Some(DateType::Present));
        assert!(v[0].is_valid);
        assert!(v[0].confidence >= 90);
    }

    #[test]
    fn test_no_dates_scores_100() {
        let v = validator().validate("The moon is made of cheese.", ctx());
        assert!(v.is_empty());
        assert_eq!(TemporalValidator::score(&v), 100);
    }

    #[test]
    fn test_bands() {
        let v = validator();
        let past = v.validate("It happened on 2025-05-01.", ctx());
        assert_eq!(past[0].date_type, Some(DateType::Past));
        assert_eq!(past[0].confidence, 90);

        let near = v.validate("Launch is set for 2026-01-15.", ctx());
        assert_eq!(near[0].date_type, Some(DateType::NearFuture));
        assert!(near[0].is_valid);
        assert!((60..=80).contains(&near[0].confidence));

        let far = v.validate("Colonies by 2030-01-01.", ctx());
        assert_eq!(far[0].date_type, Some(DateType::FarFuture));
        assert!(!far[0].is_valid);
        assert_eq!(far[0].confidence, 20);

        let present = v.validate("As of 2025-09-20 prices rose.", ctx());
        assert_eq!(present[0].date_type, Some(DateType::Present));
        assert_eq!(present[0].confidence, 95);
    }

    #[test]
    fn test_old_dates_decay_to_floor() {
        let v = validator();
        let two_years = v.validate("Reported on 2023-06-01.", ctx());
        assert_eq!(two_years[0].date_type, Some(DateType::Past));
        assert!(two_years[0].confidence < 90 && two_years[0].confidence > 60);

        let ancient = v.validate("Signed in 1776.", ctx());
        assert_eq!(ancient[0].date_type, Some(DateType::Past));
        assert_eq!(ancient[0].confidence, 60);
        assert!(ancient[0].is_valid);
    }

    #[test]
    fn test_unparseable_is_explicit() {
        let v = validator().validate("Released 2025-13-45 and on February 30, 2024.", ctx());
        assert_eq!(v.len(), 2);
        for val in &v {
            assert!(!val.is_valid);
            assert_eq!(val.confidence, 0);
            assert_eq!(val.date_type, None);
        }
        assert_eq!(TemporalValidator::score(&v), 0);
    }

    #[test]
    fn test_overlapping_patterns_counted_once() {
        let v = validator().validate("On March 3, 2025 the vote passed.", ctx());
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].date_text, "March 3, 2025");
        assert_eq!(v[0].date_type, Some(DateType::Past));
    }

    #[test]
    fn test_relative_terms() {
        let v = validator().validate("Yesterday the index fell; next year it may rise.", ctx());
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].date_type, Some(DateType::Present));
        assert_eq!(v[1].date_type, Some(DateType::NearFuture));

        let v = validator().validate("Prices doubled 3 years ago.", ctx());
        assert_eq!(v[0].date_type, Some(DateType::Past));

        let v = validator().validate("The bridge opens in 5 years.", ctx());
        assert_eq!(v[0].date_type, Some(DateType::FarFuture));
    }

    #[test]
    fn test_bare_numbers_are_not_years() {
        let v = validator().validate("About 2000 people attended and 3% left.", ctx());
        assert!(v.is_empty());
        assert!(!has_date_reference("About 2000 people attended."));
    }

    #[test]
    fn test_date_mentions() {
        assert_eq!(
            date_mentions("Between 2020-01-01 and last year"),
            vec!["2020-01-01".to_string(), "last year".to_string()]
        );
    }

    #[test]
    fn test_score_is_mean() {
        let v = validator().validate("On 2025-09-01 and 2030-01-01.", ctx());
        assert_eq!(TemporalValidator::score(&v), 58);
    }
}
