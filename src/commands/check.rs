use std::fmt::Write;

use chrono::NaiveDate;
use tracing::{info, warn};

use claimcheck::types::{EvidenceStrength, FactCheckReport, SupportType};
use claimcheck::{cancel_pair, AppState, FactCheckRequest};

use super::truncate;

const SNIPPET_CHARS: usize = 160;

/// Run one fact check. Ctrl-C cancels the run; whatever was gathered by
/// then is still reported.
pub async fn check(
    state: &AppState,
    text: String,
    context_date: Option<NaiveDate>,
    json: bool,
) -> anyhow::Result<()> {
    let (handle, signal) = cancel_pair();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing with partial results");
            handle.cancel();
        }
    });

    let request = FactCheckRequest { text, context_date };
    let result = state.orchestrator.check(request, signal).await;
    interrupt.abort();
    let report = result?;

    info!(report_id = %report.id, verdict = %report.verdict, "check finished");
    print_report(&report, json)
}

pub fn print_report(report: &FactCheckReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render(report));
    }
    Ok(())
}

fn support_label(support: SupportType) -> &'static str {
    match support {
        SupportType::Supporting => "supports",
        SupportType::Contradicting => "contradicts",
        SupportType::Neutral => "neutral",
    }
}

fn strength_label(strength: EvidenceStrength) -> &'static str {
    match strength {
        EvidenceStrength::Insufficient => "insufficient",
        EvidenceStrength::Weak => "weak",
        EvidenceStrength::Moderate => "moderate",
        EvidenceStrength::Strong => "strong",
    }
}

/// Human-readable report for the terminal.
pub fn render(report: &FactCheckReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &FactCheckReport) -> std::fmt::Result {
    writeln!(
        out,
        "Verdict: {} (score {}/100, {} evidence)",
        report.verdict.to_string().to_uppercase(),
        report.final_score,
        strength_label(report.evidence_strength)
    )?;
    writeln!(out, "Claim:   {}", truncate(&report.original_text, 200))?;

    if report.atomic_claims.len() > 1 {
        writeln!(out, "\nAtomic claims")?;
        for claim in &report.atomic_claims {
            writeln!(out, "  - [p{}] {}", claim.priority, claim.text)?;
        }
    }

    writeln!(out, "\nScore breakdown")?;
    for entry in &report.score_breakdown.entries {
        writeln!(
            out,
            "  {:<20} {:>3}  (raw {:>3}, weight {:.2})  {}",
            entry.metric, entry.score, entry.raw_score, entry.weight, entry.reasoning
        )?;
    }

    let c = &report.consensus;
    writeln!(
        out,
        "\nConsensus {}: {} supporting, {} contradicting, {} neutral, {} reliable",
        c.consensus_score, c.supporting_count, c.contradicting_count, c.neutral_count, c.reliable_sources_count
    )?;

    if !report.temporal_summary.validations.is_empty() {
        writeln!(out, "\nDates (score {})", report.temporal_summary.score)?;
        for v in &report.temporal_summary.validations {
            let kind = v
                .date_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "unparseable".to_string());
            writeln!(
                out,
                "  - \"{}\": {}, {}, confidence {}",
                v.date_text,
                kind,
                if v.is_valid { "valid" } else { "invalid" },
                v.confidence
            )?;
        }
    }

    writeln!(out, "\nEvidence ({})", report.evidence.len())?;
    for (i, item) in report.evidence.iter().enumerate() {
        let label = match &item.rating {
            Some(rating) => format!("{}, rated {}", support_label(item.support_type), rating),
            None => support_label(item.support_type).to_string(),
        };
        writeln!(
            out,
            "  {}. [{}] {} (credibility {}, relevance {})",
            i + 1,
            label,
            if item.title.is_empty() { &item.publisher } else { &item.title },
            item.credibility_score,
            item.relevance_score
        )?;
        writeln!(out, "     {}", item.url)?;
        if !item.snippet.is_empty() {
            writeln!(out, "     {}", truncate(&item.snippet, SNIPPET_CHARS))?;
        }
    }

    if !report.reasoning.is_empty() {
        writeln!(out, "\nReasoning")?;
        for line in &report.reasoning {
            writeln!(out, "  - {}", line)?;
        }
    }

    if !report.warnings.is_empty() {
        writeln!(out, "\nWarnings")?;
        for w in &report.warnings {
            writeln!(out, "  ! {}", w)?;
        }
    }

    let m = &report.metadata;
    writeln!(
        out,
        "\nReport {} | {} ms | {} queries | sources: {}",
        report.id,
        m.processing_time_ms,
        m.queries_executed,
        if m.sources_consulted.is_empty() {
            "none".to_string()
        } else {
            m.sources_consulted.join(", ")
        }
    )
}
