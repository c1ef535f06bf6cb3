use chrono::{TimeZone, Utc};

use claimcheck::AppState;

use super::check::print_report;
use super::truncate;

pub async fn history(state: &AppState, limit: usize) -> anyhow::Result<()> {
    let rows = state.store.recent(limit).await?;
    if rows.is_empty() {
        println!("No reports stored yet. Run `claimcheck check \"...\"` to create one.");
        return Ok(());
    }

    for row in rows {
        let when = Utc
            .timestamp_millis_opt(row.created_at)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let verdict = row.verdict.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string());
        let score = row
            .final_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {}  {:<14} {:>3}  {}",
            row.id,
            when,
            verdict,
            score,
            truncate(&row.excerpt, 60)
        );
    }
    Ok(())
}

pub async fn show(state: &AppState, id: &str, json: bool) -> anyhow::Result<()> {
    match state.store.load(id).await? {
        Some(report) => print_report(&report, json),
        None => anyhow::bail!("no stored report with id {}", id),
    }
}
