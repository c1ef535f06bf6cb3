pub mod check;
pub mod history;

use chrono::NaiveDate;
use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fact-check a piece of text
    Check {
        /// Claim text, up to 5000 characters
        text: String,
        /// Judge dates against this day instead of today (YYYY-MM-DD)
        #[arg(long)]
        context_date: Option<NaiveDate>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recently stored reports
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print a stored report
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
}

/// Cut `text` to at most `max` characters, marking the cut.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
