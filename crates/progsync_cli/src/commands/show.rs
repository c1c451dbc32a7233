//! Show command implementation.

use clap::{Args, ValueEnum};
use progsync_client::{HttpTransport, Identity, SyncTransport};
use progsync_model::{DocumentState, OwnerId};
use std::fmt::Write as _;

/// Output format.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human-readable summary
    Text,
    /// The document state as JSON
    Json,
}

/// Arguments of `progsync show`.
#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Base URL of the sync server
    #[arg(long, default_value = "http://127.0.0.1:8080", env = "PROGSYNC_SERVER")]
    pub server: String,

    /// Owner whose document to show (sent as x-owner-id)
    #[arg(long, required_unless_present = "token")]
    pub owner: Option<String>,

    /// Bearer token, for servers with authentication
    #[arg(long, env = "PROGSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: Format,
}

/// Per-day completion summary.
#[derive(Debug, PartialEq, Eq)]
pub struct DaySummary {
    /// Day number.
    pub day_number: i64,
    /// Date label.
    pub date: String,
    /// Completed items.
    pub completed: usize,
    /// All items.
    pub total: usize,
    /// Tag texts.
    pub tags: Vec<String>,
}

/// Summarizes each day of a document.
pub fn summarize(state: &DocumentState) -> Vec<DaySummary> {
    state
        .data
        .iter()
        .map(|day| DaySummary {
            day_number: day.day_number,
            date: day.date.clone(),
            completed: day.items.iter().filter(|item| item.completed).count(),
            total: day.items.len(),
            tags: day.tags.iter().map(|tag| tag.text.clone()).collect(),
        })
        .collect()
}

/// Renders a document as a text report.
pub fn render_text(state: &DocumentState) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Version {} (last updated {})",
        state.version,
        state.last_updated.to_rfc3339()
    );
    for day in summarize(state) {
        let _ = write!(
            out,
            "  Day {:>3}  {}  {}/{} done",
            day.day_number, day.date, day.completed, day.total
        );
        if !day.tags.is_empty() {
            let _ = write!(out, "  [{}]", day.tags.join(", "));
        }
        out.push('\n');
    }
    out
}

/// Fetches and prints the document.
pub async fn run(args: ShowArgs) -> anyhow::Result<()> {
    let identity = match (args.token, args.owner) {
        (Some(token), _) => Identity::Bearer(token),
        (None, Some(owner)) => Identity::Owner(OwnerId::new(owner)),
        (None, None) => anyhow::bail!("either --owner or --token is required"),
    };

    let transport = HttpTransport::new(args.server, identity);
    let state = transport.fetch().await?;

    match args.format {
        Format::Text => print!("{}", render_text(&state)),
        Format::Json => println!("{}", serde_json::to_string_pretty(&state)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use progsync_model::{DaySnapshot, Difficulty, Item, ProgressDocument, Tag};

    fn state() -> DocumentState {
        let seeded = ProgressDocument::seeded(
            OwnerId::new("alice"),
            "2024-03-01T08:00:00Z".parse().unwrap(),
        );
        let mut state = DocumentState::from(seeded);
        state.data[0].items[1].completed = true;

        let mut day = DaySnapshot::new(2, "2024-03-02");
        day.items.push(Item::new("x", "Stretch", Difficulty::Easy));
        day.tags.push(Tag::new("rest", "#00aa00"));
        state.data.push(day);
        state
    }

    #[test]
    fn summary_counts_completion() {
        let summary = summarize(&state());
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].completed, 1);
        assert_eq!(summary[0].total, 3);
        assert_eq!(summary[1].tags, vec!["rest".to_string()]);
    }

    #[test]
    fn text_report_lists_days() {
        let text = render_text(&state());
        assert!(text.starts_with("Version 1 (last updated 2024-03-01T08:00:00+00:00)"));
        assert!(text.contains("Day   1  2024-03-01  1/3 done"));
        assert!(text.contains("Day   2  2024-03-02  0/1 done  [rest]"));
    }
}
