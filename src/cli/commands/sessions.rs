//! Sessions command implementation.
//!
//! Lists canonical sessions, one row per distinct session id, with the
//! project each one belongs to and a few headline stats.

use crate::aggregate::CanonicalSession;
use crate::cli::{Cli, OutputFormat, SessionsArgs};
use crate::classify::SnapshotKind;
use crate::error::Result;

use super::{format_timestamp, print_warnings, run_pipeline_blocking, short_id};

/// Session row for JSON output.
#[derive(Debug, serde::Serialize)]
struct SessionRow<'a> {
    session_id: &'a str,
    title: &'a str,
    project: &'a str,
    kind: SnapshotKind,
    first_event_at: Option<chrono::DateTime<chrono::Utc>>,
    last_event_at: Option<chrono::DateTime<chrono::Utc>>,
    messages: usize,
    total_tokens: u64,
    fragments: usize,
}

/// Run the sessions command.
pub fn run(cli: &Cli, args: &SessionsArgs) -> Result<()> {
    let (output, _config) = run_pipeline_blocking(cli)?;
    print_warnings(&output);

    let mut sessions: Vec<&CanonicalSession> = output.sessions.iter().collect();
    if let Some(filter) = &args.project {
        sessions.retain(|s| {
            s.primary_project_id.contains(filter.as_str())
                || s.primary_project_path.contains(filter.as_str())
        });
    }
    // Most recent first for display; the pipeline keeps ingestion order.
    sessions.sort_by(|a, b| crate::parser::compare_recency(a.last_event_at, b.last_event_at));
    if let Some(limit) = args.limit {
        sessions.truncate(limit);
    }

    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    match cli.effective_output() {
        OutputFormat::Json => {
            let rows: Vec<SessionRow<'_>> = sessions.iter().map(|s| session_row(s)).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Tsv => {
            println!("id\ttitle\tproject\tkind\tlast_event\tmessages\ttokens");
            for s in &sessions {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    short_id(&s.session_id),
                    s.title,
                    s.primary_project_path,
                    kind_label(s.kind),
                    format_timestamp(s.last_event_at),
                    s.message_count(),
                    s.total_tokens
                );
            }
        }
        OutputFormat::Text => {
            println!("Sessions");
            println!("{}", "=".repeat(72));
            println!();
            for s in &sessions {
                let fragments = if s.path_usage.len() > 1 {
                    format!(" ({} paths)", s.path_usage.len())
                } else {
                    String::new()
                };
                println!(
                    "  {} │ {:40} │ {} │ {} msgs{}",
                    short_id(&s.session_id),
                    truncate_title(&s.title),
                    format_timestamp(s.last_event_at),
                    s.message_count(),
                    fragments
                );
            }
        }
    }

    Ok(())
}

fn session_row(s: &CanonicalSession) -> SessionRow<'_> {
    SessionRow {
        session_id: &s.session_id,
        title: &s.title,
        project: &s.primary_project_path,
        kind: s.kind,
        first_event_at: s.first_event_at,
        last_event_at: s.last_event_at,
        messages: s.message_count(),
        total_tokens: s.total_tokens,
        fragments: s.path_usage.len(),
    }
}

fn truncate_title(title: &str) -> String {
    crate::parser::truncate_preview(title, 40)
}

const fn kind_label(kind: SnapshotKind) -> &'static str {
    match kind {
        SnapshotKind::Chat => "chat",
        SnapshotKind::CodeActivity => "code-activity",
        SnapshotKind::System => "system",
    }
}
