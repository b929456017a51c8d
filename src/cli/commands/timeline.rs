//! Timeline command implementation.
//!
//! Replays one project's merged event stream as conversation turns. Each
//! turn shows the user query, a reply preview, and optionally the full
//! action list.

use crate::cli::{Cli, OutputFormat, TimelineArgs};
use crate::error::Result;
use crate::timeline::{ActionKind, ProjectTurn, ReconstructionContext};

use super::{find_project, format_timestamp, print_warnings, run_pipeline_blocking};

/// Run the timeline command.
pub fn run(cli: &Cli, args: &TimelineArgs) -> Result<()> {
    let (output, config) = run_pipeline_blocking(cli)?;
    print_warnings(&output);

    let project = find_project(&output, &args.project)?;
    let project_id = project.id.clone();
    let project_path = project.canonical_path.clone();

    let mut ctx = ReconstructionContext::new();
    let mut turns = output.project_turns(&mut ctx, &project_id, &config);
    if let Some(limit) = args.limit {
        let drop = turns.len().saturating_sub(limit);
        turns.drain(..drop);
    }

    if turns.is_empty() {
        println!("No turns found for {project_path}.");
        return Ok(());
    }

    match cli.effective_output() {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&turns)?);
        }
        OutputFormat::Tsv => {
            println!("timestamp\tsession\tquery\tactions");
            for turn in &turns {
                println!(
                    "{}\t{}\t{}\t{}",
                    format_timestamp(turn.timestamp),
                    turn.session_id.as_deref().unwrap_or("-"),
                    single_line(&turn.user_query),
                    turn.actions.len()
                );
            }
        }
        OutputFormat::Text => {
            println!("Timeline: {project_path}");
            println!("{}", "=".repeat(72));
            for turn in &turns {
                print_turn(turn, args.actions);
            }
        }
    }

    Ok(())
}

fn print_turn(turn: &ProjectTurn, show_actions: bool) {
    println!();
    let length_note = if turn.is_long_input {
        format!(" [{} chars, {} lines]", turn.char_count, turn.line_count)
    } else {
        String::new()
    };
    println!(
        "● {} {}{}",
        format_timestamp(turn.timestamp),
        single_line(&turn.user_query),
        length_note
    );

    for note in &turn.guardrails {
        println!("  ⚠ {}", single_line(note));
    }
    for event in &turn.context_events {
        println!("  ⟲ {}", single_line(&event.text));
    }
    for note in &turn.system_notes {
        println!("  · {}", single_line(note));
    }

    if show_actions {
        for action in &turn.actions {
            let marker = match action.kind {
                ActionKind::Tool => "→",
                ActionKind::Subagent => "⇒",
                ActionKind::ToolResult => {
                    if action.is_error {
                        "✗"
                    } else {
                        "←"
                    }
                }
                ActionKind::Snapshot => "◆",
                ActionKind::Other => "·",
            };
            println!("  {} {}", marker, single_line(&action.label));
        }
    } else if !turn.actions.is_empty() {
        println!("  ({} actions)", turn.actions.len());
    }

    if !turn.thinking_preview.is_empty() {
        println!("  ┊ {}", single_line(&turn.thinking_preview));
    }
    if !turn.reply_preview.is_empty() {
        println!("  ▷ {}", single_line(&turn.reply_preview));
    }
}

fn single_line(text: &str) -> String {
    text.replace('\n', " ")
}
