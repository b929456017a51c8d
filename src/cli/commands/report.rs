//! Report command implementation.
//!
//! One full pipeline run, summarized: project and session counts, warning
//! detail, and optionally per-session path-usage history. The JSON form is
//! the complete pipeline output and is the machine-readable surface of the
//! tool.

use crate::cli::{Cli, OutputFormat, ReportArgs};
use crate::error::Result;

use super::{format_timestamp, run_pipeline_blocking, short_id};

/// Run the report command.
pub fn run(cli: &Cli, args: &ReportArgs) -> Result<()> {
    let (output, _config) = run_pipeline_blocking(cli)?;

    match cli.effective_output() {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("metric\tvalue");
            println!("sessions\t{}", output.sessions.len());
            println!("projects\t{}", output.projects.len());
            println!("warnings\t{}", output.warnings.len());
        }
        OutputFormat::Text => {
            println!("Reconstruction Report");
            println!("{}", "=".repeat(72));
            println!();
            println!("  Sessions:  {}", output.sessions.len());
            println!("  Projects:  {}", output.projects.len());
            println!("  Warnings:  {}", output.warnings.len());

            let split_sessions: Vec<_> = output
                .sessions
                .iter()
                .filter(|s| s.path_usage.len() > 1)
                .collect();
            if !split_sessions.is_empty() {
                println!();
                println!(
                    "  {} sessions were reassembled from multiple paths:",
                    split_sessions.len()
                );
                for session in &split_sessions {
                    println!(
                        "    {} ({} paths)",
                        short_id(&session.session_id),
                        session.path_usage.len()
                    );
                    if args.paths {
                        for usage in &session.path_usage {
                            println!(
                                "      {} │ {} → {} │ {} msgs",
                                usage.path,
                                format_timestamp(usage.first_seen),
                                format_timestamp(usage.last_seen),
                                usage.message_count
                            );
                        }
                    }
                }
            }

            if !output.warnings.is_empty() {
                println!();
                println!("  Warnings:");
                for warning in &output.warnings {
                    println!("    {warning}");
                }
            }
        }
    }

    Ok(())
}
