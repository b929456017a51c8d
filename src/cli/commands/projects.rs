//! Projects command implementation.
//!
//! Lists every distinct workspace project, most recently active first,
//! with the resolved path and how much that path can be trusted.

use crate::cli::{Cli, OutputFormat, ProjectsArgs};
use crate::error::Result;
use crate::identity::ProjectIdentity;
use crate::pathcode::{PathConfidence, PathSource};
use crate::pipeline::PipelineOutput;

use super::{format_timestamp, print_warnings, run_pipeline_blocking};

/// Project row for JSON output.
#[derive(Debug, serde::Serialize)]
struct ProjectRow<'a> {
    id: &'a str,
    display_name: &'a str,
    path: &'a str,
    path_source: PathSource,
    path_confidence: PathConfidence,
    last_active_at: Option<chrono::DateTime<chrono::Utc>>,
    query_count: u64,
}

/// Run the projects command.
pub fn run(cli: &Cli, args: &ProjectsArgs) -> Result<()> {
    let (output, _config) = run_pipeline_blocking(cli)?;
    print_warnings(&output);

    let mut projects: Vec<&ProjectIdentity> = output.projects.iter().collect();
    if let Some(min) = args.min_confidence {
        let min: PathConfidence = min.into();
        projects.retain(|p| p.path_confidence >= min);
    }
    if let Some(limit) = args.limit {
        projects.truncate(limit);
    }

    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    match cli.effective_output() {
        OutputFormat::Json => {
            let rows: Vec<ProjectRow<'_>> = projects
                .iter()
                .map(|p| ProjectRow {
                    id: &p.id,
                    display_name: display_name(&output, p),
                    path: &p.canonical_path,
                    path_source: p.path_source,
                    path_confidence: p.path_confidence,
                    last_active_at: p.last_active_at,
                    query_count: p.query_count,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Tsv => {
            println!("name\tpath\tconfidence\tlast_active\tqueries");
            for p in &projects {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    display_name(&output, p),
                    p.canonical_path,
                    confidence_label(p.path_confidence),
                    format_timestamp(p.last_active_at),
                    p.query_count
                );
            }
        }
        OutputFormat::Text => {
            println!("Projects");
            println!("{}", "=".repeat(72));
            println!();
            for p in &projects {
                let marker = match p.path_confidence {
                    PathConfidence::High => " ",
                    PathConfidence::Medium => "~",
                    PathConfidence::Low => "?",
                };
                println!(
                    "{} {:30} {:5} queries  {}  {}",
                    marker,
                    display_name(&output, p),
                    p.query_count,
                    format_timestamp(p.last_active_at),
                    p.canonical_path
                );
            }
            println!();
            println!("  ~ path picked among collisions, ? path guessed from encoding");
        }
    }

    Ok(())
}

/// The disambiguated display name, falling back to the canonical path.
fn display_name<'a>(output: &'a PipelineOutput, p: &'a ProjectIdentity) -> &'a str {
    output
        .display_names
        .get(&p.id)
        .map_or(p.canonical_path.as_str(), String::as_str)
}

const fn confidence_label(confidence: PathConfidence) -> &'static str {
    match confidence {
        PathConfidence::High => "high",
        PathConfidence::Medium => "medium",
        PathConfidence::Low => "low",
    }
}
