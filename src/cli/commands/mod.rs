//! CLI command implementations.
//!
//! Each command is implemented in its own module with a `run` function
//! that handles the command logic.

pub mod projects;
pub mod report;
pub mod sessions;
pub mod timeline;

use chrono::{DateTime, Local, Utc};
use tokio::runtime::Runtime;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::{Result, StitchError};
use crate::identity::ProjectIdentity;
use crate::pipeline::{self, PipelineOutput};
use crate::scan::LogsRoot;

/// Resolve the logs root from CLI args or discover the default.
pub fn get_logs_root(cli: &Cli) -> Result<LogsRoot> {
    match &cli.logs_dir {
        Some(path) => LogsRoot::at(path),
        None => LogsRoot::discover(),
    }
}

/// Load configuration, honoring an explicit `--config` path.
pub fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Scan, load, and run the pipeline, blocking on the async I/O phase.
pub fn run_pipeline_blocking(cli: &Cli) -> Result<(PipelineOutput, Config)> {
    let root = get_logs_root(cli)?;
    let config = load_config(cli)?;
    let runtime =
        Runtime::new().map_err(|e| StitchError::io("Failed to start async runtime", e))?;
    let output = runtime.block_on(pipeline::run_from_root(&root, &config))?;
    Ok((output, config))
}

/// Find one project by id, canonical path, display name, or substring.
pub fn find_project<'a>(output: &'a PipelineOutput, key: &str) -> Result<&'a ProjectIdentity> {
    if let Some(found) = output
        .projects
        .iter()
        .find(|p| p.id == key || p.canonical_path == key)
    {
        return Ok(found);
    }
    if let Some(found) = output
        .projects
        .iter()
        .find(|p| output.display_names.get(&p.id).is_some_and(|n| n.as_str() == key))
    {
        return Ok(found);
    }
    let mut matches = output
        .projects
        .iter()
        .filter(|p| p.canonical_path.contains(key) || p.id.contains(key));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Ok(only),
        (Some(_), Some(_)) => Err(StitchError::InvalidArgument {
            name: "project".to_string(),
            reason: format!("'{key}' matches more than one project"),
        }),
        (None, _) => Err(StitchError::ProjectNotFound {
            project_id: key.to_string(),
        }),
    }
}

/// First eight characters of a session id, for listings.
///
/// Counts characters, not bytes: filename-derived ids are arbitrary text.
#[must_use]
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Format an optional UTC timestamp in local time, `-` when absent.
#[must_use]
pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(
        || "-".to_string(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

/// Print accumulated warnings to stderr.
pub fn print_warnings(output: &PipelineOutput) {
    for warning in &output.warnings {
        eprintln!("warning: {warning}");
    }
}
