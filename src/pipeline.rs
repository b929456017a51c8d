//! The end-to-end reconstruction pipeline.
//!
//! Per-file parsing is a pure function of one file's bytes, so file loading
//! fans out across the I/O layer and the results are only combined after
//! every read completes. Aggregation and everything downstream run
//! single-threaded over that ordered accumulator: the plurality tie-break
//! depends on stable insertion order, so results are re-associated in the
//! caller-supplied source order regardless of read completion order.
//!
//! Nothing in a run is fatal: unreadable files and malformed lines degrade
//! to warnings and partial results are always returned.

use futures::future::join_all;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{self, CanonicalSession};
use crate::config::Config;
use crate::error::{IngestWarning, Result};
use crate::history::HistoryIndex;
use crate::identity::{self, ProjectIdentity};
use crate::model::EventSnapshot;
use crate::naming;
use crate::parser;
use crate::scan::{LogsRoot, SessionFileRef};
use crate::timeline::{self, ProjectTurn, ReconstructionContext};

/// One input file, fully loaded.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Logical path relative to the logs root.
    pub path: String,
    /// Full file text.
    pub content: String,
}

/// The product of one pipeline run.
#[derive(Debug, Serialize)]
pub struct PipelineOutput {
    /// Canonical sessions, one per distinct session id, in ingestion order.
    pub sessions: Vec<CanonicalSession>,
    /// Distinct workspace projects, most recently active first.
    pub projects: Vec<ProjectIdentity>,
    /// Minimal unique display name per project id.
    pub display_names: IndexMap<String, String>,
    /// All warnings accumulated during ingestion.
    pub warnings: Vec<IngestWarning>,
}

impl PipelineOutput {
    /// Sessions belonging to one project, in ingestion order.
    #[must_use]
    pub fn sessions_for_project(&self, project_id: &str) -> Vec<&CanonicalSession> {
        self.sessions
            .iter()
            .filter(|s| s.primary_project_id == project_id)
            .collect()
    }

    /// Replay one project's event stream into turns.
    #[must_use]
    pub fn project_turns(
        &self,
        ctx: &mut ReconstructionContext,
        project_id: &str,
        config: &Config,
    ) -> Vec<ProjectTurn> {
        let sessions = self.sessions_for_project(project_id);
        timeline::reconstruct_project_turns(ctx, project_id, &sessions, &config.display)
    }
}

/// Run the full pipeline over loaded sources.
///
/// `sources` order is the ingestion order and therefore part of the
/// contract: it drives grouping order and plurality tie-breaks.
#[must_use]
pub fn run_pipeline(sources: &[SourceFile], history_text: Option<&str>) -> PipelineOutput {
    let mut warnings = Vec::new();
    let mut snapshots: Vec<EventSnapshot> = Vec::new();

    for source in sources {
        let parsed = parser::parse_session_file(&source.path, &source.content);
        warnings.extend(parsed.warnings);
        if let Some(snapshot) = parsed.snapshot {
            snapshots.push(snapshot);
        }
    }

    let history = match history_text {
        Some(text) => {
            let (index, history_warnings) = HistoryIndex::parse(crate::scan::HISTORY_FILE_NAME, text);
            warnings.extend(history_warnings);
            index
        }
        None => HistoryIndex::default(),
    };

    let mut sessions = aggregate::aggregate_sessions(snapshots);
    for session in &mut sessions {
        history.backfill_title(session);
    }

    let projects = identity::resolve_projects(&sessions, &history);
    let display_names = naming::disambiguate(&projects);

    info!(
        sessions = sessions.len(),
        projects = projects.len(),
        warnings = warnings.len(),
        "pipeline run complete"
    );

    PipelineOutput {
        sessions,
        projects,
        display_names,
        warnings,
    }
}

/// Load session files concurrently, preserving the given order.
///
/// Reads fan out and are re-associated afterwards, so completion order
/// never leaks into the result. An unreadable file degrades to a warning.
pub async fn load_source_files(refs: &[SessionFileRef]) -> (Vec<SourceFile>, Vec<IngestWarning>) {
    let reads = refs.iter().map(|file| async move {
        let result = tokio::fs::read_to_string(&file.absolute_path).await;
        (file.logical_path.clone(), result)
    });

    let mut sources = Vec::with_capacity(refs.len());
    let mut warnings = Vec::new();
    for (path, result) in join_all(reads).await {
        match result {
            Ok(content) => sources.push(SourceFile { path, content }),
            Err(e) => {
                warn!(file = %path, error = %e, "unreadable file, skipping");
                warnings.push(IngestWarning::file(path, format!("unreadable: {e}")));
            }
        }
    }
    (sources, warnings)
}

/// Scan a logs root, load everything, and run the pipeline.
pub async fn run_from_root(root: &LogsRoot, config: &Config) -> Result<PipelineOutput> {
    let refs = root.session_files(config.ingest.include_agent_files)?;
    let (sources, mut load_warnings) = load_source_files(&refs).await;

    let history_path = root.history_path();
    let history_text = match tokio::fs::read_to_string(&history_path).await {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            load_warnings.push(IngestWarning::file(
                crate::scan::HISTORY_FILE_NAME,
                format!("unreadable: {e}"),
            ));
            None
        }
    };

    let mut output = run_pipeline(&sources, history_text.as_deref());
    // Load-phase warnings come first: they predate everything parse-phase.
    load_warnings.extend(output.warnings);
    output.warnings = load_warnings;
    Ok(output)
}
