//! The auxiliary chronological history index.
//!
//! `history.jsonl` records one entry per prompt the tool ever ran, with the
//! raw (unencoded) project path. It is the only evidence available for
//! reversing the lossy directory-name encoding: several raw paths can
//! collide on the same encoded id, and occurrence counts decide the winner.
//! Entries missing `timestamp` or `project` are structurally incomplete and
//! silently discarded; lines that fail to parse are recorded as warnings.

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::warn;

use crate::aggregate::CanonicalSession;
use crate::error::IngestWarning;
use crate::pathcode;

/// Title backfill only applies when a history entry's timestamp falls
/// within this window of the session's start.
const TITLE_MATCH_WINDOW_SECS: i64 = 5;

/// One history entry. `display` is the prompt text the tool showed.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    /// Entry timestamp.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Raw project path string.
    #[serde(default)]
    pub project: Option<String>,
    /// Display text for the prompt.
    #[serde(default)]
    pub display: Option<String>,
}

/// Aggregate statistics for one raw path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathStats {
    /// Latest entry timestamp for this path.
    pub last_seen: Option<DateTime<Utc>>,
    /// Number of entries for this path.
    pub occurrences: u64,
}

/// The parsed history index.
#[derive(Debug, Default)]
pub struct HistoryIndex {
    entries: Vec<HistoryEntry>,
    path_stats: IndexMap<String, PathStats>,
    by_encoded: IndexMap<String, Vec<String>>,
}

impl HistoryIndex {
    /// Parse `history.jsonl` content leniently.
    ///
    /// `file` is the logical path used in warnings.
    #[must_use]
    pub fn parse(file: &str, content: &str) -> (Self, Vec<IngestWarning>) {
        let mut index = Self::default();
        let mut warnings = Vec::new();

        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(trimmed) {
                Ok(entry) => index.push(entry),
                Err(e) => {
                    warn!(file, line = idx + 1, error = %e, "skipping malformed history line");
                    warnings.push(IngestWarning::line(file, idx + 1, "invalid JSON record"));
                }
            }
        }

        (index, warnings)
    }

    fn push(&mut self, entry: HistoryEntry) {
        // Entries without a timestamp or project cannot correlate anything.
        let (Some(ts), Some(project)) = (entry.timestamp, entry.project.clone()) else {
            return;
        };

        let stats = self.path_stats.entry(project.clone()).or_default();
        stats.occurrences += 1;
        if stats.last_seen.map_or(true, |seen| ts > seen) {
            stats.last_seen = Some(ts);
        }

        let encoded = pathcode::encode_path(&project);
        let paths = self.by_encoded.entry(encoded).or_default();
        if !paths.contains(&project) {
            paths.push(project);
        }

        self.entries.push(entry);
    }

    /// All raw paths that encode to the given id, in first-seen order.
    #[must_use]
    pub fn paths_for_encoded(&self, encoded_id: &str) -> &[String] {
        self.by_encoded
            .get(encoded_id)
            .map_or(&[], Vec::as_slice)
    }

    /// Aggregate stats for one raw path.
    #[must_use]
    pub fn stats(&self, path: &str) -> PathStats {
        self.path_stats.get(path).copied().unwrap_or_default()
    }

    /// Whether the index holds any entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Backfill a session's title from a matching history entry.
    ///
    /// A history entry matches when its timestamp is within 5 seconds of the
    /// session's start and either the normalized project path or the project
    /// id matches exactly.
    pub fn backfill_title(&self, session: &mut CanonicalSession) {
        let Some(started_at) = session.first_event_at else {
            return;
        };
        let window = Duration::seconds(TITLE_MATCH_WINDOW_SECS);

        for entry in &self.entries {
            let (Some(ts), Some(project)) = (entry.timestamp, entry.project.as_deref()) else {
                continue;
            };
            let delta = if ts > started_at {
                ts - started_at
            } else {
                started_at - ts
            };
            if delta > window {
                continue;
            }
            let path_matches = project.trim_end_matches('/')
                == session.primary_project_path.trim_end_matches('/');
            let id_matches = pathcode::encode_path(project) == session.primary_project_id;
            if path_matches || id_matches {
                if let Some(display) = entry.display.as_deref() {
                    if !display.trim().is_empty() {
                        session.title = display.trim().to_string();
                    }
                }
                return;
            }
        }
    }
}
