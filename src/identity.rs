//! Resolving the global list of distinct projects.
//!
//! Workspace project ids are encoded directory names; the real path behind
//! each one is recovered from the history index when possible. The fallback
//! chain is fixed: a unique history path is `high` confidence, a collision
//! resolved by occurrence count is `medium`, a lossy decode of the id alone
//! is `low`. Activity stats prefer real per-session user messages and fall
//! back to history occurrence counts so every project shows some signal.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::aggregate::{CanonicalSession, GLOBAL_BUCKET_ID, SYSTEM_BUCKET_ID};
use crate::history::HistoryIndex;
use crate::parser::compare_recency;
use crate::pathcode::{self, PathConfidence, PathSource, ResolvedPath};
use crate::timeline::{classify_user_text, UserTextClass};

/// One distinct project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectIdentity {
    /// Raw encoded directory name; the stable key.
    pub id: String,
    /// Best-effort decoded or corroborated path.
    pub canonical_path: String,
    /// Where the canonical path came from.
    pub path_source: PathSource,
    /// How much to trust the canonical path.
    pub path_confidence: PathConfidence,
    /// Timestamp of the latest activity.
    pub last_active_at: Option<DateTime<Utc>>,
    /// Count of real user messages, or a history-derived fallback.
    pub query_count: u64,
}

/// Per-project activity derived from genuine user messages.
#[derive(Debug, Clone, Copy, Default)]
struct ActivityStats {
    query_count: u64,
    last_message_at: Option<DateTime<Utc>>,
}

/// Build one [`ProjectIdentity`] per distinct workspace project id.
///
/// Global and system buckets are excluded. Output is sorted descending by
/// `last_active_at`, projects without any timestamp last.
#[must_use]
pub fn resolve_projects(
    sessions: &[CanonicalSession],
    history: &HistoryIndex,
) -> Vec<ProjectIdentity> {
    // Authoritative activity signal: genuine user messages per project id.
    let mut activity: IndexMap<String, ActivityStats> = IndexMap::new();
    for session in sessions {
        if is_bucket_id(&session.primary_project_id) {
            continue;
        }
        let stats = activity
            .entry(session.primary_project_id.clone())
            .or_default();
        for event in &session.events {
            if !event.is_user_message() {
                continue;
            }
            let Some(text) = event.message_text() else {
                continue;
            };
            let text = text.trim();
            if text.is_empty() || classify_user_text(text) != UserTextClass::Query {
                continue;
            }
            stats.query_count += 1;
            if let Some(ts) = event.timestamp {
                if stats.last_message_at.map_or(true, |seen| ts > seen) {
                    stats.last_message_at = Some(ts);
                }
            }
        }
    }

    let mut projects: Vec<ProjectIdentity> = activity
        .iter()
        .map(|(id, stats)| build_identity(id, *stats, history))
        .collect();

    projects.sort_by(|a, b| compare_recency(a.last_active_at, b.last_active_at));
    projects
}

fn build_identity(id: &str, stats: ActivityStats, history: &HistoryIndex) -> ProjectIdentity {
    let resolved = resolve_canonical_path(id, history);

    // Real message stats win; otherwise keep the history-derived fallback so
    // the project still shows some activity.
    let (last_active_at, query_count) = if stats.query_count > 0 {
        (stats.last_message_at, stats.query_count)
    } else {
        let fallback = history.stats(&resolved.path);
        (fallback.last_seen, fallback.occurrences)
    };

    ProjectIdentity {
        id: id.to_string(),
        canonical_path: resolved.path,
        path_source: resolved.source,
        path_confidence: resolved.confidence,
        last_active_at,
        query_count,
    }
}

/// Apply the confidence-tagged fallback chain for one project id.
#[must_use]
pub fn resolve_canonical_path(id: &str, history: &HistoryIndex) -> ResolvedPath {
    // A legacy id recorded from `cwd` is already a literal path; decoding it
    // would mangle it.
    if !pathcode::looks_encoded(id) {
        return ResolvedPath::exact(id);
    }

    let candidates = history.paths_for_encoded(id);
    match candidates {
        [] => ResolvedPath::guessed(id),
        [only] => ResolvedPath::exact(only.clone()),
        _ => {
            // Collision: the most-visited path wins, not the most recent.
            let mut best: Option<(&String, u64)> = None;
            for path in candidates {
                let occurrences = history.stats(path).occurrences;
                if best.map_or(true, |(_, n)| occurrences > n) {
                    best = Some((path, occurrences));
                }
            }
            let (path, _) = best.expect("candidates non-empty");
            debug!(
                id,
                picked = %path,
                candidates = candidates.len(),
                "ambiguous encoded id resolved by occurrence count"
            );
            ResolvedPath::ambiguous(path.clone())
        }
    }
}

fn is_bucket_id(id: &str) -> bool {
    id == GLOBAL_BUCKET_ID || id == SYSTEM_BUCKET_ID
}
