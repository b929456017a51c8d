//! Merging per-file snapshots into canonical sessions.
//!
//! A logical conversation is routinely split across several physical files:
//! directory moves, CLI restarts, and resumed sessions each open a new file
//! under a (possibly different) encoded project directory. This module
//! groups all snapshots sharing a session id and resolves, per group, one
//! primary project by plurality vote.
//!
//! Ordering contract: vote tallies are kept in an [`IndexMap`], so iteration
//! order equals snapshot ingestion order, and a tie at the maximum count is
//! won by the id first encountered at that count. Callers that need
//! deterministic output must feed snapshots in a deterministic order.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::classify::{FeatureFlags, SnapshotKind};
use crate::model::{EventSnapshot, RawEvent, UNKNOWN_PROJECT_PATH};
use crate::pathcode;

/// Bucket id for path-less chat sessions.
pub const GLOBAL_BUCKET_ID: &str = "global";

/// Bucket id for path-less file-history sessions.
pub const SYSTEM_BUCKET_ID: &str = "system";

/// The user-facing session, merged from every snapshot sharing its id.
///
/// Display fields (title, events, token totals, model counts) come from the
/// base snapshot only; the primary project and path-usage history are
/// resolved across the whole group.
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalSession {
    /// The shared session id.
    pub session_id: String,
    /// Display title, from the base snapshot (possibly backfilled later
    /// from the history index).
    pub title: String,
    /// Primary project id resolved by plurality vote across the group.
    pub primary_project_id: String,
    /// Display path for the primary project.
    pub primary_project_path: String,
    /// Full event list of the base snapshot.
    pub events: Vec<RawEvent>,
    /// Earliest event timestamp of the base snapshot.
    pub first_event_at: Option<DateTime<Utc>>,
    /// Latest event timestamp of the base snapshot.
    pub last_event_at: Option<DateTime<Utc>>,
    /// Token total of the base snapshot.
    pub total_tokens: u64,
    /// Per-model message counts of the base snapshot.
    pub model_counts: IndexMap<String, usize>,
    /// Feature flags OR-merged across every snapshot in the group.
    pub features: FeatureFlags,
    /// Categorical kind derived from the merged flags.
    pub kind: SnapshotKind,
    /// One entry per distinct path string the session was seen under.
    pub path_usage: Vec<PathUsage>,
}

impl CanonicalSession {
    /// Number of chat messages (user or assistant) in the base event list.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_chat_message()).count()
    }
}

/// Usage history for one distinct path a session was seen under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathUsage {
    /// The path string as resolved per snapshot.
    pub path: String,
    /// Earliest event timestamp seen under this path.
    pub first_seen: Option<DateTime<Utc>>,
    /// Latest event timestamp seen under this path.
    pub last_seen: Option<DateTime<Utc>>,
    /// Chat messages accumulated under this path.
    pub message_count: usize,
}

/// Group snapshots by session id and merge each group into one
/// [`CanonicalSession`]. Snapshots without a session id are dropped.
///
/// Insertion order of `snapshots` is significant: it drives both the group
/// iteration order of the output and the plurality tie-break.
#[must_use]
pub fn aggregate_sessions(snapshots: Vec<EventSnapshot>) -> Vec<CanonicalSession> {
    let mut groups: IndexMap<String, Vec<EventSnapshot>> = IndexMap::new();
    for snapshot in snapshots {
        match snapshot.session_id.clone() {
            Some(id) => groups.entry(id).or_default().push(snapshot),
            None => {
                debug!(file = %snapshot.source_file, "dropping snapshot without session id");
            }
        }
    }

    groups
        .into_iter()
        .filter_map(|(session_id, group)| merge_group(session_id, group))
        .collect()
}

/// Resolve the project id one snapshot votes for.
///
/// A directory id is authoritative. Path-less snapshots fall into the fixed
/// global/system buckets by kind. A bare path is a legacy id recorded from
/// `cwd` before directory encoding existed.
#[must_use]
pub fn resolved_project_id(snapshot: &EventSnapshot) -> Option<String> {
    if let Some(dir_id) = &snapshot.directory_id {
        return Some(dir_id.clone());
    }
    if snapshot.project_path == UNKNOWN_PROJECT_PATH {
        return match snapshot.features.kind() {
            SnapshotKind::Chat => Some(GLOBAL_BUCKET_ID.to_string()),
            SnapshotKind::CodeActivity => Some(SYSTEM_BUCKET_ID.to_string()),
            SnapshotKind::System => None,
        };
    }
    Some(snapshot.project_path.clone())
}

/// Plurality vote with first-at-max tie-break over an ordered id sequence.
///
/// Tallies are iterated in insertion order with a strict `>` comparison, so
/// for the tied sequence `[A, B, A, B]` the winner is `A`.
#[must_use]
pub fn plurality_vote<I>(ids: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let mut tally: IndexMap<String, usize> = IndexMap::new();
    for id in ids {
        *tally.entry(id).or_insert(0) += 1;
    }

    let mut winner: Option<(&String, usize)> = None;
    for (id, count) in &tally {
        if winner.map_or(true, |(_, best)| *count > best) {
            winner = Some((id, *count));
        }
    }
    winner.map(|(id, _)| id.clone())
}

fn merge_group(session_id: String, group: Vec<EventSnapshot>) -> Option<CanonicalSession> {
    // Primary project: plurality over each snapshot's resolved id.
    let primary_project_id = plurality_vote(group.iter().filter_map(resolved_project_id));

    // Base snapshot: latest lastEventAt, first encountered wins ties.
    let mut base_idx: Option<usize> = None;
    for (i, snapshot) in group.iter().enumerate() {
        let better = match base_idx {
            None => true,
            Some(b) => is_later(snapshot.last_event_at, group[b].last_event_at),
        };
        if better {
            base_idx = Some(i);
        }
    }
    let base_idx = base_idx?;

    // Merge flags across the whole group before moving the base out.
    let mut features = FeatureFlags::default();
    for snapshot in &group {
        features.or_merge(&snapshot.features);
    }

    // Path usage is grouped by the path *string*, not by resolved id.
    let mut usage: IndexMap<String, PathUsage> = IndexMap::new();
    for snapshot in &group {
        let entry = usage
            .entry(snapshot.project_path.clone())
            .or_insert_with(|| PathUsage {
                path: snapshot.project_path.clone(),
                first_seen: None,
                last_seen: None,
                message_count: 0,
            });
        entry.first_seen = earliest(entry.first_seen, snapshot.first_event_at);
        entry.last_seen = latest(entry.last_seen, snapshot.last_event_at);
        entry.message_count += snapshot.message_count();
    }

    let primary_project_id = primary_project_id?;
    let mut group = group;
    let base = group.swap_remove(base_idx);

    // Encoded ids get a decoded display path; legacy ids keep the base
    // snapshot's own path.
    let primary_project_path = if pathcode::looks_encoded(&primary_project_id) {
        pathcode::decode_encoded_id(&primary_project_id)
    } else {
        base.project_path.clone()
    };

    Some(CanonicalSession {
        session_id,
        title: base.title,
        primary_project_id,
        primary_project_path,
        events: base.events,
        first_event_at: base.first_event_at,
        last_event_at: base.last_event_at,
        total_tokens: base.total_tokens,
        model_counts: base.model_counts,
        kind: features.kind(),
        features,
        path_usage: usage.into_values().collect(),
    })
}

/// Strictly-later comparison, absent timestamps losing to present ones.
fn is_later(candidate: Option<DateTime<Utc>>, current: Option<DateTime<Utc>>) -> bool {
    match (candidate, current) {
        (Some(c), Some(b)) => c > b,
        (Some(_), None) => true,
        _ => false,
    }
}

fn earliest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (v, None) | (None, v) => v,
    }
}

fn latest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (v, None) | (None, v) => v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_session_file;

    fn snapshot(path: &str, lines: &[&str]) -> EventSnapshot {
        parse_session_file(path, &lines.join("\n")).snapshot.unwrap()
    }

    fn user_line(session: &str, ts: &str, text: &str) -> String {
        format!(
            r#"{{"sessionId":"{session}","timestamp":"{ts}","type":"user","message":{{"role":"user","content":"{text}"}}}}"#
        )
    }

    #[test]
    fn test_plurality_first_at_max_wins() {
        // [A, B, A] then [B]: tied at 2, A was first to reach the max
        let ids = ["A", "B", "A", "B"].map(String::from);
        assert_eq!(plurality_vote(ids).as_deref(), Some("A"));
    }

    #[test]
    fn test_plurality_clear_winner() {
        let ids = ["B", "A", "A"].map(String::from);
        assert_eq!(plurality_vote(ids).as_deref(), Some("A"));
        assert_eq!(plurality_vote(Vec::<String>::new()), None);
    }

    #[test]
    fn test_single_session_single_file() {
        let s = snapshot(
            "projects/-home-me-app/s1.jsonl",
            &[&user_line("s1", "2026-01-05T10:00:00Z", "hello")],
        );
        let sessions = aggregate_sessions(vec![s]);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].primary_project_id, "-home-me-app");
        assert_eq!(sessions[0].primary_project_path, "/home/me/app");
        assert_eq!(sessions[0].path_usage.len(), 1);
    }

    #[test]
    fn test_split_session_votes_for_majority_project() {
        let a1 = snapshot(
            "projects/-home-me-app/s1.jsonl",
            &[&user_line("s1", "2026-01-05T10:00:00Z", "one")],
        );
        let b = snapshot(
            "projects/-home-me-other/s1.jsonl",
            &[&user_line("s1", "2026-01-05T11:00:00Z", "two")],
        );
        let a2 = snapshot(
            "projects/-home-me-app/s1-resumed.jsonl",
            &[&user_line("s1", "2026-01-05T12:00:00Z", "three")],
        );

        let sessions = aggregate_sessions(vec![a1, b, a2]);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].primary_project_id, "-home-me-app");
        // Base snapshot is the latest one; its title wins
        assert_eq!(sessions[0].title, "three");
        // Two distinct path strings were seen
        assert_eq!(sessions[0].path_usage.len(), 2);
    }

    #[test]
    fn test_every_session_id_maps_to_one_session() {
        let s1a = snapshot(
            "projects/-a/s1.jsonl",
            &[&user_line("s1", "2026-01-05T10:00:00Z", "x")],
        );
        let s1b = snapshot(
            "projects/-b/s1-cont.jsonl",
            &[&user_line("s1", "2026-01-05T11:00:00Z", "y")],
        );
        let s2 = snapshot(
            "projects/-a/s2.jsonl",
            &[&user_line("s2", "2026-01-05T10:30:00Z", "z")],
        );

        let sessions = aggregate_sessions(vec![s1a, s1b, s2]);
        assert_eq!(sessions.len(), 2);
        let ids: Vec<&str> = sessions.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, ["s1", "s2"]);
    }

    #[test]
    fn test_snapshot_without_session_id_is_dropped() {
        // Parsing always supplies a filename-derived id, so clear it to
        // exercise the drop branch directly.
        let mut orphan = snapshot(
            "projects/-a/s1.jsonl",
            &[&user_line("s1", "2026-01-05T10:00:00Z", "x")],
        );
        orphan.session_id = None;
        assert!(aggregate_sessions(vec![orphan]).is_empty());
    }

    #[test]
    fn test_pathless_chat_goes_to_global_bucket() {
        let content = r#"{"sessionId":"s1","timestamp":"2026-01-05T10:00:00Z","type":"user","message":{"role":"user","content":"hi"}}"#;
        let mut s = parse_session_file("projects/s1.jsonl", content).snapshot.unwrap();
        assert!(s.directory_id.is_none());
        s.project_path = UNKNOWN_PROJECT_PATH.to_string();

        assert_eq!(resolved_project_id(&s).as_deref(), Some(GLOBAL_BUCKET_ID));
    }

    #[test]
    fn test_pathless_file_history_goes_to_system_bucket() {
        let content = r#"{"sessionId":"s1","type":"file-history-snapshot","snapshot":{"trackedFileBackups":{}}}"#;
        let s = parse_session_file("projects/s1.jsonl", content).snapshot.unwrap();
        assert_eq!(s.project_path, UNKNOWN_PROJECT_PATH);
        assert_eq!(resolved_project_id(&s).as_deref(), Some(SYSTEM_BUCKET_ID));
    }

    #[test]
    fn test_legacy_path_id() {
        let content = r#"{"sessionId":"s1","cwd":"/home/me/legacy","type":"user","message":{"role":"user","content":"hi"}}"#;
        let s = parse_session_file("projects/s1.jsonl", content).snapshot.unwrap();
        assert_eq!(resolved_project_id(&s).as_deref(), Some("/home/me/legacy"));

        let sessions = aggregate_sessions(vec![s]);
        // Legacy id is not encoded, so the display path stays as-is
        assert_eq!(sessions[0].primary_project_path, "/home/me/legacy");
    }

    #[test]
    fn test_feature_flags_or_merged_across_group() {
        let chat = snapshot(
            "projects/-a/s1.jsonl",
            &[&user_line("s1", "2026-01-05T10:00:00Z", "hi")],
        );
        let files = snapshot(
            "projects/-a/s1-files.jsonl",
            &[r#"{"sessionId":"s1","timestamp":"2026-01-05T09:00:00Z","type":"file-history-snapshot","snapshot":{"trackedFileBackups":{"a":1}}}"#],
        );

        let sessions = aggregate_sessions(vec![files, chat]);
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].features.has_chat_messages);
        assert!(sessions[0].features.has_file_snapshots);
        // Any chat content makes the whole session chat
        assert_eq!(sessions[0].kind, SnapshotKind::Chat);
    }
}
