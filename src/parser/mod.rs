//! Per-file parsing of session logs into event snapshots.
//!
//! One invocation is a pure function of one file's logical path and text
//! content. Malformed lines never abort the file: each one is recorded as an
//! [`IngestWarning`] with its 1-indexed line number and parsing continues.
//! A file with zero valid events produces no snapshot at all.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::classify;
use crate::error::IngestWarning;
use crate::model::{EventSnapshot, RawEvent, UNKNOWN_PROJECT_PATH};
use crate::pathcode;

/// Path segment under which per-project session directories live.
pub const PROJECTS_SEGMENT: &str = "projects";

/// Maximum derived-title length in characters.
const TITLE_MAX_LEN: usize = 80;

/// The product of parsing one file: a snapshot (when any event parsed) plus
/// the warnings accumulated along the way.
#[derive(Debug)]
pub struct ParsedFile {
    /// The snapshot, absent when the file held zero valid events.
    pub snapshot: Option<EventSnapshot>,
    /// Recoverable per-line problems.
    pub warnings: Vec<IngestWarning>,
}

/// Parse one session file into an [`EventSnapshot`].
///
/// `path` is the file's logical path (relative to the logs root, forward
/// slashes); `content` is its full text.
#[must_use]
pub fn parse_session_file(path: &str, content: &str) -> ParsedFile {
    let mut warnings = Vec::new();
    let mut events: Vec<RawEvent> = Vec::new();
    let mut last_cwd: Option<String> = None;
    let mut explicit_session_id: Option<String> = None;
    let mut total_tokens: u64 = 0;
    let mut model_counts: IndexMap<String, usize> = IndexMap::new();

    for (idx, line) in content.lines().enumerate() {
        let line_num = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match RawEvent::parse_line(trimmed) {
            Ok(event) => {
                if let Some(cwd) = &event.cwd {
                    last_cwd = Some(cwd.clone());
                }
                if explicit_session_id.is_none() {
                    explicit_session_id = event.session_id.clone();
                }
                total_tokens += event.token_total();
                if let Some(model) = event.model() {
                    *model_counts.entry(model.to_string()).or_insert(0) += 1;
                }
                events.push(event);
            }
            Err(e) => {
                warn!(file = path, line = line_num, error = %e, "skipping malformed line");
                warnings.push(IngestWarning::line(path, line_num, "invalid JSON record"));
            }
        }
    }

    if events.is_empty() {
        debug!(file = path, "no valid events, skipping file");
        return ParsedFile {
            snapshot: None,
            warnings,
        };
    }

    // Stable sort keeps same-timestamp events in file order; timestamp-less
    // events sort after timestamped ones.
    events.sort_by(|a, b| compare_timestamps(a.timestamp, b.timestamp));

    let (directory_id, file_stem) = dissect_log_path(path);
    let session_id = explicit_session_id.or(file_stem);

    let project_path = directory_id.as_deref().map_or_else(
        || {
            last_cwd
                .clone()
                .unwrap_or_else(|| UNKNOWN_PROJECT_PATH.to_string())
        },
        pathcode::decode_encoded_id,
    );

    let first_event_at = events.iter().find_map(|e| e.timestamp);
    let last_event_at = events.iter().rev().find_map(|e| e.timestamp);
    let features = classify::classify(&events);
    let title = derive_title(&events);

    debug!(
        file = path,
        events = events.len(),
        skipped = warnings.len(),
        "parsed session file"
    );

    ParsedFile {
        snapshot: Some(EventSnapshot {
            source_file: path.to_string(),
            session_id,
            directory_id,
            project_path,
            title,
            events,
            first_event_at,
            last_event_at,
            total_tokens,
            model_counts,
            features,
        }),
        warnings,
    }
}

/// Ordering used for all chronological sorts in the pipeline: present
/// timestamps ascending, absent timestamps last, stable on ties.
#[must_use]
pub fn compare_timestamps(
    a: Option<DateTime<Utc>>,
    b: Option<DateTime<Utc>>,
) -> std::cmp::Ordering {
    match (a, b) {
        (Some(ta), Some(tb)) => ta.cmp(&tb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

/// Descending recency ordering for listings: latest timestamps first,
/// absent timestamps last.
#[must_use]
pub fn compare_recency(
    a: Option<DateTime<Utc>>,
    b: Option<DateTime<Utc>>,
) -> std::cmp::Ordering {
    match (a, b) {
        (Some(ta), Some(tb)) => tb.cmp(&ta),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

/// Split a logical log path into the directory id and the filename stem.
///
/// The directory id is the path segment immediately after the `projects`
/// component, absent when the file sits directly under the projects root.
#[must_use]
pub fn dissect_log_path(path: &str) -> (Option<String>, Option<String>) {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let file_stem = segments
        .last()
        .and_then(|name| name.strip_suffix(".jsonl"))
        .map(String::from);

    // The segment after `projects` is the directory id only when it is not
    // itself the filename.
    let directory_id = segments
        .iter()
        .position(|s| *s == PROJECTS_SEGMENT)
        .filter(|i| i + 1 < segments.len().saturating_sub(1))
        .map(|i| segments[i + 1].to_string());

    (directory_id, file_stem)
}

/// Derive a display title from the first non-empty user message.
fn derive_title(events: &[RawEvent]) -> String {
    events
        .iter()
        .filter(|e| e.is_user_message())
        .find_map(|e| {
            e.message_text()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
        })
        .map_or_else(
            || "(untitled session)".to_string(),
            |t| truncate_preview(t.lines().next().unwrap_or(&t), TITLE_MAX_LEN),
        )
}

/// Truncate a string for preview display at a character boundary.
#[must_use]
pub fn truncate_preview(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_LINE: &str = r#"{"sessionId":"s1","cwd":"/home/me/app","timestamp":"2026-01-05T10:00:00Z","type":"user","message":{"role":"user","content":"hello"}}"#;

    #[test]
    fn test_parse_simple_file() {
        let content = format!(
            "{GOOD_LINE}\n{}",
            r#"{"sessionId":"s1","timestamp":"2026-01-05T10:00:05Z","type":"assistant","message":{"role":"assistant","model":"sonnet-4","content":[{"type":"text","text":"hi"}],"usage":{"input_tokens":10,"output_tokens":5}}}"#
        );
        let parsed = parse_session_file("projects/-home-me-app/s1.jsonl", &content);
        assert!(parsed.warnings.is_empty());

        let snapshot = parsed.snapshot.unwrap();
        assert_eq!(snapshot.session_id.as_deref(), Some("s1"));
        assert_eq!(snapshot.directory_id.as_deref(), Some("-home-me-app"));
        assert_eq!(snapshot.project_path, "/home/me/app");
        assert_eq!(snapshot.events.len(), 2);
        assert_eq!(snapshot.total_tokens, 15);
        assert_eq!(snapshot.model_counts.get("sonnet-4"), Some(&1));
        assert_eq!(snapshot.title, "hello");
    }

    #[test]
    fn test_malformed_line_tolerance() {
        let mut lines: Vec<String> = (0..9)
            .map(|i| {
                format!(
                    r#"{{"sessionId":"s1","timestamp":"2026-01-05T10:00:{i:02}Z","type":"user","message":{{"role":"user","content":"msg {i}"}}}}"#
                )
            })
            .collect();
        lines.insert(4, "{{{ not json".to_string());
        let content = lines.join("\n");

        let parsed = parse_session_file("projects/-a/s1.jsonl", &content);
        let snapshot = parsed.snapshot.unwrap();
        assert_eq!(snapshot.events.len(), 9);
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].line, Some(5));
        assert_eq!(parsed.warnings[0].file, "projects/-a/s1.jsonl");
    }

    #[test]
    fn test_empty_file_yields_nothing() {
        let parsed = parse_session_file("projects/-a/s1.jsonl", "\n\n");
        assert!(parsed.snapshot.is_none());
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_all_malformed_yields_warnings_only() {
        let parsed = parse_session_file("projects/-a/s1.jsonl", "nope\nalso nope\n");
        assert!(parsed.snapshot.is_none());
        assert_eq!(parsed.warnings.len(), 2);
    }

    #[test]
    fn test_session_id_falls_back_to_filename() {
        let content = r#"{"timestamp":"2026-01-05T10:00:00Z","type":"user","message":{"role":"user","content":"no session field"}}"#;
        let parsed = parse_session_file("projects/-a/abc-123.jsonl", content);
        assert_eq!(
            parsed.snapshot.unwrap().session_id.as_deref(),
            Some("abc-123")
        );
    }

    #[test]
    fn test_rootless_file_uses_cwd() {
        let parsed = parse_session_file("projects/s1.jsonl", GOOD_LINE);
        let snapshot = parsed.snapshot.unwrap();
        assert!(snapshot.directory_id.is_none());
        assert_eq!(snapshot.project_path, "/home/me/app");
    }

    #[test]
    fn test_rootless_file_without_cwd_is_unknown() {
        let content = r#"{"sessionId":"s1","type":"user","message":{"role":"user","content":"hi"}}"#;
        let parsed = parse_session_file("projects/s1.jsonl", content);
        assert_eq!(parsed.snapshot.unwrap().project_path, UNKNOWN_PROJECT_PATH);
    }

    #[test]
    fn test_events_sorted_by_timestamp() {
        let content = [
            r#"{"sessionId":"s1","timestamp":"2026-01-05T10:00:09Z","type":"user","message":{"role":"user","content":"later"}}"#,
            r#"{"sessionId":"s1","timestamp":"2026-01-05T10:00:01Z","type":"user","message":{"role":"user","content":"earlier"}}"#,
            r#"{"sessionId":"s1","type":"user","message":{"role":"user","content":"undated"}}"#,
        ]
        .join("\n");

        let snapshot = parse_session_file("projects/-a/s1.jsonl", &content)
            .snapshot
            .unwrap();
        assert_eq!(
            snapshot.events[0].message_text().as_deref(),
            Some("earlier")
        );
        assert_eq!(snapshot.events[1].message_text().as_deref(), Some("later"));
        assert_eq!(
            snapshot.events[2].message_text().as_deref(),
            Some("undated")
        );
        assert_eq!(
            snapshot.first_event_at.unwrap().to_rfc3339(),
            "2026-01-05T10:00:01+00:00"
        );
    }

    #[test]
    fn test_dissect_log_path() {
        assert_eq!(
            dissect_log_path("projects/-home-me-app/s1.jsonl"),
            (Some("-home-me-app".to_string()), Some("s1".to_string()))
        );
        assert_eq!(
            dissect_log_path("projects/s1.jsonl"),
            (None, Some("s1".to_string()))
        );
        assert_eq!(
            dissect_log_path("deep/nesting/projects/-a/s.jsonl"),
            (Some("-a".to_string()), Some("s".to_string()))
        );
    }

    #[test]
    fn test_compare_recency_puts_absent_timestamps_last() {
        let older: Option<DateTime<Utc>> = Some("2026-01-01T10:00:00Z".parse().unwrap());
        let newer: Option<DateTime<Utc>> = Some("2026-01-09T10:00:00Z".parse().unwrap());

        let mut timestamps = vec![None, older, newer];
        timestamps.sort_by(|a, b| compare_recency(*a, *b));
        assert_eq!(timestamps, [newer, older, None]);
    }

    #[test]
    fn test_truncate_preview_char_boundary() {
        assert_eq!(truncate_preview("short", 10), "short");
        let truncated = truncate_preview("ééééé", 3);
        assert!(truncated.ends_with('…'));
        assert!(truncated.chars().count() <= 3);
    }
}
