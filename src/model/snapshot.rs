//! Per-file event snapshots.
//!
//! An [`EventSnapshot`] is the parsed product of one physical session file:
//! its chronologically-ordered events plus the per-file rollups the rest of
//! the pipeline groups and votes on. Snapshots are created by the parser and
//! never mutated afterwards.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::classify::FeatureFlags;

use super::event::RawEvent;

/// Sentinel project path for files with no directory id and no `cwd`.
pub const UNKNOWN_PROJECT_PATH: &str = "(unknown project)";

/// The events of one physical file plus derived statistics.
#[derive(Debug, Clone, Serialize)]
pub struct EventSnapshot {
    /// Logical path of the source file.
    pub source_file: String,

    /// Resolved session id: the explicit field when any record carries one,
    /// else derived from the filename. `None` only when neither exists.
    pub session_id: Option<String>,

    /// Raw encoded folder name, or `None` when the file sits directly under
    /// the logs root.
    pub directory_id: Option<String>,

    /// Resolved display path: decoded directory id, else last-seen `cwd`,
    /// else [`UNKNOWN_PROJECT_PATH`].
    pub project_path: String,

    /// Display title derived from the first real user message.
    pub title: String,

    /// All events, sorted ascending by timestamp (stable on ties,
    /// timestamp-less events last).
    pub events: Vec<RawEvent>,

    /// Timestamp of the earliest timestamped event.
    pub first_event_at: Option<DateTime<Utc>>,

    /// Timestamp of the latest timestamped event.
    pub last_event_at: Option<DateTime<Utc>>,

    /// Cumulative input+output tokens across all events.
    pub total_tokens: u64,

    /// Message counts per model, in first-seen order.
    pub model_counts: IndexMap<String, usize>,

    /// Classifier-derived feature flags.
    pub features: FeatureFlags,
}

impl EventSnapshot {
    /// Number of chat messages (user or assistant) in this snapshot.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_chat_message()).count()
    }
}
