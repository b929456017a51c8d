//! Raw log records.
//!
//! One [`RawEvent`] is one parsed JSONL line. Every field is optional on the
//! wire: session files are produced incrementally by an external tool and
//! records routinely omit fields. A parse only fails when the line is not
//! valid JSON (or a present field has the wrong shape), and the caller
//! records that as a warning rather than an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::MessageBody;

/// Record type tag for file-history snapshots.
pub const FILE_SNAPSHOT_TYPE: &str = "file-history-snapshot";

/// One parsed log line. Immutable once parsed.
///
/// The original record is kept in `raw` so export and audit paths lose
/// nothing a lenient parse might have skipped over.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Record identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    /// Session this record belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Working directory at the time of the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    /// ISO-8601 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Record type tag ("user", "assistant", "file-history-snapshot", ...).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    /// Message payload for chat records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageBody>,

    /// The original unparsed record, kept for export/audit.
    #[serde(skip)]
    pub raw: Value,
}

impl RawEvent {
    /// Parse one JSONL line, retaining the original record.
    pub fn parse_line(line: &str) -> serde_json::Result<Self> {
        let raw: Value = serde_json::from_str(line)?;
        let mut event: Self = serde_json::from_value(raw.clone())?;
        event.raw = raw;
        Ok(event)
    }

    /// The message role, if a message is present.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.role.as_deref())
    }

    /// Whether this is a user-role message record.
    #[must_use]
    pub fn is_user_message(&self) -> bool {
        self.role() == Some("user")
    }

    /// Whether this is an assistant-role message record.
    #[must_use]
    pub fn is_assistant_message(&self) -> bool {
        self.role() == Some("assistant")
    }

    /// Whether this is any chat message (user or assistant).
    #[must_use]
    pub fn is_chat_message(&self) -> bool {
        self.is_user_message() || self.is_assistant_message()
    }

    /// Whether this is a file-history-snapshot record.
    #[must_use]
    pub fn is_file_snapshot(&self) -> bool {
        self.event_type.as_deref() == Some(FILE_SNAPSHOT_TYPE)
    }

    /// Whether the message carries any tool-use or tool-result block.
    #[must_use]
    pub fn has_tool_activity(&self) -> bool {
        self.message
            .as_ref()
            .and_then(|m| m.content.as_ref())
            .is_some_and(|c| c.has_tool_use() || c.has_tool_results())
    }

    /// Human-readable message text, if any text-bearing content exists.
    #[must_use]
    pub fn message_text(&self) -> Option<String> {
        self.message
            .as_ref()
            .and_then(|m| m.content.as_ref())
            .and_then(|c| c.text())
    }

    /// Input plus output tokens for this record, zero when absent.
    #[must_use]
    pub fn token_total(&self) -> u64 {
        self.message
            .as_ref()
            .and_then(|m| m.usage.as_ref())
            .map_or(0, |u| u.total())
    }

    /// Model identifier for assistant records.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.model.as_deref())
    }

    /// The raw snapshot payload of a file-history-snapshot record.
    #[must_use]
    pub fn snapshot_payload(&self) -> Option<&Value> {
        self.raw.get("snapshot")
    }

    /// Number of tracked file backups in a file-history-snapshot record.
    #[must_use]
    pub fn tracked_file_count(&self) -> usize {
        self.snapshot_payload()
            .and_then(|s| s.get("trackedFileBackups"))
            .and_then(Value::as_object)
            .map_or(0, serde_json::Map::len)
    }
}
