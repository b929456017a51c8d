//! Feature classification for event lists.
//!
//! A pure pass over a file's events deriving boolean feature flags and a
//! categorical role. The priority chain is fixed: any chat content makes the
//! whole snapshot a chat snapshot, even when file snapshots are also present.

use serde::Serialize;

use crate::model::RawEvent;

/// Boolean feature flags derived from an event list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeatureFlags {
    /// Any user or assistant message present.
    pub has_chat_messages: bool,
    /// Any file-history-snapshot record present.
    pub has_file_snapshots: bool,
    /// Any tool-use or tool-result block present.
    pub has_tool_calls: bool,
    /// Number of file-history-snapshot records.
    pub file_snapshot_count: usize,
}

impl FeatureFlags {
    /// Merge another snapshot's flags into this one with logical OR.
    ///
    /// Used when a session spans multiple files: the session has a feature
    /// if any constituent snapshot has it.
    pub fn or_merge(&mut self, other: &Self) {
        self.has_chat_messages |= other.has_chat_messages;
        self.has_file_snapshots |= other.has_file_snapshots;
        self.has_tool_calls |= other.has_tool_calls;
        self.file_snapshot_count += other.file_snapshot_count;
    }

    /// Categorical kind under the chat > code-activity > system priority.
    #[must_use]
    pub fn kind(&self) -> SnapshotKind {
        if self.has_chat_messages {
            SnapshotKind::Chat
        } else if self.has_file_snapshots {
            SnapshotKind::CodeActivity
        } else {
            SnapshotKind::System
        }
    }

    /// Narrative role under the same priority chain as [`kind`](Self::kind).
    #[must_use]
    pub fn story_role(&self) -> StoryRole {
        match self.kind() {
            SnapshotKind::Chat => StoryRole::Chat,
            SnapshotKind::CodeActivity => StoryRole::FileHistoryOnly,
            SnapshotKind::System => StoryRole::Other,
        }
    }
}

/// Categorical role of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotKind {
    /// Contains conversation.
    Chat,
    /// File snapshots or tool activity without conversation.
    CodeActivity,
    /// Neither conversation nor file activity.
    System,
}

/// The role a snapshot plays in the session's story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoryRole {
    /// Conversation content.
    Chat,
    /// File-history records only.
    FileHistoryOnly,
    /// Everything else.
    Other,
}

/// Derive feature flags from an event list.
#[must_use]
pub fn classify(events: &[RawEvent]) -> FeatureFlags {
    let mut flags = FeatureFlags::default();
    for event in events {
        if event.is_chat_message() {
            flags.has_chat_messages = true;
        }
        if event.is_file_snapshot() {
            flags.has_file_snapshots = true;
            flags.file_snapshot_count += 1;
        }
        if event.has_tool_activity() {
            flags.has_tool_calls = true;
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(line: &str) -> RawEvent {
        RawEvent::parse_line(line).unwrap()
    }

    #[test]
    fn test_classify_chat() {
        let events = vec![
            event(r#"{"type":"user","message":{"role":"user","content":"hi"}}"#),
            event(r#"{"type":"assistant","message":{"role":"assistant","content":[{"type":"text","text":"hello"}]}}"#),
        ];
        let flags = classify(&events);
        assert!(flags.has_chat_messages);
        assert_eq!(flags.kind(), SnapshotKind::Chat);
        assert_eq!(flags.story_role(), StoryRole::Chat);
    }

    #[test]
    fn test_classify_file_history_only() {
        let events = vec![
            event(r#"{"type":"file-history-snapshot","snapshot":{"trackedFileBackups":{}}}"#),
            event(r#"{"type":"file-history-snapshot","snapshot":{"trackedFileBackups":{}}}"#),
        ];
        let flags = classify(&events);
        assert!(!flags.has_chat_messages);
        assert_eq!(flags.file_snapshot_count, 2);
        assert_eq!(flags.kind(), SnapshotKind::CodeActivity);
        assert_eq!(flags.story_role(), StoryRole::FileHistoryOnly);
    }

    #[test]
    fn test_chat_outranks_file_snapshots() {
        // Chat content reclassifies the whole snapshot even when file
        // snapshots are also present
        let events = vec![
            event(r#"{"type":"file-history-snapshot","snapshot":{}}"#),
            event(r#"{"type":"user","message":{"role":"user","content":"hi"}}"#),
        ];
        let flags = classify(&events);
        assert!(flags.has_file_snapshots);
        assert_eq!(flags.kind(), SnapshotKind::Chat);
    }

    #[test]
    fn test_classify_system() {
        let events = vec![event(r#"{"type":"summary","summary":"did things"}"#)];
        assert_eq!(classify(&events).kind(), SnapshotKind::System);
    }

    #[test]
    fn test_tool_call_detection() {
        let events = vec![event(
            r#"{"type":"assistant","message":{"role":"assistant","content":[{"type":"tool_use","id":"t1","name":"Read","input":{}}]}}"#,
        )];
        assert!(classify(&events).has_tool_calls);
    }

    #[test]
    fn test_or_merge() {
        let mut a = FeatureFlags {
            has_chat_messages: false,
            has_file_snapshots: true,
            has_tool_calls: false,
            file_snapshot_count: 3,
        };
        let b = FeatureFlags {
            has_chat_messages: true,
            has_file_snapshots: false,
            has_tool_calls: false,
            file_snapshot_count: 1,
        };
        a.or_merge(&b);
        assert!(a.has_chat_messages);
        assert!(a.has_file_snapshots);
        assert_eq!(a.file_snapshot_count, 4);
        assert_eq!(a.kind(), SnapshotKind::Chat);
    }
}
