//! Turn-by-turn replay of a project's event stream.
//!
//! All events of every canonical session belonging to one project are
//! flattened, sorted chronologically, and replayed into discrete
//! [`ProjectTurn`] records. System-injected user messages never become
//! turns of their own: guardrail caveats attach to the *next* real turn,
//! compaction notes to the *current* one, and continuation markers become
//! context events on the previous turn.
//!
//! The user-text matching lives in an ordered rule table
//! ([`USER_TEXT_RULES`]) so the precedence is auditable and testable on its
//! own.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::aggregate::CanonicalSession;
use crate::config::DisplayConfig;
use crate::model::{ContentBlock, RawEvent};
use crate::parser::{compare_timestamps, truncate_preview};

/// Query text shown for a turn triggered by a message with no text content.
pub const TOOL_RESULT_PLACEHOLDER: &str = "[tool result]";

/// Title of the orphan turn synthesized when a continuation marker arrives
/// before any real turn.
pub const CONTEXT_RESTORED_TITLE: &str = "[context restored from previous session]";

/// Prefix of the fixed continuation marker injected on session resume.
const CONTINUATION_MARKER: &str = "This session is being continued from a previous conversation";

/// Inputs longer than this count as "long".
const LONG_INPUT_CHARS: usize = 500;

static GUARDRAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Caveat:").expect("valid regex"));
static COMPACTION_NOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Compacted \(.*ctrl\+o.*\)").expect("valid regex"));

/// Tool-name substrings that mark an invocation as subagent-flavored.
const SUBAGENT_NAME_HINTS: &[&str] = &["agent", "mcp", "bash", "glob"];

/// Tool-result text substrings that mark the result as failed even without
/// an explicit error flag.
const RESULT_ERROR_HINTS: &[&str] = &["Error:", "Failed"];

/// How a user-role message's text is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserTextClass {
    /// A "Caveat:" guardrail, stashed for the next real turn.
    Guardrail,
    /// A "Compacted (ctrl+o ...)" note, appended to the current turn.
    CompactionNote,
    /// A context-compaction continuation marker.
    Continuation,
    /// A real query; opens a new turn.
    Query,
}

struct TextRule {
    class: UserTextClass,
    matches: fn(&str) -> bool,
}

/// Ordered user-text rules, evaluated top to bottom; first match wins.
static USER_TEXT_RULES: &[TextRule] = &[
    TextRule {
        class: UserTextClass::Guardrail,
        matches: |text| GUARDRAIL_RE.is_match(text),
    },
    TextRule {
        class: UserTextClass::CompactionNote,
        matches: |text| COMPACTION_NOTE_RE.is_match(text),
    },
    TextRule {
        class: UserTextClass::Continuation,
        matches: |text| text.starts_with(CONTINUATION_MARKER),
    },
];

/// Classify a user message's text against the ordered rule table.
#[must_use]
pub fn classify_user_text(text: &str) -> UserTextClass {
    for rule in USER_TEXT_RULES {
        if (rule.matches)(text) {
            return rule.class;
        }
    }
    UserTextClass::Query
}

/// Kind of a timeline action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Tool invocation.
    Tool,
    /// Tool invocation routed to a subagent-flavored tool.
    Subagent,
    /// Tool execution outcome.
    ToolResult,
    /// File-history snapshot.
    Snapshot,
    /// Anything else.
    Other,
}

/// One tool call, tool result, or file snapshot within a turn.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineAction {
    /// Action kind.
    pub kind: ActionKind,
    /// Display label (tool name, result preview, snapshot summary).
    pub label: String,
    /// Timestamp of the originating event.
    pub timestamp: Option<DateTime<Utc>>,
    /// Raw payload, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Whether the action failed.
    pub is_error: bool,
}

/// A context-compaction notice attached to a turn.
#[derive(Debug, Clone, Serialize)]
pub struct ContextEvent {
    /// Timestamp of the continuation marker.
    pub timestamp: Option<DateTime<Utc>>,
    /// The marker text.
    pub text: String,
}

/// One conversational exchange.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectTurn {
    /// Timestamp of the triggering user message.
    pub timestamp: Option<DateTime<Utc>>,
    /// Monotonic query number; absent for synthesized orphan turns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<usize>,
    /// Session the triggering event came from.
    pub session_id: Option<String>,
    /// The user's query text, or a placeholder for text-less triggers.
    pub user_query: String,
    /// Whether the input is long (over 500 chars or containing a fence).
    pub is_long_input: bool,
    /// Character count of the query.
    pub char_count: usize,
    /// Line count of the query.
    pub line_count: usize,
    /// Preview of the assistant reply.
    pub reply_preview: String,
    /// Preview of the assistant's thinking.
    pub thinking_preview: String,
    /// Ordered tool/result/snapshot actions.
    pub actions: Vec<TimelineAction>,
    /// Context-compaction notices attached to this turn.
    pub context_events: Vec<ContextEvent>,
    /// Guardrail caveats attached to this turn.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub guardrails: Vec<String>,
    /// Compaction system notes appended to this turn.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub system_notes: Vec<String>,
}

/// Per-run reconstruction state.
///
/// Holds the diagnostic dedup set so repeated or concurrent runs never share
/// hidden module-level state.
#[derive(Debug, Default)]
pub struct ReconstructionContext {
    noted_orphan_projects: HashSet<String>,
}

impl ReconstructionContext {
    /// Fresh state for one pipeline run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn note_orphans(&mut self, project_id: &str, count: usize) {
        if count > 0 && self.noted_orphan_projects.insert(project_id.to_string()) {
            debug!(project = project_id, count, "discarded events before first turn");
        }
    }
}

/// Replay one project's chronological event stream into turns.
///
/// `sessions` is pre-filtered to the project; events are flattened across
/// all of them and sorted ascending by timestamp.
#[must_use]
pub fn reconstruct_project_turns(
    ctx: &mut ReconstructionContext,
    project_id: &str,
    sessions: &[&CanonicalSession],
    display: &DisplayConfig,
) -> Vec<ProjectTurn> {
    let mut events: Vec<(&RawEvent, &str)> = sessions
        .iter()
        .flat_map(|s| s.events.iter().map(move |e| (e, s.session_id.as_str())))
        .collect();
    events.sort_by(|(a, _), (b, _)| compare_timestamps(a.timestamp, b.timestamp));

    let mut builder = TimelineBuilder::new();
    for (event, session_id) in events {
        builder.feed(event, session_id);
    }
    ctx.note_orphans(project_id, builder.orphan_count);

    trace!(
        project = project_id,
        turns = builder.turns.len(),
        "reconstructed timeline"
    );
    builder.finish(display)
}

/// Accumulates turns while iterating the event stream. The turn under
/// construction is always the last element of `turns`.
struct TimelineBuilder {
    turns: Vec<ProjectTurn>,
    reply_parts: Vec<String>,
    thinking_parts: Vec<String>,
    pending_guardrail: Option<String>,
    query_counter: usize,
    orphan_count: usize,
}

impl TimelineBuilder {
    fn new() -> Self {
        Self {
            turns: Vec::new(),
            reply_parts: Vec::new(),
            thinking_parts: Vec::new(),
            pending_guardrail: None,
            query_counter: 0,
            orphan_count: 0,
        }
    }

    fn feed(&mut self, event: &RawEvent, session_id: &str) {
        if event.is_user_message() {
            self.feed_user(event, session_id);
            return;
        }
        if event.is_file_snapshot() {
            self.append_snapshot_action(event);
            return;
        }
        if event.is_assistant_message() {
            self.feed_assistant(event);
            return;
        }
        if self.turns.is_empty() {
            self.orphan_count += 1;
        }
    }

    fn feed_user(&mut self, event: &RawEvent, session_id: &str) {
        let text = event.message_text().unwrap_or_default();

        if !text.is_empty() {
            match classify_user_text(&text) {
                UserTextClass::Guardrail => {
                    self.pending_guardrail = Some(text);
                    return;
                }
                UserTextClass::CompactionNote => {
                    if let Some(turn) = self.turns.last_mut() {
                        turn.system_notes.push(text);
                    }
                    return;
                }
                UserTextClass::Continuation => {
                    self.attach_continuation(event, session_id, text);
                    return;
                }
                UserTextClass::Query => {}
            }
        }

        let has_structured_content = event
            .message
            .as_ref()
            .and_then(|m| m.content.as_ref())
            .map_or(false, |c| !c.is_empty());
        if text.is_empty() && !has_structured_content {
            if self.turns.is_empty() {
                self.orphan_count += 1;
            }
            return;
        }

        self.open_turn(event, session_id, text);

        // Tool results arrive inside user-role messages; they land on the
        // turn just opened.
        self.append_tool_results(event);
    }

    fn open_turn(&mut self, event: &RawEvent, session_id: &str, text: String) {
        self.flush_buffers();
        self.query_counter += 1;

        let display_text = if text.is_empty() {
            TOOL_RESULT_PLACEHOLDER.to_string()
        } else {
            text
        };
        let char_count = display_text.chars().count();
        let is_long = char_count > LONG_INPUT_CHARS || display_text.contains("```");

        let mut turn = ProjectTurn {
            timestamp: event.timestamp,
            sequence: Some(self.query_counter),
            session_id: Some(session_id.to_string()),
            char_count,
            line_count: display_text.lines().count(),
            is_long_input: is_long,
            user_query: display_text,
            reply_preview: String::new(),
            thinking_preview: String::new(),
            actions: Vec::new(),
            context_events: Vec::new(),
            guardrails: Vec::new(),
            system_notes: Vec::new(),
        };
        if let Some(guardrail) = self.pending_guardrail.take() {
            turn.guardrails.push(guardrail);
        }
        self.turns.push(turn);
    }

    fn attach_continuation(&mut self, event: &RawEvent, session_id: &str, text: String) {
        let context_event = ContextEvent {
            timestamp: event.timestamp,
            text,
        };
        if let Some(turn) = self.turns.last_mut() {
            turn.context_events.push(context_event);
            return;
        }
        // No turn exists yet: synthesize an orphan turn so the restoration
        // is still visible.
        self.turns.push(ProjectTurn {
            timestamp: event.timestamp,
            sequence: None,
            session_id: Some(session_id.to_string()),
            user_query: CONTEXT_RESTORED_TITLE.to_string(),
            is_long_input: false,
            char_count: 0,
            line_count: 0,
            reply_preview: String::new(),
            thinking_preview: String::new(),
            actions: Vec::new(),
            context_events: vec![context_event],
            guardrails: Vec::new(),
            system_notes: Vec::new(),
        });
    }

    fn feed_assistant(&mut self, event: &RawEvent) {
        if self.turns.is_empty() {
            self.orphan_count += 1;
            return;
        }

        if let Some(content) = event.message.as_ref().and_then(|m| m.content.as_ref()) {
            if let Some(text) = content.text() {
                if !text.trim().is_empty() {
                    self.reply_parts.push(text);
                }
            }
            if let Some(thinking) = content.thinking_text() {
                self.thinking_parts.push(thinking);
            }
            for block in content.blocks() {
                if let ContentBlock::ToolUse(tool_use) = block {
                    self.append_tool_use(event, tool_use);
                }
            }
        }
    }

    fn append_tool_use(&mut self, event: &RawEvent, tool_use: &crate::model::ToolUseBlock) {
        let kind = if is_subagent_tool(&tool_use.name) {
            ActionKind::Subagent
        } else {
            ActionKind::Tool
        };
        if let Some(turn) = self.turns.last_mut() {
            turn.actions.push(TimelineAction {
                kind,
                label: tool_use.name.clone(),
                timestamp: event.timestamp,
                payload: Some(tool_use.input.clone()),
                is_error: false,
            });
        }
    }

    fn append_tool_results(&mut self, event: &RawEvent) {
        let Some(content) = event.message.as_ref().and_then(|m| m.content.as_ref()) else {
            return;
        };
        let results: Vec<_> = content.tool_results();
        if results.is_empty() {
            return;
        }
        let Some(turn) = self.turns.last_mut() else {
            return;
        };
        for result in results {
            let text = result.text();
            let is_error = result.is_explicit_error()
                || RESULT_ERROR_HINTS.iter().any(|hint| text.contains(hint));
            turn.actions.push(TimelineAction {
                kind: ActionKind::ToolResult,
                label: truncate_preview(text.lines().next().unwrap_or_default(), 120),
                timestamp: event.timestamp,
                payload: None,
                is_error,
            });
        }
    }

    fn append_snapshot_action(&mut self, event: &RawEvent) {
        if self.turns.is_empty() {
            self.orphan_count += 1;
            return;
        }
        if let Some(turn) = self.turns.last_mut() {
            let count = event.tracked_file_count();
            turn.actions.push(TimelineAction {
                kind: ActionKind::Snapshot,
                label: format!("{count} tracked files"),
                timestamp: event.timestamp,
                payload: event.snapshot_payload().cloned(),
                is_error: false,
            });
        }
    }

    /// Move the reply/thinking buffers into the turn they belong to.
    fn flush_buffers(&mut self) {
        if self.reply_parts.is_empty() && self.thinking_parts.is_empty() {
            return;
        }
        if let Some(turn) = self.turns.last_mut() {
            turn.reply_preview = self.reply_parts.join("\n\n");
            turn.thinking_preview = self.thinking_parts.join("\n\n");
        }
        self.reply_parts.clear();
        self.thinking_parts.clear();
    }

    fn finish(mut self, display: &DisplayConfig) -> Vec<ProjectTurn> {
        self.flush_buffers();
        for turn in &mut self.turns {
            turn.reply_preview = truncate_preview(&turn.reply_preview, display.reply_preview_len);
            turn.thinking_preview =
                truncate_preview(&turn.thinking_preview, display.thinking_preview_len);
        }
        self.turns
    }
}

fn is_subagent_tool(name: &str) -> bool {
    let lower = name.to_lowercase();
    SUBAGENT_NAME_HINTS.iter().any(|hint| lower.contains(hint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_sessions;
    use crate::parser::parse_session_file;

    fn session_from(lines: &[String]) -> CanonicalSession {
        let snapshot = parse_session_file("projects/-home-me-app/s1.jsonl", &lines.join("\n"))
            .snapshot
            .unwrap();
        aggregate_sessions(vec![snapshot]).remove(0)
    }

    fn user(ts: &str, text: &str) -> String {
        format!(
            r#"{{"sessionId":"s1","timestamp":"{ts}","type":"user","message":{{"role":"user","content":{}}}}}"#,
            serde_json::to_string(text).unwrap()
        )
    }

    fn assistant(ts: &str, text: &str) -> String {
        format!(
            r#"{{"sessionId":"s1","timestamp":"{ts}","type":"assistant","message":{{"role":"assistant","content":[{{"type":"text","text":{}}}]}}}}"#,
            serde_json::to_string(text).unwrap()
        )
    }

    fn turns_for(lines: &[String]) -> Vec<ProjectTurn> {
        let session = session_from(lines);
        let mut ctx = ReconstructionContext::new();
        reconstruct_project_turns(
            &mut ctx,
            &session.primary_project_id.clone(),
            &[&session],
            &DisplayConfig::default(),
        )
    }

    #[test]
    fn test_rule_table_precedence() {
        assert_eq!(
            classify_user_text("Caveat: the messages below were generated"),
            UserTextClass::Guardrail
        );
        assert_eq!(
            classify_user_text("Compacted (ctrl+o to see full summary)"),
            UserTextClass::CompactionNote
        );
        assert_eq!(
            classify_user_text(
                "This session is being continued from a previous conversation that ran out of context."
            ),
            UserTextClass::Continuation
        );
        assert_eq!(classify_user_text("fix the bug"), UserTextClass::Query);
    }

    #[test]
    fn test_guardrail_merges_into_next_turn() {
        let turns = turns_for(&[
            user("2026-01-05T10:00:00Z", "Caveat: tool output below"),
            user("2026-01-05T10:00:01Z", "fix bug"),
            assistant("2026-01-05T10:00:02Z", "on it"),
        ]);

        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].user_query, "fix bug");
        assert_eq!(turns[0].guardrails, ["Caveat: tool output below"]);
        assert_eq!(turns[0].reply_preview, "on it");
    }

    #[test]
    fn test_compaction_note_attaches_to_current_turn() {
        let turns = turns_for(&[
            user("2026-01-05T10:00:00Z", "do something"),
            user("2026-01-05T10:00:05Z", "Compacted (ctrl+o to see full summary)"),
        ]);
        assert_eq!(turns.len(), 1);
        assert_eq!(
            turns[0].system_notes,
            ["Compacted (ctrl+o to see full summary)"]
        );
    }

    #[test]
    fn test_continuation_attaches_to_previous_turn() {
        let marker =
            "This session is being continued from a previous conversation that ran out of context.";
        let turns = turns_for(&[
            user("2026-01-05T10:00:00Z", "first"),
            user("2026-01-05T10:00:10Z", marker),
        ]);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].context_events.len(), 1);
        assert!(turns[0].context_events[0].text.starts_with(CONTINUATION_MARKER));
    }

    #[test]
    fn test_continuation_without_turn_synthesizes_orphan() {
        let marker = "This session is being continued from a previous conversation.";
        let turns = turns_for(&[user("2026-01-05T10:00:00Z", marker)]);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].user_query, CONTEXT_RESTORED_TITLE);
        assert!(turns[0].sequence.is_none());
        assert_eq!(turns[0].context_events.len(), 1);
    }

    #[test]
    fn test_orphan_events_before_first_turn_are_discarded() {
        let turns = turns_for(&[
            assistant("2026-01-05T10:00:00Z", "floating reply"),
            user("2026-01-05T10:00:01Z", "real query"),
        ]);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].reply_preview, "");
    }

    #[test]
    fn test_replies_joined_with_blank_line() {
        let turns = turns_for(&[
            user("2026-01-05T10:00:00Z", "go"),
            assistant("2026-01-05T10:00:01Z", "part one"),
            assistant("2026-01-05T10:00:02Z", "part two"),
        ]);
        assert_eq!(turns[0].reply_preview, "part one\n\npart two");
    }

    #[test]
    fn test_tool_use_and_result_actions() {
        let lines = vec![
            user("2026-01-05T10:00:00Z", "read a file"),
            format!(
                r#"{{"sessionId":"s1","timestamp":"2026-01-05T10:00:01Z","type":"assistant","message":{{"role":"assistant","content":[{{"type":"tool_use","id":"t1","name":"Read","input":{{"file_path":"/x"}}}}]}}}}"#
            ),
            format!(
                r#"{{"sessionId":"s1","timestamp":"2026-01-05T10:00:02Z","type":"user","message":{{"role":"user","content":[{{"type":"tool_result","tool_use_id":"t1","content":"Error: no such file"}}]}}}}"#
            ),
        ];
        let turns = turns_for(&lines);

        // The tool-result-only message opens its own turn with a placeholder
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].actions.len(), 1);
        assert_eq!(turns[0].actions[0].kind, ActionKind::Tool);
        assert_eq!(turns[0].actions[0].label, "Read");

        assert_eq!(turns[1].user_query, TOOL_RESULT_PLACEHOLDER);
        assert_eq!(turns[1].actions.len(), 1);
        assert_eq!(turns[1].actions[0].kind, ActionKind::ToolResult);
        assert!(turns[1].actions[0].is_error);
    }

    #[test]
    fn test_subagent_heuristic() {
        assert!(is_subagent_tool("Task/agent-runner"));
        assert!(is_subagent_tool("mcp__server__call"));
        assert!(is_subagent_tool("Bash"));
        assert!(is_subagent_tool("Glob"));
        assert!(!is_subagent_tool("Read"));
    }

    #[test]
    fn test_snapshot_action() {
        let lines = vec![
            user("2026-01-05T10:00:00Z", "edit stuff"),
            format!(
                r#"{{"sessionId":"s1","timestamp":"2026-01-05T10:00:01Z","type":"file-history-snapshot","snapshot":{{"trackedFileBackups":{{"a.rs":1,"b.rs":2,"c.rs":3}}}}}}"#
            ),
        ];
        let turns = turns_for(&lines);
        assert_eq!(turns[0].actions.len(), 1);
        assert_eq!(turns[0].actions[0].kind, ActionKind::Snapshot);
        assert_eq!(turns[0].actions[0].label, "3 tracked files");
        assert!(turns[0].actions[0].payload.is_some());
    }

    #[test]
    fn test_long_input_detection() {
        let long_text = "x".repeat(600);
        let turns = turns_for(&[user("2026-01-05T10:00:00Z", &long_text)]);
        assert!(turns[0].is_long_input);
        assert_eq!(turns[0].char_count, 600);

        let fenced = "short but\n```rust\ncode\n```";
        let turns = turns_for(&[user("2026-01-05T10:01:00Z", fenced)]);
        assert!(turns[0].is_long_input);
        assert_eq!(turns[0].line_count, 4);
    }

    #[test]
    fn test_long_input_counts_characters_not_bytes() {
        // 400 two-byte characters: 800 bytes but well under the threshold
        let multibyte = "é".repeat(400);
        let turns = turns_for(&[user("2026-01-05T10:00:00Z", &multibyte)]);
        assert!(!turns[0].is_long_input);
        assert_eq!(turns[0].char_count, 400);

        let turns = turns_for(&[user("2026-01-05T10:01:00Z", &"é".repeat(501))]);
        assert!(turns[0].is_long_input);
    }

    #[test]
    fn test_thinking_extracted_separately() {
        let lines = vec![
            user("2026-01-05T10:00:00Z", "think hard"),
            format!(
                r#"{{"sessionId":"s1","timestamp":"2026-01-05T10:00:01Z","type":"assistant","message":{{"role":"assistant","content":[{{"type":"thinking","thinking":"hmm let me see"}},{{"type":"text","text":"answer"}}]}}}}"#
            ),
        ];
        let turns = turns_for(&lines);
        assert_eq!(turns[0].reply_preview, "answer");
        assert_eq!(turns[0].thinking_preview, "hmm let me see");
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let turns = turns_for(&[
            user("2026-01-05T10:00:00Z", "one"),
            user("2026-01-05T10:01:00Z", "two"),
            user("2026-01-05T10:02:00Z", "three"),
        ]);
        let seqs: Vec<_> = turns.iter().map(|t| t.sequence).collect();
        assert_eq!(seqs, [Some(1), Some(2), Some(3)]);
    }
}
