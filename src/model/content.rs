//! Content structures for session log records.
//!
//! A record's `message` carries its content either as a plain string or as an
//! ordered list of typed blocks:
//! - `text`: natural language
//! - `tool_use`: tool invocation requests
//! - `tool_result`: tool execution outcomes
//! - `thinking` / `redacted_thinking`: extended reasoning
//! - `image`: visual input
//!
//! Every struct keeps unknown fields in a flattened map so reserializing a
//! record loses nothing.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `message` object inside a log record.
///
/// All fields are optional on the wire; absence never fails a parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageBody {
    /// Message role ("user", "assistant", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Content as a plain string or an ordered block list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,

    /// Model identifier for assistant messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Token statistics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,

    /// Unknown fields for forward compatibility.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Message content - either a simple string or an array of content blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple string content (direct human input).
    Text(String),
    /// Array of typed content blocks.
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Get the plain-string form, if this is simple content.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Blocks(_) => None,
        }
    }

    /// Get the content blocks (empty slice for plain-string content).
    #[must_use]
    pub fn blocks(&self) -> &[ContentBlock] {
        match self {
            Self::Text(_) => &[],
            Self::Blocks(blocks) => blocks,
        }
    }

    /// Extract the human-readable text: the plain string, or all text blocks
    /// joined with newlines. `None` when no text-bearing content exists.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Blocks(blocks) => {
                let parts: Vec<&str> = blocks
                    .iter()
                    .filter_map(|b| match b {
                        ContentBlock::Text(t) => Some(t.text.as_str()),
                        _ => None,
                    })
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("\n"))
                }
            }
        }
    }

    /// Extract thinking-block text, joined with blank lines.
    #[must_use]
    pub fn thinking_text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .blocks()
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Thinking(t) => Some(t.thinking.as_str()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    /// Check if this content carries any tool-use block.
    #[must_use]
    pub fn has_tool_use(&self) -> bool {
        self.blocks().iter().any(ContentBlock::is_tool_use)
    }

    /// Check if this content carries any tool-result block.
    #[must_use]
    pub fn has_tool_results(&self) -> bool {
        self.blocks().iter().any(ContentBlock::is_tool_result)
    }

    /// Get all tool-use blocks in order.
    #[must_use]
    pub fn tool_uses(&self) -> Vec<&ToolUseBlock> {
        self.blocks()
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// Get all tool-result blocks in order.
    #[must_use]
    pub fn tool_results(&self) -> Vec<&ToolResultBlock> {
        self.blocks()
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// Check if this content is empty (blank string or zero blocks).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Blocks(blocks) => blocks.is_empty(),
        }
    }
}

/// Content block - one of the typed pieces of a block-list message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Natural language text.
    Text(TextBlock),

    /// Tool invocation request.
    ToolUse(ToolUseBlock),

    /// Tool execution outcome.
    ToolResult(ToolResultBlock),

    /// Extended reasoning.
    Thinking(ThinkingBlock),

    /// Redacted reasoning (opaque payload).
    RedactedThinking(RedactedThinkingBlock),

    /// Visual input.
    Image(ImageBlock),
}

impl ContentBlock {
    /// Get the type name of this content block.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::ToolUse(_) => "tool_use",
            Self::ToolResult(_) => "tool_result",
            Self::Thinking(_) => "thinking",
            Self::RedactedThinking(_) => "redacted_thinking",
            Self::Image(_) => "image",
        }
    }

    /// Check if this is a tool use block.
    #[must_use]
    pub const fn is_tool_use(&self) -> bool {
        matches!(self, Self::ToolUse(_))
    }

    /// Check if this is a tool result block.
    #[must_use]
    pub const fn is_tool_result(&self) -> bool {
        matches!(self, Self::ToolResult(_))
    }
}

/// Text content block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextBlock {
    /// The text content.
    #[serde(default)]
    pub text: String,

    /// Unknown fields for forward compatibility.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Tool use content block - tool invocation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUseBlock {
    /// Tool use id, linking results back to this call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Tool name.
    pub name: String,

    /// Tool input parameters.
    #[serde(default)]
    pub input: Value,

    /// Unknown fields for forward compatibility.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Tool result content block - tool execution outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultBlock {
    /// Links to the corresponding tool_use id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,

    /// Result content - string, array, or absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ToolResultContent>,

    /// Error state (three-state: true/false/absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,

    /// Unknown fields for forward compatibility.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl ToolResultBlock {
    /// Check if this result carries an explicit error flag.
    #[must_use]
    pub fn is_explicit_error(&self) -> bool {
        self.is_error == Some(true)
    }

    /// Flatten the result content to displayable text.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.content {
            Some(content) => content.text(),
            None => String::new(),
        }
    }
}

/// Tool result content - string for most tools, array for fan-out tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    /// String content.
    String(String),

    /// Array of content objects.
    Array(Vec<Value>),
}

impl ToolResultContent {
    /// Flatten to displayable text: the string itself, or the `text` fields of
    /// array entries joined with newlines.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Array(items) => items
                .iter()
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Thinking content block - extended reasoning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThinkingBlock {
    /// Reasoning text.
    #[serde(default)]
    pub thinking: String,

    /// Verification signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Unknown fields for forward compatibility.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Redacted thinking block - reasoning withheld, payload opaque.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedactedThinkingBlock {
    /// Opaque encrypted payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// Unknown fields for forward compatibility.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Image content block. The source payload is kept opaque; rendering is a
/// display-layer concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageBlock {
    /// Image source (base64/url/file shaped).
    #[serde(default)]
    pub source: Value,

    /// Unknown fields for forward compatibility.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Fresh (non-cached) input tokens.
    #[serde(default)]
    pub input_tokens: u64,

    /// Generated output tokens.
    #[serde(default)]
    pub output_tokens: u64,

    /// Tokens used to build cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<u64>,

    /// Tokens retrieved from cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u64>,

    /// Unknown fields for forward compatibility.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl TokenUsage {
    /// Input plus output tokens (cache reads excluded).
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_plain_string() {
        let body: MessageBody =
            serde_json::from_str(r#"{"role":"user","content":"hello there"}"#).unwrap();
        let content = body.content.unwrap();
        assert_eq!(content.as_str(), Some("hello there"));
        assert_eq!(content.text().as_deref(), Some("hello there"));
        assert!(!content.has_tool_use());
    }

    #[test]
    fn test_content_blocks() {
        let json = r#"{
            "role": "assistant",
            "model": "sonnet-4",
            "content": [
                {"type": "thinking", "thinking": "let me see", "signature": "abc"},
                {"type": "text", "text": "First."},
                {"type": "tool_use", "id": "toolu_01", "name": "Read", "input": {"file_path": "/tmp/x"}},
                {"type": "text", "text": "Second."}
            ]
        }"#;
        let body: MessageBody = serde_json::from_str(json).unwrap();
        let content = body.content.unwrap();

        assert_eq!(content.text().as_deref(), Some("First.\nSecond."));
        assert_eq!(content.thinking_text().as_deref(), Some("let me see"));
        assert!(content.has_tool_use());
        assert_eq!(content.tool_uses().len(), 1);
        assert_eq!(content.tool_uses()[0].name, "Read");
    }

    #[test]
    fn test_tool_result_text_forms() {
        let string_form: ToolResultBlock = serde_json::from_str(
            r#"{"tool_use_id":"toolu_01","content":"ok done","is_error":false}"#,
        )
        .unwrap();
        assert_eq!(string_form.text(), "ok done");
        assert!(!string_form.is_explicit_error());

        let array_form: ToolResultBlock = serde_json::from_str(
            r#"{"tool_use_id":"toolu_02","content":[{"type":"text","text":"part one"},{"type":"text","text":"part two"}]}"#,
        )
        .unwrap();
        assert_eq!(array_form.text(), "part one\npart two");

        let absent: ToolResultBlock = serde_json::from_str(r#"{"tool_use_id":"toolu_03"}"#).unwrap();
        assert_eq!(absent.text(), "");
    }

    #[test]
    fn test_redacted_thinking_roundtrip() {
        let json = r#"{"type":"redacted_thinking","data":"EkYexample"}"#;
        let block: ContentBlock = serde_json::from_str(json).unwrap();
        assert_eq!(block.type_name(), "redacted_thinking");
    }

    #[test]
    fn test_usage_total() {
        let usage: TokenUsage = serde_json::from_str(
            r#"{"input_tokens":120,"output_tokens":30,"cache_read_input_tokens":9000}"#,
        )
        .unwrap();
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let json = r#"{"role":"user","content":"hi","futureField":{"a":1}}"#;
        let body: MessageBody = serde_json::from_str(json).unwrap();
        assert!(body.extra.contains_key("futureField"));

        let back = serde_json::to_value(&body).unwrap();
        assert_eq!(back.get("futureField").and_then(|v| v.get("a")), Some(&serde_json::json!(1)));
    }
}
