//! Lossy project-path encoding and its best-effort reversal.
//!
//! The log producer stores each project's sessions under a directory whose
//! name is derived from the project's absolute path: every `/` and `_` is
//! replaced with `-`, and the result is prefixed with `-`. The mapping is
//! many-to-one, so decoding cannot distinguish an original `-` from a
//! converted `/` or `_`. Decoded paths are therefore tagged with a
//! [`PathSource`] and [`PathConfidence`] so downstream consumers never treat
//! a guess as ground truth.

use serde::{Deserialize, Serialize};

/// Encode an absolute project path the way the log producer does.
///
/// Replaces every `/` and `_` with `-` and ensures a leading `-`. This is
/// the forward direction only; see [`decode_encoded_id`] for the caveats on
/// reversing it.
#[must_use]
pub fn encode_path(path: &str) -> String {
    let encoded = path.replace(['/', '_'], "-");
    if encoded.starts_with('-') {
        encoded
    } else {
        format!("-{encoded}")
    }
}

/// Best-effort decode of an encoded directory id back to a path.
///
/// Strips the leading `-`, splits on `-`, discards empty segments, and
/// rejoins with `/`. Lossy: an original `-` or `_` in the path comes back as
/// `/`. Callers must label the result [`PathConfidence::Low`] unless
/// corroborating history evidence exists.
#[must_use]
pub fn decode_encoded_id(id: &str) -> String {
    let segments: Vec<&str> = id
        .strip_prefix('-')
        .unwrap_or(id)
        .split('-')
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

/// Whether an id string looks like an encoded directory name.
///
/// Real encoded ids always start with `-`; legacy ids recorded from `cwd`
/// are literal paths and never do.
#[must_use]
pub fn looks_encoded(id: &str) -> bool {
    id.starts_with('-')
}

/// Where a project's canonical path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathSource {
    /// Exactly one history path encodes to this id.
    #[serde(rename = "history")]
    History,
    /// Multiple history paths collide on this id; the most-visited one won.
    #[serde(rename = "history-ambiguous-picked-max")]
    HistoryAmbiguousPickedMax,
    /// No history evidence; the path is a lossy decode of the id.
    #[serde(rename = "guessed-from-encoded")]
    GuessedFromEncoded,
}

/// How much to trust a resolved path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathConfidence {
    /// Guessed from the encoded id alone.
    Low,
    /// Picked among colliding history paths.
    Medium,
    /// Uniquely corroborated by history.
    High,
}

/// A decoded path together with its provenance tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPath {
    /// The decoded or corroborated path.
    pub path: String,
    /// Where the path came from.
    pub source: PathSource,
    /// How much to trust it.
    pub confidence: PathConfidence,
}

impl ResolvedPath {
    /// A path backed by a unique history entry.
    #[must_use]
    pub fn exact(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: PathSource::History,
            confidence: PathConfidence::High,
        }
    }

    /// A path picked among colliding history entries.
    #[must_use]
    pub fn ambiguous(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: PathSource::HistoryAmbiguousPickedMax,
            confidence: PathConfidence::Medium,
        }
    }

    /// A path guessed from the encoded id with no corroboration.
    #[must_use]
    pub fn guessed(encoded_id: &str) -> Self {
        Self {
            path: decode_encoded_id(encoded_id),
            source: PathSource::GuessedFromEncoded,
            confidence: PathConfidence::Low,
        }
    }
}
