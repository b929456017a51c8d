//! Data model for session log records.
//!
//! Strongly-typed structures for raw log records, message content blocks,
//! and the per-file snapshots derived from them. Every wire-facing struct
//! preserves unknown fields so a reserialized record loses nothing.

pub mod content;
pub mod event;
pub mod snapshot;

pub use content::*;
pub use event::*;
pub use snapshot::*;
