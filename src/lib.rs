//! claude-stitch: reconstructing sessions and projects from fragmented logs.
//!
//! Claude Code session logs are scattered across a `projects/` tree of
//! lossily-encoded directory names, split whenever a workspace moves or a
//! session resumes, and interleaved with injected tool noise. This crate
//! reassembles them: one canonical session per id, one project per
//! workspace, and a replayable turn timeline per project.
//!
//! # Pipeline
//!
//! ```rust,no_run
//! use claude_stitch::config::Config;
//! use claude_stitch::pipeline;
//! use claude_stitch::scan::LogsRoot;
//!
//! #[tokio::main]
//! async fn main() -> claude_stitch::Result<()> {
//!     let root = LogsRoot::discover()?;
//!     let output = pipeline::run_from_root(&root, &Config::default()).await?;
//!     for project in &output.projects {
//!         println!("{} ({} queries)", project.canonical_path, project.query_count);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`scan`]: locating session files under the logs root
//! - [`parser`]: lenient per-file JSONL ingestion into event snapshots
//! - [`model`]: raw event, message content, and snapshot types
//! - [`classify`]: feature flags and snapshot kinds
//! - [`aggregate`]: merging split snapshots into canonical sessions
//! - [`history`]: the auxiliary chronological history index
//! - [`identity`]: resolving distinct projects and their real paths
//! - [`naming`]: shortest-unique display names
//! - [`timeline`]: replaying a project's events as conversation turns
//! - [`pipeline`]: the end-to-end run
//! - [`cli`]: command-line interface
//! - [`config`]: configuration management
//! - [`error`]: error types and ingestion warnings

#![doc(html_root_url = "https://docs.rs/claude-stitch/0.1.0")]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod aggregate;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod identity;
pub mod model;
pub mod naming;
pub mod parser;
pub mod pathcode;
pub mod pipeline;
pub mod scan;
pub mod timeline;

// Re-export commonly used types at the crate root
pub use error::{IngestWarning, Result, StitchError};
pub use pipeline::PipelineOutput;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Prelude module for convenient imports.
pub mod prelude {

    pub use crate::aggregate::CanonicalSession;
    pub use crate::config::Config;
    pub use crate::error::{IngestWarning, Result, StitchError};
    pub use crate::identity::ProjectIdentity;
    pub use crate::pipeline::{run_pipeline, PipelineOutput, SourceFile};
    pub use crate::scan::LogsRoot;
    pub use crate::timeline::{ProjectTurn, ReconstructionContext};
}
