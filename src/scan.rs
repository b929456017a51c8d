//! Locating session log files under a logs root.
//!
//! The logs root holds a `projects/` tree (one encoded subdirectory per
//! project, `.jsonl` session files inside) and an optional `history.jsonl`
//! beside it. Scanning produces a deterministic, lexicographically-sorted
//! list of file references so a re-run over unchanged input feeds the
//! pipeline in the same order.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, StitchError};

/// Directory name of the logs root under the home directory.
pub const LOGS_DIR_NAME: &str = ".claude";

/// Subdirectory holding per-project session files.
pub const PROJECTS_DIR_NAME: &str = "projects";

/// The auxiliary chronological history index file.
pub const HISTORY_FILE_NAME: &str = "history.jsonl";

/// One discovered session file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFileRef {
    /// Path relative to the logs root, forward slashes.
    pub logical_path: String,
    /// Absolute path on disk.
    pub absolute_path: PathBuf,
}

/// A validated logs root directory.
#[derive(Debug, Clone)]
pub struct LogsRoot {
    root: PathBuf,
}

impl LogsRoot {
    /// Use an explicit logs root. Fails when the directory does not exist.
    pub fn at(path: impl Into<PathBuf>) -> Result<Self> {
        let root = path.into();
        if !root.is_dir() {
            return Err(StitchError::LogsRootNotFound {
                expected_path: root,
            });
        }
        Ok(Self { root })
    }

    /// Discover the logs root at `~/.claude`.
    pub fn discover() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| StitchError::LogsRootNotFound {
            expected_path: PathBuf::from("~").join(LOGS_DIR_NAME),
        })?;
        Self::at(home.join(LOGS_DIR_NAME))
    }

    /// The root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the history index file (may not exist).
    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.root.join(HISTORY_FILE_NAME)
    }

    /// Enumerate session files under `projects/`, sorted by logical path.
    ///
    /// Subagent files are excluded unless `include_agent_files` is set. A
    /// missing `projects/` directory yields an empty list, not an error.
    pub fn session_files(&self, include_agent_files: bool) -> Result<Vec<SessionFileRef>> {
        let projects_dir = self.root.join(PROJECTS_DIR_NAME);
        if !projects_dir.is_dir() {
            debug!(root = %self.root.display(), "no projects directory");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&projects_dir).follow_links(false) {
            let entry = entry.map_err(|e| {
                let denied_path = e.path().map(Path::to_path_buf);
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("walk error"));
                walk_error(&projects_dir, denied_path, source)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !is_session_file_name(name) {
                continue;
            }
            if !include_agent_files && is_agent_file_name(name) {
                continue;
            }
            files.push(SessionFileRef {
                logical_path: self.logical_path(entry.path()),
                absolute_path: entry.path().to_path_buf(),
            });
        }

        files.sort_by(|a, b| a.logical_path.cmp(&b.logical_path));
        debug!(count = files.len(), "discovered session files");
        Ok(files)
    }

    /// Path relative to the root, with forward slashes.
    fn logical_path(&self, absolute: &Path) -> String {
        absolute
            .strip_prefix(&self.root)
            .unwrap_or(absolute)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Map a failed directory walk to the right error variant.
///
/// A permission failure names the path that was denied so the user can fix
/// it; everything else stays a generic I/O error.
fn walk_error(
    projects_dir: &Path,
    denied_path: Option<PathBuf>,
    source: std::io::Error,
) -> StitchError {
    if source.kind() == std::io::ErrorKind::PermissionDenied {
        StitchError::PermissionDenied {
            path: denied_path.unwrap_or_else(|| projects_dir.to_path_buf()),
        }
    } else {
        StitchError::io(format!("Failed to walk {}", projects_dir.display()), source)
    }
}

/// Whether a filename looks like a session log file.
#[must_use]
pub fn is_session_file_name(name: &str) -> bool {
    name.ends_with(".jsonl") && name != HISTORY_FILE_NAME
}

/// Whether a filename is a subagent transcript (`agent-*.jsonl`).
#[must_use]
pub fn is_agent_file_name(name: &str) -> bool {
    name.starts_with("agent-") && name.ends_with(".jsonl")
}
