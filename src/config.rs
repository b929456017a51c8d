//! Configuration for claude-stitch.
//!
//! A small TOML file controls display truncation and ingestion knobs.
//! Missing file means defaults; saving is atomic so a crash mid-write never
//! leaves a truncated config behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Result, StitchError};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Display options.
    #[serde(default)]
    pub display: DisplayConfig,
    /// Ingestion options.
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Display truncation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Maximum reply preview length in bytes (char-boundary safe).
    #[serde(default = "default_preview_len")]
    pub reply_preview_len: usize,
    /// Maximum thinking preview length in bytes.
    #[serde(default = "default_preview_len")]
    pub thinking_preview_len: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            reply_preview_len: default_preview_len(),
            thinking_preview_len: default_preview_len(),
        }
    }
}

/// Ingestion options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Whether subagent session files (`agent-*.jsonl`) are ingested.
    #[serde(default)]
    pub include_agent_files: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            include_agent_files: false,
        }
    }
}

fn default_preview_len() -> usize {
    240
}

impl Config {
    /// Load configuration from the default location, or defaults when no
    /// file exists.
    pub fn load() -> Result<Self> {
        let path = default_config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StitchError::io(format!("Failed to read config file: {}", path.display()), e)
        })?;
        toml::from_str(&content).map_err(|e| StitchError::config(e.to_string()))
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = default_config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path, atomically.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| StitchError::config(format!("Failed to serialize config: {e}")))?;
        atomic_write(path, content.as_bytes())
    }
}

/// Default config file path: `<config dir>/claude-stitch/config.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("claude-stitch").join("config.toml"))
        .ok_or_else(|| StitchError::config("could not determine config directory"))
}

/// Write-to-temp-then-rename so the target is never half-written.
fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| StitchError::IoError {
        context: format!("Cannot determine parent directory for: {}", path.display()),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent directory"),
    })?;

    if !parent.exists() {
        std::fs::create_dir_all(parent).map_err(|e| {
            StitchError::io(format!("Failed to create directory: {}", parent.display()), e)
        })?;
    }

    // Temp file in the same directory guarantees a same-filesystem rename.
    let mut temp = NamedTempFile::new_in(parent).map_err(|e| {
        StitchError::io(
            format!("Failed to create temporary file in: {}", parent.display()),
            e,
        )
    })?;
    temp.write_all(content)
        .map_err(|e| StitchError::io(format!("Failed to write: {}", path.display()), e))?;
    temp.persist(path)
        .map_err(|e| StitchError::io(format!("Failed to persist: {}", path.display()), e.error))?;
    Ok(())
}
