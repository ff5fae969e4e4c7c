//! Resume checkpoint
//!
//! `state/checkpoint.json` maps each `"{site_identity}|{field_set}"` key to
//! the last status of that seed. The file is always rewritten whole through
//! a temp file in the same directory followed by a rename, so a crash leaves
//! either the previous or the new version on disk.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::errors::{PipelineError, PipelineResult};

/// Status of one seed under one field set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedStatus {
    Pending,
    Done,
    /// Stable error kind, see [`super::SeedError::kind`]
    Error(String),
}

impl SeedStatus {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "done" => Self::Done,
            "pending" => Self::Pending,
            other => match other.strip_prefix("error:") {
                Some(kind) => Self::Error(kind.to_string()),
                None => Self::Error(other.to_string()),
            },
        }
    }

    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for SeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Done => f.write_str("done"),
            Self::Error(kind) => write!(f, "error:{kind}"),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CheckpointFile {
    #[serde(default)]
    done: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl CheckpointStore {
    /// Load the checkpoint, or start empty when the file does not exist
    ///
    /// An unreadable or corrupt file is logged and treated as empty rather
    /// than aborting the run.
    ///
    /// # Errors
    ///
    /// Fails only when the file exists but cannot be read at all.
    pub fn load(path: impl Into<PathBuf>) -> PipelineResult<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<CheckpointFile>(&raw) {
                Ok(file) => file.done,
                Err(e) => {
                    warn!(
                        target: "campusscrape::run",
                        "checkpoint {} is corrupt ({e}), starting fresh",
                        path.display()
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(PipelineError::io(&path, e)),
        };

        debug!(target: "campusscrape::run", "checkpoint: {} entries", entries.len());
        Ok(Self { path, entries })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn status(&self, key: &str) -> SeedStatus {
        self.entries
            .get(key)
            .map_or(SeedStatus::Pending, |raw| SeedStatus::parse(raw))
    }

    #[must_use]
    pub fn is_done(&self, key: &str) -> bool {
        self.status(key).is_done()
    }

    /// Keys currently marked done
    pub fn done_keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, status)| status.as_str() == "done")
            .map(|(key, _)| key.as_str())
    }

    pub fn set(&mut self, key: impl Into<String>, status: &SeedStatus) {
        self.entries.insert(key.into(), status.to_string());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the whole checkpoint atomically
    ///
    /// # Errors
    ///
    /// Fails when the state directory cannot be created or written.
    pub fn persist(&self) -> PipelineResult<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;

        let file = CheckpointFile {
            done: self.entries.clone(),
        };
        let json = serde_json::to_vec_pretty(&file).map_err(|e| PipelineError::json(&self.path, e))?;

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| PipelineError::io(dir, e))?;
        temp.write_all(&json)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| PipelineError::io(temp.path(), e))?;
        temp.persist(&self.path)
            .map_err(|e| PipelineError::io(&self.path, e.error))?;
        Ok(())
    }
}
