//! Trial Store - file-backed trial attempt outputs

use std::path::{Path, PathBuf};

use super::persist::{read_json, write_json_atomic};
use super::{TrialAttempt, TrialRecord};
use crate::Result;

/// File-backed store of trial attempt outputs under a results root.
///
/// Each attempt owns exactly one JSON file holding its ordered records.
/// Files are written once, atomically, and never modified afterwards.
#[derive(Debug, Clone)]
pub struct TrialStore {
    root: PathBuf,
}

impl TrialStore {
    /// Create a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the results root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute (root-joined) path of an attempt's file.
    #[must_use]
    pub fn path_for(&self, attempt: &TrialAttempt) -> PathBuf {
        attempt.path_in(&self.root)
    }

    /// Whether the attempt has already completed.
    #[must_use]
    pub fn contains(&self, attempt: &TrialAttempt) -> bool {
        self.path_for(attempt).is_file()
    }

    /// Read back an attempt's records.
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing or not a JSON array of records
    pub fn read(&self, attempt: &TrialAttempt) -> Result<Vec<TrialRecord>> {
        read_json(&self.path_for(attempt))
    }

    /// Persist an attempt's records and return the file path.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn write(&self, attempt: &TrialAttempt, records: &[TrialRecord]) -> Result<PathBuf> {
        let path = self.path_for(attempt);
        write_json_atomic(&path, records)?;
        tracing::debug!(path = %path.display(), records = records.len(), "trial written");
        Ok(path)
    }
}
