//! Summary Store - durable home of an algorithm's summary database
//!
//! ## Single writer
//!
//! `merge` is an unsynchronized read-modify-write. Exactly one process may
//! merge into a given algorithm's summary at a time; two concurrent writers
//! can silently lose one side's update.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::persist::write_json_atomic;
use super::summary::{MergedKeys, SummaryDatabase};
use crate::{Error, Result};

/// Suffix of the summary database file name, `<algorithm>_summary.json`.
pub const SUMMARY_SUFFIX: &str = "summary";

/// Result of loading a summary database.
///
/// Absent and corrupt files both behave as "no prior data" through
/// [`SummaryLoad::into_database`], but callers can tell them apart.
#[derive(Debug)]
pub enum SummaryLoad {
    /// File read and decoded.
    Loaded(SummaryDatabase),
    /// No file at the path.
    Absent,
    /// File present but unreadable or undecodable.
    Corrupt {
        /// Why the file was rejected
        reason: String,
    },
}

impl SummaryLoad {
    /// The loaded database, or an empty one for absent/corrupt files.
    #[must_use]
    pub fn into_database(self) -> SummaryDatabase {
        match self {
            Self::Loaded(db) => db,
            Self::Absent | Self::Corrupt { .. } => SummaryDatabase::new(),
        }
    }

    /// The baseline kind this load represents.
    #[must_use]
    pub const fn baseline(&self) -> Baseline {
        match self {
            Self::Loaded(_) => Baseline::Loaded,
            Self::Absent => Baseline::Absent,
            Self::Corrupt { .. } => Baseline::Corrupt,
        }
    }
}

/// What a merge started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline {
    /// Existing database read successfully.
    Loaded,
    /// No database existed yet.
    Absent,
    /// Existing file could not be used and was treated as empty.
    Corrupt,
}

/// Outcome of [`SummaryStore::merge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// What the merge started from
    pub baseline: Baseline,
    /// Keys appended to or inserted
    pub keys: MergedKeys,
    /// Whether the file was rewritten
    pub written: bool,
    /// Where a corrupt predecessor was copied before being replaced
    pub corrupt_backup: Option<PathBuf>,
}

/// File-backed summary database for one algorithm, at
/// `<root>/<algorithm>/<algorithm>_summary.json`.
#[derive(Debug, Clone)]
pub struct SummaryStore {
    path: PathBuf,
}

impl SummaryStore {
    /// Store for `algorithm` under the results root.
    #[must_use]
    pub fn new(root: &Path, algorithm: &str) -> Self {
        Self {
            path: root
                .join(algorithm)
                .join(format!("{algorithm}_{SUMMARY_SUFFIX}.json")),
        }
    }

    /// Store at an explicit path.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the database. Never fails; see [`SummaryLoad`].
    #[must_use]
    pub fn load(&self) -> SummaryLoad {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return SummaryLoad::Absent,
            Err(e) => return self.corrupt(format!("unreadable: {e}")),
        };
        match serde_json::from_slice(&bytes) {
            Ok(db) => SummaryLoad::Loaded(db),
            Err(e) => self.corrupt(format!("undecodable: {e}")),
        }
    }

    fn corrupt(&self, reason: String) -> SummaryLoad {
        tracing::warn!(
            path = %self.path.display(),
            %reason,
            "summary database unusable, treating as empty"
        );
        SummaryLoad::Corrupt { reason }
    }

    /// Replace the database file with `db`.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn store(&self, db: &SummaryDatabase) -> Result<()> {
        write_json_atomic(&self.path, db)
    }

    /// Append a partial summary to the persisted database.
    ///
    /// An empty partial writes nothing. A corrupt predecessor is copied to
    /// `<file>.corrupt-<timestamp>` before it is replaced.
    ///
    /// # Errors
    ///
    /// Returns error if the merged database cannot be written
    pub fn merge(&self, partial: SummaryDatabase) -> Result<MergeOutcome> {
        let load = self.load();
        let baseline = load.baseline();
        let mut db = load.into_database();

        let keys = db.merge(partial);
        if keys.is_empty() {
            return Ok(MergeOutcome {
                baseline,
                keys,
                written: false,
                corrupt_backup: None,
            });
        }

        let corrupt_backup = if baseline == Baseline::Corrupt {
            self.backup_corrupt()
        } else {
            None
        };

        self.store(&db)?;
        tracing::info!(
            path = %self.path.display(),
            appended = ?keys.appended,
            inserted = ?keys.inserted,
            "summary database updated"
        );

        Ok(MergeOutcome {
            baseline,
            keys,
            written: true,
            corrupt_backup,
        })
    }

    fn backup_corrupt(&self) -> Option<PathBuf> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S");
        let mut name = self.path.file_name()?.to_os_string();
        name.push(format!(".corrupt-{stamp}"));
        let backup = self.path.with_file_name(name);
        match fs::copy(&self.path, &backup) {
            Ok(_) => Some(backup),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %Error::file(&backup, e),
                    "could not back up corrupt summary database"
                );
                None
            }
        }
    }
}
