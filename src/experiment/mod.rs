//! Experiment results schema and persistence
//!
//! This module holds the data that outlives a run: raw trial outputs and
//! the per-algorithm summary database built from them.
//!
//! ## Schema Overview
//!
//! ```text
//! TrialAttempt (1) ── file ──< TrialRecord (N)
//!        │
//!        └─ best record ──> ExperimentSummaryEntry ──< SummaryDatabase
//!                              (best, best_times,        (per algorithm)
//!                               execution_time)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use tuning_ledger::experiment::{best_of, SummaryDatabase, TrialAttempt, TrialRecord};
//!
//! let attempt = TrialAttempt::new("gemm", "pso", None, Some(0));
//! assert_eq!(attempt.to_string(), "gemm/gemm_pso_0.json");
//!
//! let records = vec![
//!     TrialRecord::builder().param("block_size_x", 64).time(3.2).build(),
//!     TrialRecord::builder().param("block_size_x", 128).time(2.1).build(),
//! ];
//! let best = best_of(&records).unwrap().clone();
//!
//! let mut partial = SummaryDatabase::new();
//! assert!(partial.entry_mut(attempt.experiment_name()).push(best, 12.5));
//! assert_eq!(partial.get("pso").unwrap().best_times(), &[2.1]);
//! ```

pub(crate) mod persist;
pub mod stats;
mod summary;
mod summary_store;
mod trial_attempt;
mod trial_record;
mod trial_store;

pub use stats::{EntryStatistics, SummaryReport};
pub use summary::{ExperimentSummaryEntry, MergedKeys, SummaryDatabase};
pub use summary_store::{Baseline, MergeOutcome, SummaryLoad, SummaryStore, SUMMARY_SUFFIX};
pub use trial_attempt::{experiment_name, TrialAttempt};
pub use trial_record::{best_of, TrialRecord, TrialRecordBuilder, TIME_KEY};
pub use trial_store::TrialStore;
