//! Trial Runner - executes one trial attempt at most once
//!
//! A completed attempt is exactly one file on disk. The runner checks for it
//! before calling the engine and writes it only after the engine succeeded,
//! so a failed or interrupted trial leaves no evidence of completion and is
//! retried next time.

use std::path::PathBuf;
use std::time::Instant;

use serde_json::Value;

use crate::engine::{TuneRequest, TuningEngine};
use crate::experiment::{best_of, TrialAttempt, TrialRecord, TrialStore};
use crate::registry::AlgorithmSpec;
use crate::{Error, Result};

/// Key the runner stamps into the environment descriptor (seconds).
pub const EXECUTION_TIME_KEY: &str = "execution_time";

/// A trial attempt the runner just executed and persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTrial {
    /// Identity of the attempt
    pub attempt: TrialAttempt,
    /// File the records were written to
    pub path: PathBuf,
    /// Every measured configuration, in engine order
    pub records: Vec<TrialRecord>,
    /// Engine environment descriptor, with `execution_time` added
    pub environment: Value,
    /// Wall-clock seconds spent inside the engine
    pub execution_time: f64,
}

impl CompletedTrial {
    /// Record with the smallest valid time.
    #[must_use]
    pub fn best(&self) -> Option<&TrialRecord> {
        best_of(&self.records)
    }
}

/// Outcome of [`TrialRunner::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    /// Output already existed; the engine was not called.
    Skipped {
        /// Existing output file
        path: PathBuf,
    },
    /// Engine ran and its output was persisted.
    Completed(CompletedTrial),
}

/// Runs trial attempts against a [`TrialStore`].
#[derive(Debug, Clone)]
pub struct TrialRunner {
    store: TrialStore,
}

impl TrialRunner {
    /// Create a runner writing into `store`.
    #[must_use]
    pub const fn new(store: TrialStore) -> Self {
        Self { store }
    }

    /// Get the underlying store.
    #[must_use]
    pub const fn store(&self) -> &TrialStore {
        &self.store
    }

    /// Run `attempt` unless its output already exists.
    ///
    /// # Errors
    ///
    /// - `Error::Engine` if the engine fails
    /// - `Error::NoValidRecords` if no returned record has a valid time
    /// - IO/serialization errors if the output cannot be written
    ///
    /// In every error case the output file is absent afterwards.
    pub fn run<E: TuningEngine + ?Sized>(
        &self,
        engine: &mut E,
        algorithm: &AlgorithmSpec,
        attempt: &TrialAttempt,
    ) -> Result<TrialOutcome> {
        let path = self.store.path_for(attempt);
        if self.store.contains(attempt) {
            tracing::info!(path = %path.display(), "output file already exists, skipping");
            return Ok(TrialOutcome::Skipped { path });
        }

        tracing::info!(path = %path.display(), "running trial");
        let request = TuneRequest {
            algorithm,
            strategy: attempt.strategy(),
            method: attempt.method(),
        };

        let start = Instant::now();
        let output = engine
            .tune(&request)
            .map_err(|source| Error::Engine {
                path: path.clone(),
                source,
            })?;
        let execution_time = start.elapsed().as_secs_f64();

        if best_of(&output.results).is_none() {
            return Err(Error::NoValidRecords { path });
        }

        let mut environment = output.env;
        stamp_execution_time(&mut environment, execution_time);

        let path = self.store.write(attempt, &output.results)?;
        tracing::info!(
            path = %path.display(),
            records = output.results.len(),
            execution_time,
            "trial completed"
        );

        Ok(TrialOutcome::Completed(CompletedTrial {
            attempt: attempt.clone(),
            path,
            records: output.results,
            environment,
            execution_time,
        }))
    }
}

fn stamp_execution_time(environment: &mut Value, seconds: f64) {
    if environment.is_null() {
        *environment = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(map) = environment {
        map.insert(EXECUTION_TIME_KEY.to_string(), Value::from(seconds));
    }
}
