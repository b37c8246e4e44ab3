//! Experiment Orchestrator - strategies × methods × repetitions
//!
//! ## Run shape
//!
//! ```text
//! for method in strategy.methods:
//!     for rep in 0..N:                      (N = 1, no index, if deterministic)
//!         runner.run(attempt)  ─ skipped ─> next rep
//!                              ─ failed  ─> log, record, next rep
//!                              ─ done    ─> accumulate (best, time, seconds)
//!     merge accumulator into summary database (if non-empty)
//! reload summary database → report
//! ```
//!
//! The accumulator only ever holds repetitions completed by this call;
//! skipped ones are already in the persisted database.
//!
//! ## Preconditions
//!
//! One orchestrator process per algorithm at a time: summary merges are an
//! unsynchronized read-modify-write.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::engine::TuningEngine;
use crate::experiment::{
    experiment_name, MergeOutcome, SummaryDatabase, SummaryLoad, SummaryReport, SummaryStore,
    TrialAttempt, TrialStore,
};
use crate::registry::{AlgorithmSpec, Registry, StrategySpec};
use crate::runner::{TrialOutcome, TrialRunner};
use crate::Result;

/// A repetition that failed in this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialFailure {
    /// Output file that was being produced (still absent)
    pub path: PathBuf,
    /// Failure description
    pub message: String,
}

/// What happened to one method during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodOutcome {
    /// Summary key (`strategy` or `strategy_method`)
    pub experiment_name: String,
    /// Method name, if any
    pub method: Option<String>,
    /// Repetitions executed and persisted by this run
    pub completed: usize,
    /// Repetitions whose output already existed
    pub skipped: usize,
    /// Repetitions that failed
    pub failures: Vec<TrialFailure>,
    /// Summary merge result, if anything was merged
    pub merge: Option<MergeOutcome>,
    /// Summary merge failure, if the merge itself failed
    pub merge_error: Option<String>,
}

impl MethodOutcome {
    fn new(strategy: &str, method: Option<&str>) -> Self {
        Self {
            experiment_name: experiment_name(strategy, method),
            method: method.map(str::to_string),
            completed: 0,
            skipped: 0,
            failures: Vec::new(),
            merge: None,
            merge_error: None,
        }
    }
}

/// State of the summary database at the end of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryState {
    /// Database loaded; statistics attached
    Available(SummaryReport),
    /// No database exists yet (nothing has ever been merged)
    Absent,
    /// Database exists but could not be read
    Corrupt {
        /// Why it was rejected
        reason: String,
    },
}

/// Result of [`Orchestrator::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Algorithm name
    pub algorithm: String,
    /// Strategy name
    pub strategy: String,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Wall-clock end
    pub finished_at: DateTime<Utc>,
    /// Per-method outcomes, in declared order
    pub methods: Vec<MethodOutcome>,
    /// Summary database after the run
    pub summary: SummaryState,
}

impl RunReport {
    /// Total repetitions completed by this run.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.methods.iter().map(|m| m.completed).sum()
    }

    /// Total repetitions skipped by this run.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.methods.iter().map(|m| m.skipped).sum()
    }

    /// All failed repetitions.
    pub fn failures(&self) -> impl Iterator<Item = &TrialFailure> {
        self.methods.iter().flat_map(|m| &m.failures)
    }

    /// True if any repetition or merge failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.methods
            .iter()
            .any(|m| !m.failures.is_empty() || m.merge_error.is_some())
    }

    /// Human-readable end-of-run output.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        match &self.summary {
            SummaryState::Available(report) => out.push_str(&report.render_details()),
            SummaryState::Absent => {
                let _ = writeln!(out, "no summary database for {} yet", self.algorithm);
            }
            SummaryState::Corrupt { reason } => {
                let _ = writeln!(out, "summary database for {} unreadable: {reason}", self.algorithm);
            }
        }

        let _ = writeln!(
            out,
            "{} {}: {} completed, {} skipped, {} failed in {}s",
            self.algorithm,
            self.strategy,
            self.completed(),
            self.skipped(),
            self.failures().count(),
            (self.finished_at - self.started_at).num_seconds()
        );
        for failure in self.failures() {
            let _ = writeln!(out, "failed: {} ({})", failure.path.display(), failure.message);
        }
        for m in &self.methods {
            if let Some(e) = &m.merge_error {
                let _ = writeln!(out, "merge failed for {}: {e}", m.experiment_name);
            }
        }
        out
    }
}

/// Drives a tuning engine over the registry's strategies and keeps the
/// per-algorithm summary database up to date.
pub struct Orchestrator<E> {
    registry: Registry,
    runner: TrialRunner,
    engine: E,
}

impl<E: TuningEngine> Orchestrator<E> {
    /// Create an orchestrator writing under `root`.
    #[must_use]
    pub fn new(registry: Registry, root: impl Into<PathBuf>, engine: E) -> Self {
        Self {
            registry,
            runner: TrialRunner::new(TrialStore::new(root)),
            engine,
        }
    }

    /// Get the registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Get the results root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.runner.store().root()
    }

    /// Get the engine.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Consume the orchestrator, returning the engine.
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Summary store for `algorithm`.
    #[must_use]
    pub fn summary_store(&self, algorithm: &str) -> SummaryStore {
        SummaryStore::new(self.root(), algorithm)
    }

    /// Every attempt of `strategy` for `algorithm`, in execution order.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either name is unknown
    pub fn attempts(&self, algorithm: &str, strategy: &str) -> Result<Vec<TrialAttempt>> {
        let (algorithm, strategy) = self.resolve(algorithm, strategy)?;
        Ok(plan(algorithm, strategy))
    }

    /// Attempts whose output does not exist yet, in execution order.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either name is unknown
    pub fn pending(&self, algorithm: &str, strategy: &str) -> Result<Vec<TrialAttempt>> {
        let store = self.runner.store();
        Ok(self
            .attempts(algorithm, strategy)?
            .into_iter()
            .filter(|a| !store.contains(a))
            .collect())
    }

    /// Statistics for `algorithm` from its persisted summary database alone.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the algorithm is unknown
    pub fn summary(&self, algorithm: &str) -> Result<SummaryState> {
        let spec = self.registry.algorithm(algorithm)?;
        Ok(summary_state(spec, self.summary_store(algorithm).load()))
    }

    /// Run every pending repetition of every method of `strategy`.
    ///
    /// Trial failures are logged, recorded in the report, and do not stop
    /// the run. Each method's new results are merged into the summary
    /// database as soon as that method finishes.
    ///
    /// # Errors
    ///
    /// Returns a configuration error, before touching any file, if either
    /// name is unknown
    pub fn run(&mut self, algorithm: &str, strategy: &str) -> Result<RunReport> {
        let (algorithm, strategy) = self.resolve(algorithm, strategy)?;
        let algorithm = algorithm.clone();
        let strategy = strategy.clone();
        let started_at = Utc::now();
        tracing::info!(
            algorithm = %algorithm.name,
            strategy = %strategy.name,
            methods = strategy.methods.len(),
            "starting experiment"
        );

        let store = self.summary_store(&algorithm.name);
        let mut methods = Vec::with_capacity(strategy.methods.len());
        for method in &strategy.methods {
            let (outcome, partial) = self.run_method(&algorithm, &strategy, method.as_deref());
            methods.push(merge_method(&store, outcome, partial));
        }

        let summary = summary_state(&algorithm, store.load());
        let report = RunReport {
            algorithm: algorithm.name.clone(),
            strategy: strategy.name.clone(),
            started_at,
            finished_at: Utc::now(),
            methods,
            summary,
        };
        tracing::info!(
            algorithm = %report.algorithm,
            strategy = %report.strategy,
            completed = report.completed(),
            skipped = report.skipped(),
            failed = report.failures().count(),
            "experiment finished"
        );
        Ok(report)
    }

    fn resolve(&self, algorithm: &str, strategy: &str) -> Result<(&AlgorithmSpec, &StrategySpec)> {
        Ok((
            self.registry.algorithm(algorithm)?,
            self.registry.strategy(strategy)?,
        ))
    }

    fn run_method(
        &mut self,
        algorithm: &AlgorithmSpec,
        strategy: &StrategySpec,
        method: Option<&str>,
    ) -> (MethodOutcome, SummaryDatabase) {
        let mut outcome = MethodOutcome::new(&strategy.name, method);
        let mut partial = SummaryDatabase::new();

        for repetition in strategy.repetition_indices() {
            let attempt = TrialAttempt::new(&algorithm.name, &strategy.name, method, repetition);
            match self.runner.run(&mut self.engine, algorithm, &attempt) {
                Ok(TrialOutcome::Skipped { .. }) => outcome.skipped += 1,
                Ok(TrialOutcome::Completed(trial)) => {
                    // the runner guarantees a comparable best record
                    let Some(best) = trial.best().cloned() else {
                        continue;
                    };
                    let pushed = partial
                        .entry_mut(&outcome.experiment_name)
                        .push(best, trial.execution_time);
                    debug_assert!(pushed);
                    outcome.completed += 1;
                }
                Err(e) => {
                    let path = self.runner.store().path_for(&attempt);
                    tracing::error!(path = %path.display(), error = %e, "trial failed");
                    outcome.failures.push(TrialFailure {
                        path,
                        message: e.to_string(),
                    });
                }
            }
        }
        (outcome, partial)
    }
}

fn plan(algorithm: &AlgorithmSpec, strategy: &StrategySpec) -> Vec<TrialAttempt> {
    let repetitions = strategy.repetition_indices();
    strategy
        .methods
        .iter()
        .flat_map(|method| {
            repetitions.iter().map(move |rep| {
                TrialAttempt::new(&algorithm.name, &strategy.name, method.as_deref(), *rep)
            })
        })
        .collect()
}

fn merge_method(
    store: &SummaryStore,
    mut outcome: MethodOutcome,
    partial: SummaryDatabase,
) -> MethodOutcome {
    if partial.is_empty() {
        return outcome;
    }
    match store.merge(partial) {
        Ok(merge) => outcome.merge = Some(merge),
        Err(e) => {
            tracing::error!(
                experiment = %outcome.experiment_name,
                path = %store.path().display(),
                error = %e,
                "summary merge failed"
            );
            outcome.merge_error = Some(e.to_string());
        }
    }
    outcome
}

fn summary_state(algorithm: &AlgorithmSpec, load: SummaryLoad) -> SummaryState {
    match load {
        SummaryLoad::Loaded(db) => SummaryState::Available(SummaryReport::new(
            &algorithm.name,
            algorithm.total_ops,
            &algorithm.unit,
            db,
        )),
        SummaryLoad::Absent => SummaryState::Absent,
        SummaryLoad::Corrupt { reason } => SummaryState::Corrupt { reason },
    }
}
