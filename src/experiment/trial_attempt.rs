//! Trial Attempt - identity of one engine invocation and its output file

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Summary-database key for a strategy/method pair: `strategy` or
/// `strategy_method`.
#[must_use]
pub fn experiment_name(strategy: &str, method: Option<&str>) -> String {
    match method {
        Some(method) => format!("{strategy}_{method}"),
        None => strategy.to_string(),
    }
}

/// Trial Attempt identifies one execution of the engine for one
/// (algorithm, strategy, method, repetition).
///
/// Deterministic strategies carry no repetition index. The attempt maps 1:1
/// to a file `<algorithm>/<algorithm>_<strategy>[_<method>][_<rep>].json`,
/// and the presence of that file is the only signal that it has completed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrialAttempt {
    algorithm: String,
    strategy: String,
    method: Option<String>,
    repetition: Option<u32>,
}

impl TrialAttempt {
    /// Create a new trial attempt identity.
    #[must_use]
    pub fn new(
        algorithm: impl Into<String>,
        strategy: impl Into<String>,
        method: Option<&str>,
        repetition: Option<u32>,
    ) -> Self {
        Self {
            algorithm: algorithm.into(),
            strategy: strategy.into(),
            method: method.map(str::to_string),
            repetition,
        }
    }

    /// Get the algorithm name.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Get the strategy name.
    #[must_use]
    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    /// Get the method name, if the strategy has named methods.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Get the repetition index; `None` for deterministic strategies.
    #[must_use]
    pub const fn repetition(&self) -> Option<u32> {
        self.repetition
    }

    /// Summary-database key this attempt contributes to.
    #[must_use]
    pub fn experiment_name(&self) -> String {
        experiment_name(&self.strategy, self.method())
    }

    /// Output file name, without directory.
    #[must_use]
    pub fn file_name(&self) -> String {
        let mut name = format!("{}_{}", self.algorithm, self.experiment_name());
        if let Some(rep) = self.repetition {
            name.push('_');
            name.push_str(&rep.to_string());
        }
        name.push_str(".json");
        name
    }

    /// Output path relative to the results root.
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.algorithm).join(self.file_name())
    }

    /// Output path under `root`.
    #[must_use]
    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(self.relative_path())
    }
}

impl fmt::Display for TrialAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.algorithm, self.file_name())
    }
}
