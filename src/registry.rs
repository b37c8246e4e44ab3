//! Algorithm and strategy registries
//!
//! Registries are plain values handed to the orchestrator. The built-in
//! [`Registry::default`] carries the stock kernels and search strategies; a
//! JSON file with the same shape replaces it wholesale.
//!
//! ```json
//! {
//!   "algorithms": [
//!     { "name": "gemm", "total_ops": 17.18, "unit": "GFLOP/s",
//!       "command": ["python3", "gemm/xgemm.py"] }
//!   ],
//!   "strategies": [
//!     { "name": "brute_force", "deterministic": true },
//!     { "name": "minimize", "methods": ["Nelder-Mead", "Powell"] }
//!   ]
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::experiment::persist::read_json;
use crate::experiment::{experiment_name, SUMMARY_SUFFIX};
use crate::{Error, Result};

/// Repetitions of a stochastic strategy when the config does not say.
pub const DEFAULT_REPETITIONS: u32 = 32;

/// A tunable kernel and how to report its throughput.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmSpec {
    /// Registry key; also the results sub-directory
    pub name: String,
    /// Work per run, scaled so `total_ops / seconds` is in `unit`
    pub total_ops: f64,
    /// Throughput unit, e.g. `GFLOP/s`
    pub unit: String,
    /// Display name
    #[serde(default)]
    pub fancy_name: Option<String>,
    /// Device the results were measured on
    #[serde(default)]
    pub device: Option<String>,
    /// Whether a device context must be held around the run
    #[serde(default)]
    pub needs_context: bool,
    /// Opaque problem options forwarded to the engine
    #[serde(default)]
    pub options: Option<serde_json::Value>,
    /// Engine program and arguments for [`crate::engine::CommandEngine`]
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

impl AlgorithmSpec {
    /// Create a spec with the required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, total_ops: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total_ops,
            unit: unit.into(),
            fancy_name: None,
            device: None,
            needs_context: false,
            options: None,
            command: None,
        }
    }

    /// Set display name and device.
    #[must_use]
    pub fn described(mut self, fancy_name: &str, device: &str) -> Self {
        self.fancy_name = Some(fancy_name.to_string());
        self.device = Some(device.to_string());
        self
    }

    /// Mark the algorithm as requiring a device context.
    #[must_use]
    pub const fn with_context(mut self) -> Self {
        self.needs_context = true;
        self
    }

    /// Set the engine command.
    #[must_use]
    pub fn with_command<S: Into<String>>(mut self, command: impl IntoIterator<Item = S>) -> Self {
        self.command = Some(command.into_iter().map(Into::into).collect());
        self
    }

    /// Set opaque engine options.
    #[must_use]
    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = Some(options);
        self
    }
}

/// A search strategy and its method variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySpec {
    /// Registry key
    pub name: String,
    /// Named methods; a single `None` means one implicit method
    #[serde(default = "implicit_method")]
    pub methods: Vec<Option<String>>,
    /// Deterministic strategies run once, without a repetition index
    #[serde(default)]
    pub deterministic: bool,
    /// Repetitions for stochastic strategies
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
}

fn implicit_method() -> Vec<Option<String>> {
    vec![None]
}

const fn default_repetitions() -> u32 {
    DEFAULT_REPETITIONS
}

impl StrategySpec {
    /// Stochastic strategy with one implicit method.
    #[must_use]
    pub fn stochastic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: implicit_method(),
            deterministic: false,
            repetitions: DEFAULT_REPETITIONS,
        }
    }

    /// Deterministic strategy with one implicit method.
    #[must_use]
    pub fn deterministic(name: impl Into<String>) -> Self {
        Self {
            deterministic: true,
            ..Self::stochastic(name)
        }
    }

    /// Replace the method list with named methods.
    #[must_use]
    pub fn with_methods<S: Into<String>>(mut self, methods: impl IntoIterator<Item = S>) -> Self {
        self.methods = methods.into_iter().map(|m| Some(m.into())).collect();
        self
    }

    /// Set the repetition count.
    #[must_use]
    pub const fn with_repetitions(mut self, repetitions: u32) -> Self {
        self.repetitions = repetitions;
        self
    }

    /// Repetition indices in execution order: `[None]` for deterministic
    /// strategies, `Some(0)..Some(n-1)` otherwise.
    #[must_use]
    pub fn repetition_indices(&self) -> Vec<Option<u32>> {
        if self.deterministic {
            vec![None]
        } else {
            (0..self.repetitions).map(Some).collect()
        }
    }
}

/// The set of known algorithms and strategies, in declared order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    algorithms: Vec<AlgorithmSpec>,
    strategies: Vec<StrategySpec>,
}

impl Registry {
    /// Build and validate a registry.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` on duplicate names, names that are not a
    /// single path component, empty method lists, duplicate methods,
    /// stochastic strategies with zero repetitions, or two strategy/method
    /// pairs sharing an experiment name
    pub fn new(algorithms: Vec<AlgorithmSpec>, strategies: Vec<StrategySpec>) -> Result<Self> {
        let registry = Self {
            algorithms,
            strategies,
        };
        registry.validate()?;
        Ok(registry)
    }

    /// Load a registry from a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file is missing, malformed, or fails
    /// validation
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let registry: Self = read_json(path).map_err(|e| Error::Config(e.to_string()))?;
        registry.validate()?;
        Ok(registry)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for a in &self.algorithms {
            check_name("algorithm", &a.name)?;
            if !seen.insert(a.name.as_str()) {
                return Err(Error::Config(format!("duplicate algorithm '{}'", a.name)));
            }
        }

        let mut seen = HashSet::new();
        // experiment name -> (strategy, method) that produced it
        let mut experiments = HashMap::new();
        for s in &self.strategies {
            check_name("strategy", &s.name)?;
            if !seen.insert(s.name.as_str()) {
                return Err(Error::Config(format!("duplicate strategy '{}'", s.name)));
            }
            if s.methods.is_empty() {
                return Err(Error::Config(format!("strategy '{}' has no methods", s.name)));
            }
            let mut methods = HashSet::new();
            if !s.methods.iter().all(|m| methods.insert(m)) {
                return Err(Error::Config(format!("strategy '{}' repeats a method", s.name)));
            }
            if !s.deterministic && s.repetitions == 0 {
                return Err(Error::Config(format!(
                    "stochastic strategy '{}' needs at least one repetition",
                    s.name
                )));
            }

            for method in s.methods.iter().map(Option::as_deref) {
                if let Some(method) = method {
                    check_name("method", method)?;
                }
                let name = experiment_name(&s.name, method);
                if name == SUMMARY_SUFFIX {
                    return Err(Error::Config(format!(
                        "experiment name '{name}' clashes with the summary database file"
                    )));
                }
                if let Some(first) = experiments.insert(name.clone(), describe(&s.name, method)) {
                    return Err(Error::Config(format!(
                        "{first} and {} both map to experiment name '{name}'",
                        describe(&s.name, method)
                    )));
                }
            }
        }
        Ok(())
    }

    /// Look up an algorithm.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownAlgorithm` listing the registered names
    pub fn algorithm(&self, name: &str) -> Result<&AlgorithmSpec> {
        self.algorithms
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| Error::UnknownAlgorithm {
                name: name.to_string(),
                known: join_names(self.algorithms.iter().map(|a| a.name.as_str())),
            })
    }

    /// Look up a strategy.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownStrategy` listing the registered names
    pub fn strategy(&self, name: &str) -> Result<&StrategySpec> {
        self.strategies
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::UnknownStrategy {
                name: name.to_string(),
                known: join_names(self.strategies.iter().map(|s| s.name.as_str())),
            })
    }

    /// All algorithms.
    #[must_use]
    pub fn algorithms(&self) -> &[AlgorithmSpec] {
        &self.algorithms
    }

    /// All strategies.
    #[must_use]
    pub fn strategies(&self) -> &[StrategySpec] {
        &self.strategies
    }
}

/// Names become path components; keep them to a single normal one.
fn check_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::Config(format!("invalid {kind} name '{name}'")));
    }
    Ok(())
}

fn describe(strategy: &str, method: Option<&str>) -> String {
    method.map_or_else(
        || format!("strategy '{strategy}'"),
        |m| format!("strategy '{strategy}' method '{m}'"),
    )
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

const SCIPY_METHODS: [&str; 8] = [
    "Nelder-Mead",
    "Powell",
    "CG",
    "BFGS",
    "L-BFGS-B",
    "TNC",
    "COBYLA",
    "SLSQP",
];

const DIFF_EVO_METHODS: [&str; 10] = [
    "best1bin",
    "best1exp",
    "rand1exp",
    "randtobest1exp",
    "best2exp",
    "rand2exp",
    "randtobest1bin",
    "best2bin",
    "rand2bin",
    "rand1bin",
];

impl Default for Registry {
    /// Stock kernels and strategies. No algorithm has an engine command;
    /// supply one through a config file to run trials from the CLI.
    fn default() -> Self {
        let conv_ops = (4096.0 * 4096.0 * 17.0 * 17.0 * 2.0) / 1e9;
        let gemm_ops = 2.0f64.mul_add(2048f64.powi(3), 2.0 * 2048.0 * 2048.0) / 1e9;
        let maxwell = "GTX Titan X (Maxwell)";

        Self {
            algorithms: vec![
                AlgorithmSpec::new("convolution", conv_ops, "GFLOP/s")
                    .described("2D Convolution", maxwell),
                AlgorithmSpec::new("pnpoly", 2e1, "MPoints/s")
                    .described("Point-in-Polygon", maxwell)
                    .with_context(),
                AlgorithmSpec::new("gemm", gemm_ops, "GFLOP/s").described("GEMM", maxwell),
                AlgorithmSpec::new("convolution_streams", conv_ops, "GFLOP/s")
                    .described("2D Convolution with streams", maxwell)
                    .with_context(),
                AlgorithmSpec::new("gemm_amd", gemm_ops, "GFLOP/s").described("GEMM", "AMD Vega"),
            ],
            strategies: vec![
                StrategySpec::stochastic("minimize").with_methods(SCIPY_METHODS),
                StrategySpec::stochastic("basinhopping").with_methods(SCIPY_METHODS),
                StrategySpec::stochastic("diff_evo").with_methods(DIFF_EVO_METHODS),
                StrategySpec::deterministic("brute_force"),
                StrategySpec::stochastic("genetic_algorithm"),
                StrategySpec::stochastic("pso"),
                StrategySpec::stochastic("simulated_annealing"),
                StrategySpec::stochastic("firefly_algorithm"),
            ],
        }
    }
}
