//! Tuning engine seam
//!
//! The engine is a black box: given a strategy and method it searches the
//! algorithm's configuration space and returns every configuration it
//! measured plus an environment descriptor. It may block for hours, and it
//! may fail.

use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::experiment::TrialRecord;
use crate::registry::AlgorithmSpec;

/// One engine invocation.
#[derive(Debug, Clone, Copy)]
pub struct TuneRequest<'a> {
    /// Algorithm being tuned (carries opaque `options`)
    pub algorithm: &'a AlgorithmSpec,
    /// Strategy name
    pub strategy: &'a str,
    /// Method name, if the strategy has named methods
    pub method: Option<&'a str>,
}

/// What an engine returns: measured configurations and an environment
/// descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TuneOutput {
    /// Every measured configuration, in engine order
    pub results: Vec<TrialRecord>,
    /// Free-form environment descriptor
    #[serde(default)]
    pub env: serde_json::Value,
}

/// An autotuning engine.
pub trait TuningEngine {
    /// Run one search.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the search could not complete
    fn tune(&mut self, request: &TuneRequest<'_>) -> Result<TuneOutput, EngineError>;
}

impl<F> TuningEngine for F
where
    F: FnMut(&TuneRequest<'_>) -> Result<TuneOutput, EngineError>,
{
    fn tune(&mut self, request: &TuneRequest<'_>) -> Result<TuneOutput, EngineError> {
        self(request)
    }
}

/// Engine backed by an external program.
///
/// The program is taken from [`AlgorithmSpec::command`]. The request goes
/// in through environment variables:
///
/// | variable           | value                               |
/// |--------------------|-------------------------------------|
/// | `TUNING_ALGORITHM` | algorithm name                      |
/// | `TUNING_STRATEGY`  | strategy name                       |
/// | `TUNING_METHOD`    | method name, unset if none          |
/// | `TUNING_OPTIONS`   | JSON `options`, unset if none       |
///
/// The program writes a JSON [`TuneOutput`] to stdout; stderr passes
/// through so progress stays visible.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandEngine;

impl TuningEngine for CommandEngine {
    fn tune(&mut self, request: &TuneRequest<'_>) -> Result<TuneOutput, EngineError> {
        let argv = request
            .algorithm
            .command
            .as_deref()
            .filter(|argv| !argv.is_empty())
            .ok_or_else(|| EngineError::NotConfigured(request.algorithm.name.clone()))?;
        let program = &argv[0];

        let mut cmd = Command::new(program);
        cmd.args(&argv[1..])
            .env("TUNING_ALGORITHM", &request.algorithm.name)
            .env("TUNING_STRATEGY", request.strategy)
            .env_remove("TUNING_METHOD")
            .env_remove("TUNING_OPTIONS")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(method) = request.method {
            cmd.env("TUNING_METHOD", method);
        }
        if let Some(options) = &request.algorithm.options {
            cmd.env("TUNING_OPTIONS", options.to_string());
        }

        tracing::debug!(command = ?argv, strategy = request.strategy, method = ?request.method, "launching engine");
        let output = cmd.output().map_err(|source| EngineError::Launch {
            command: program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(EngineError::Exit {
                command: program.clone(),
                status: output.status.to_string(),
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_engine() {
        let spec = AlgorithmSpec::new("gemm", 1.0, "GFLOP/s");
        let mut calls = 0;
        let mut engine = |req: &TuneRequest<'_>| -> Result<TuneOutput, EngineError> {
            calls += 1;
            assert_eq!(req.strategy, "pso");
            Ok(TuneOutput {
                results: vec![TrialRecord::builder().time(1.0).build()],
                env: serde_json::json!({}),
            })
        };

        let out = engine
            .tune(&TuneRequest {
                algorithm: &spec,
                strategy: "pso",
                method: None,
            })
            .unwrap();
        assert_eq!(out.results.len(), 1);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_command_engine_requires_command() {
        let spec = AlgorithmSpec::new("gemm", 1.0, "GFLOP/s");
        let err = CommandEngine
            .tune(&TuneRequest {
                algorithm: &spec,
                strategy: "pso",
                method: None,
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::NotConfigured(name) if name == "gemm"));
    }

    #[test]
    fn test_output_env_defaults_to_null() {
        let out: TuneOutput = serde_json::from_str(r#"{"results":[{"x":1,"time":2.0}]}"#).unwrap();
        assert_eq!(out.results.len(), 1);
        assert!(out.env.is_null());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_engine_round_trip() {
        let spec = AlgorithmSpec::new("gemm", 1.0, "GFLOP/s").with_command([
            "sh",
            "-c",
            r#"printf '{"results":[{"s":"%s","m":"%s","time":1.5}],"env":{}}' "$TUNING_STRATEGY" "$TUNING_METHOD""#,
        ]);
        let out = CommandEngine
            .tune(&TuneRequest {
                algorithm: &spec,
                strategy: "minimize",
                method: Some("Powell"),
            })
            .unwrap();

        let record = &out.results[0];
        assert_eq!(record.get("s"), Some(&serde_json::Value::from("minimize")));
        assert_eq!(record.get("m"), Some(&serde_json::Value::from("Powell")));
        assert_eq!(record.time(), Some(1.5));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_engine_failure_exit() {
        let spec = AlgorithmSpec::new("gemm", 1.0, "GFLOP/s").with_command(["sh", "-c", "exit 3"]);
        let err = CommandEngine
            .tune(&TuneRequest {
                algorithm: &spec,
                strategy: "pso",
                method: None,
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::Exit { .. }));
    }
}
