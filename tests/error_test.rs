//! Tests for error types

use std::path::PathBuf;

use tuning_ledger::{EngineError, Error};

#[test]
fn test_unknown_algorithm_error() {
    let error = Error::UnknownAlgorithm {
        name: "fft".to_string(),
        known: "gemm, pnpoly".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("unknown algorithm 'fft'"));
    assert!(error_str.contains("gemm, pnpoly"));
    assert!(error.is_configuration_error());
}

#[test]
fn test_unknown_strategy_error() {
    let error = Error::UnknownStrategy {
        name: "tabu".to_string(),
        known: "pso".to_string(),
    };
    assert!(format!("{error}").contains("unknown strategy 'tabu'"));
    assert!(error.is_configuration_error());
}

#[test]
fn test_config_error() {
    let error = Error::Config("duplicate strategy 'pso'".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("invalid configuration"));
    assert!(error.is_configuration_error());
}

#[test]
fn test_engine_error_names_pending_file() {
    let error = Error::Engine {
        path: PathBuf::from("gemm/gemm_pso_3.json"),
        source: EngineError::Failed("CUDA error: out of memory".to_string()),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("gemm/gemm_pso_3.json"));
    assert!(error_str.contains("out of memory"));
    assert!(error_str.contains("re-run the same command"));
    assert!(!error.is_configuration_error());
}

#[test]
fn test_engine_error_source_chain() {
    use std::error::Error as _;

    let error = Error::Engine {
        path: PathBuf::from("gemm/gemm_pso_3.json"),
        source: EngineError::Failed("diverged".to_string()),
    };
    let source = error.source().unwrap();
    assert_eq!(source.to_string(), "diverged");
}

#[test]
fn test_no_valid_records_error() {
    let error = Error::NoValidRecords {
        path: PathBuf::from("gemm/gemm_brute_force.json"),
    };
    assert!(format!("{error}").contains("no record with a valid time"));
}

#[test]
fn test_device_busy_error() {
    let error = Error::DeviceBusy {
        path: PathBuf::from(".device.lock"),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("device context busy"));
    assert!(error_str.contains(".device.lock"));
}

#[test]
fn test_engine_not_configured() {
    let error = EngineError::NotConfigured("pnpoly".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("pnpoly"));
    assert!(error_str.contains("\"command\""));
}

#[test]
fn test_engine_output_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: EngineError = json_error.into();
    assert!(format!("{error}").contains("not a valid tuning result"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
}

#[test]
fn test_error_debug() {
    let error = Error::Config("x".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("Config"));
}

#[test]
fn test_result_type_alias() {
    // Test that Result<T> can be used
    #[allow(clippy::unnecessary_wraps)]
    fn returns_result() -> tuning_ledger::Result<i32> {
        Ok(42)
    }

    let result = returns_result();
    assert!(result.is_ok());
    assert_eq!(result.unwrap(), 42);
}

#[test]
fn test_result_type_alias_error() {
    fn returns_error() -> tuning_ledger::Result<i32> {
        Err(Error::Config("test error".to_string()))
    }

    let result = returns_error();
    assert!(result.is_err());
}
