//! Resumable Campaign Example
//!
//! Demonstrates an interrupted tuning campaign being resumed: completed
//! trials are skipped, and the summary database grows by appending.
//!
//! Run with: cargo run --example resumable_campaign

use tuning_ledger::engine::{TuneOutput, TuneRequest};
use tuning_ledger::experiment::TrialRecord;
use tuning_ledger::orchestrator::{Orchestrator, SummaryState};
use tuning_ledger::registry::{AlgorithmSpec, Registry, StrategySpec};
use tuning_ledger::EngineError;

/// Stand-in engine: a fixed search space with a pseudo-random walk per call.
fn fake_engine(budget: u32) -> impl FnMut(&TuneRequest<'_>) -> Result<TuneOutput, EngineError> {
    let mut calls = 0u32;
    move |request: &TuneRequest<'_>| {
        if calls >= budget {
            return Err(EngineError::Failed("simulated interruption".to_string()));
        }
        calls += 1;
        let offset = f64::from(calls % 5) * 0.1;
        let results = [16, 32, 64, 128]
            .iter()
            .enumerate()
            .map(|(i, bx)| {
                #[allow(clippy::cast_precision_loss)]
                let time = 3.0 - (i as f64) * 0.5 + offset;
                TrialRecord::builder()
                    .param("block_size_x", *bx)
                    .param("strategy", request.strategy)
                    .time(time)
                    .build()
            })
            .collect();
        Ok(TuneOutput {
            results,
            env: serde_json::json!({"device_name": "simulated"}),
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== tuning-ledger Resumable Campaign ===\n");

    let root = std::env::temp_dir().join("tuning-ledger-demo");
    let _ = std::fs::remove_dir_all(&root);

    let registry = Registry::new(
        vec![AlgorithmSpec::new("gemm", 17.18, "GFLOP/s").described("GEMM", "simulated")],
        vec![StrategySpec::stochastic("minimize")
            .with_methods(["Nelder-Mead", "Powell"])
            .with_repetitions(4)],
    )?;

    // -------------------------------------------------------------------------
    // 1. First run: interrupted after 5 trials
    // -------------------------------------------------------------------------
    println!("1. Running with an engine that dies after 5 trials...");
    let mut orchestrator = Orchestrator::new(registry.clone(), &root, fake_engine(5));
    let report = orchestrator.run("gemm", "minimize")?;
    println!(
        "   completed={} skipped={} failed={}",
        report.completed(),
        report.skipped(),
        report.failures().count()
    );
    println!(
        "   still pending: {}",
        orchestrator.pending("gemm", "minimize")?.len()
    );

    // -------------------------------------------------------------------------
    // 2. Resume: only the missing trials run
    // -------------------------------------------------------------------------
    println!("\n2. Resuming...");
    let mut orchestrator = Orchestrator::new(registry, &root, fake_engine(u32::MAX));
    let report = orchestrator.run("gemm", "minimize")?;
    println!(
        "   completed={} skipped={} failed={}",
        report.completed(),
        report.skipped(),
        report.failures().count()
    );

    // -------------------------------------------------------------------------
    // 3. Statistics from the summary database alone
    // -------------------------------------------------------------------------
    println!("\n3. Summary statistics:");
    if let SummaryState::Available(summary) = orchestrator.summary("gemm")? {
        print!("{}", summary.render_table());
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
