//! CLI wiring for tuning-ledger.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::device::{ContextGuard, DeviceLock};
use crate::engine::CommandEngine;
use crate::orchestrator::{Orchestrator, SummaryState};
use crate::registry::Registry;

/// Exit code: everything ran.
pub const EXIT_OK: i32 = 0;
/// Exit code: at least one trial or merge failed; re-run to resume.
pub const EXIT_TRIAL_FAILURES: i32 = 1;
/// Exit code: unknown name or invalid configuration.
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Lock file guarding the device context, relative to the results root.
pub const DEVICE_LOCK_FILE: &str = ".device.lock";

/// Command line of the `tuning-ledger` binary.
#[derive(Parser, Debug)]
#[command(
    name = "tuning-ledger",
    about = "Resumable autotuning experiments with an append-only results ledger"
)]
pub struct Cli {
    /// Results root; each algorithm gets a sub-directory
    #[arg(long, env = "TUNING_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// JSON registry of algorithms and strategies (built-in tables if omitted)
    #[arg(long, env = "TUNING_CONFIG")]
    pub config: Option<PathBuf>,

    /// Action to perform
    #[command(subcommand)]
    pub command: Command,
}

/// `tuning-ledger` subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every pending repetition of a strategy and update the summary.
    Run {
        /// Algorithm to tune
        algorithm: String,
        /// Search strategy to run
        strategy: String,
    },
    /// List trial files that have not been produced yet.
    Pending {
        /// Algorithm to inspect
        algorithm: String,
        /// Search strategy to inspect
        strategy: String,
    },
    /// Print statistics from an algorithm's summary database.
    Report {
        /// Algorithm whose summary database is read
        algorithm: String,
    },
    /// List registered algorithms and strategies.
    List,
}

/// Execute a parsed command line and return the process exit code.
///
/// # Errors
///
/// Returns error for failures outside trial execution (unreadable config,
/// device context unavailable, unknown names)
pub fn run_cli(cli: Cli) -> Result<i32> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let Cli {
        root,
        config,
        command,
    } = cli;
    let registry = match &config {
        Some(path) => Registry::from_json_file(path)
            .with_context(|| format!("loading registry from {}", path.display()))?,
        None => Registry::default(),
    };

    let mut orchestrator = Orchestrator::new(registry, root, CommandEngine);

    match command {
        Command::Run {
            algorithm,
            strategy,
        } => {
            // Validate both names before acquiring anything
            orchestrator.attempts(&algorithm, &strategy)?;
            let needs_context = orchestrator.registry().algorithm(&algorithm)?.needs_context;

            let guard = if needs_context {
                let lock = DeviceLock::acquire(orchestrator.root().join(DEVICE_LOCK_FILE))?;
                Some(ContextGuard::new(lock))
            } else {
                None
            };

            let report = orchestrator.run(&algorithm, &strategy)?;
            if let Some(guard) = guard {
                guard.release()?;
            }

            print!("{}", report.render());
            Ok(if report.has_failures() {
                EXIT_TRIAL_FAILURES
            } else {
                EXIT_OK
            })
        }
        Command::Pending {
            algorithm,
            strategy,
        } => {
            let pending = orchestrator.pending(&algorithm, &strategy)?;
            for attempt in &pending {
                println!("{}", orchestrator.root().join(attempt.relative_path()).display());
            }
            eprintln!("{} pending", pending.len());
            Ok(EXIT_OK)
        }
        Command::Report { algorithm } => match orchestrator.summary(&algorithm)? {
            SummaryState::Available(report) => {
                print!("{}", report.render_table());
                Ok(EXIT_OK)
            }
            SummaryState::Absent => {
                println!("no summary database for {algorithm} yet");
                Ok(EXIT_OK)
            }
            SummaryState::Corrupt { reason } => {
                anyhow::bail!("summary database for {algorithm} unreadable: {reason}")
            }
        },
        Command::List => {
            let registry = orchestrator.registry();
            println!("algorithms:");
            for a in registry.algorithms() {
                let context = if a.needs_context { " [device context]" } else { "" };
                println!(
                    "  {:<22} {}{context}",
                    a.name,
                    a.fancy_name.as_deref().unwrap_or("")
                );
            }
            println!("strategies:");
            for s in registry.strategies() {
                let reps = if s.deterministic {
                    "1 run".to_string()
                } else {
                    format!("{} repetitions", s.repetitions)
                };
                let methods: Vec<&str> = s.methods.iter().filter_map(Option::as_deref).collect();
                println!("  {:<22} {reps:<16} {}", s.name, methods.join(", "));
            }
            Ok(EXIT_OK)
        }
    }
}

/// Map an error escaping [`run_cli`] to an exit code.
#[must_use]
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<crate::Error>() {
        Some(e) if e.is_configuration_error() => EXIT_CONFIG_ERROR,
        _ => EXIT_TRIAL_FAILURES,
    }
}
