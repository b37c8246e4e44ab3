//! # tuning-ledger: Resumable Autotuning Experiments
//!
//! tuning-ledger drives long-running parameter-search experiments against an
//! external autotuning engine and accumulates their results across
//! interrupted, resumed, and repeated runs.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: A trial is complete only when its output file exists; a
//!   failed trial leaves nothing behind and is retried on the next run
//! - **Poka-Yoke safety**: All-or-nothing writes (temp file + rename), and
//!   summary entries whose parallel sequences cannot drift apart
//! - **Muda elimination**: Completed trials are never re-executed
//! - **Genchi Genbutsu**: Statistics are derived from persisted data only
//!
//! ## Layout
//!
//! ```text
//! <root>/<algorithm>/<algorithm>_<strategy>[_<method>][_<rep>].json   trial records
//! <root>/<algorithm>/<algorithm>_summary.json                         summary database
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tuning_ledger::engine::CommandEngine;
//! use tuning_ledger::orchestrator::Orchestrator;
//! use tuning_ledger::registry::Registry;
//!
//! let registry = Registry::from_json_file("experiments.json".as_ref())?;
//! let mut orchestrator = Orchestrator::new(registry, "results", CommandEngine);
//!
//! let report = orchestrator.run("gemm", "minimize")?;
//! print!("{}", report.render());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod cli;
pub mod device;
pub mod engine;
pub mod error;
pub mod experiment;
pub mod orchestrator;
pub mod registry;
pub mod runner;

pub use error::{EngineError, Error, Result};
