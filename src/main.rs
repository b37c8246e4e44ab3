//! tuning-ledger executable.

use clap::Parser;
use tuning_ledger::cli::{exit_code_for, run_cli, Cli};

fn main() {
    let cli = Cli::parse();
    let code = match run_cli(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}
