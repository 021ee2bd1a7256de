//! MongoDB backup tool with schema-only mirror.
//!
//! Dumps the selected databases and collections with `mongodump`, then
//! writes a parallel tree holding only the collection metadata and empty
//! data files.
//!
//! # Security Guarantees
//! - Connection strings are redacted before they reach logs or errors
//! - Passwords are wiped from memory when the run ends

use std::process::ExitCode;

use clap::Parser;
use dumpmirror::{Cli, error_chain, execute, exit_code_for, exit_code_for_report, summary};
use dumpmirror_core::logging::init_logging;
use tracing::{error, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("Error: {}", error_chain(&e));
        return ExitCode::from(exit_code_for(&e));
    }

    match execute(&cli).await {
        Ok(report) => {
            if report.is_degraded() {
                warn!("Run completed, but the schema mirror is incomplete");
            }
            if !cli.global.quiet {
                println!("{}", summary(&report));
            }
            ExitCode::from(exit_code_for_report(&report))
        }
        Err(e) => {
            error!("{}", error_chain(&e));
            ExitCode::from(exit_code_for(&e))
        }
    }
}
