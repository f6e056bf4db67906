//! Remittance settlement engine CLI
//!
//! Replays a remittance journal (CSV) through the settlement engine and prints
//! the final state of every remittance to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- journal.csv > remittances.csv
//! cargo run -- --mode sync journal.csv > remittances.csv
//! cargo run -- --mode async --batch-size 2000 --max-concurrent 8 journal.csv
//! cargo run -- --config engine.toml --strategy best_rate --balances balances.csv journal.csv
//! ```
//!
//! Diagnostics go to stderr through `tracing`; `RUST_LOG` takes precedence over
//! `--log-level`.
//!
//! # Exit Codes
//!
//! - 0: Success (individual journal rows may still have failed; see the log)
//! - 1: Fatal error (bad configuration, unreadable journal, unwritable output)

use remittance_settlement_engine::io::write_balances_csv;
use remittance_settlement_engine::types::{Result, SettlementError};
use remittance_settlement_engine::{cli, pipeline};
use std::fs::File;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = cli::parse_args();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &cli::CliArgs) -> Result<()> {
    let engine_config = args.to_engine_config()?;
    let batch = match args.mode {
        cli::ProcessingMode::Async => Some(args.to_batch_config()),
        cli::ProcessingMode::Sync => None,
    };
    let pipeline = pipeline::create_pipeline(args.mode, engine_config, batch);

    let mut output = std::io::stdout();
    let journal = pipeline.process(&args.input_file, &mut output)?;

    if let Some(path) = &args.balances {
        let mut file = File::create(path).map_err(|e| SettlementError::IoError {
            message: format!("Failed to create '{}': {}", path.display(), e),
        })?;
        write_balances_csv(&journal.engine.all_balances(), &mut file)?;
    }

    Ok(())
}
