use crate::config::EngineConfig;
use crate::pipeline::BatchConfig;
use crate::types::{Currency, Result, SettlementStrategy};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay a remittance journal and report settlement state
#[derive(Parser, Debug)]
#[command(name = "settlement-engine")]
#[command(about = "Replay a remittance journal and report settlement state", long_about = None)]
pub struct CliArgs {
    /// Journal CSV file path
    #[arg(value_name = "INPUT", help = "Path to the journal CSV file")]
    pub input_file: PathBuf,

    /// Processing mode
    #[arg(
        long = "mode",
        value_name = "MODE",
        default_value = "async",
        help = "Processing mode: 'sync' for file order or 'async' for tenant-parallel batches"
    )]
    pub mode: ProcessingMode,

    /// Number of journal rows per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of journal rows per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Worker threads (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Engine configuration file
    #[arg(long = "config", value_name = "FILE", help = "TOML engine configuration")]
    pub config: Option<PathBuf>,

    /// Default settlement strategy, overriding the configuration file
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        help = "Default settlement strategy: fifo, lifo or best_rate"
    )]
    pub strategy: Option<SettlementStrategy>,

    /// Home currency, overriding the configuration file
    #[arg(long = "home-currency", value_name = "CODE")]
    pub home_currency: Option<String>,

    /// Also write cash balances to this file
    #[arg(long = "balances", value_name = "FILE")]
    pub balances: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long = "log-level", value_name = "FILTER", default_value = "warn")]
    pub log_level: String,
}

/// Available journal processing modes
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProcessingMode {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments, defaults filling the gaps
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Build the engine configuration
    ///
    /// Starts from the `--config` file when given (defaults otherwise) and
    /// applies `--strategy` and `--home-currency` on top.
    pub fn to_engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };

        if let Some(strategy) = self.strategy {
            config = config.with_default_strategy(strategy);
        }
        if let Some(code) = &self.home_currency {
            config = config.with_home_currency(Currency::new(code)?);
        }

        Ok(config)
    }
}
