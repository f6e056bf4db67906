//! Journal processing pipelines
//!
//! A pipeline reads a journal file, runs every command through a fresh
//! `SettlementEngine`, and writes the resulting remittance states. Two
//! implementations are selectable at runtime: a single-threaded one that applies
//! the journal strictly in file order, and a batched one that runs the tenants
//! of each batch in parallel.

use crate::cli::ProcessingMode;
use crate::config::EngineConfig;
use crate::core::SettlementEngine;
use crate::io::csv_format::write_remittances_csv;
use crate::types::Result;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncPipeline, BatchConfig};
pub use sync::SyncPipeline;

/// Outcome of running a journal
#[derive(Debug, Clone)]
pub struct JournalRun {
    /// Engine holding the final state
    pub engine: Arc<SettlementEngine>,
    /// Commands that succeeded
    pub applied: usize,
    /// Commands the engine rejected
    pub failed: usize,
    /// Rows that could not be parsed into a command
    pub rejected: usize,
}

/// A complete journal processing pipeline
///
/// Command-level failures and unparseable rows are logged and counted; only
/// fatal problems (unreadable input, unwritable output, runtime start-up)
/// surface as errors.
pub trait ProcessingPipeline: Send + Sync {
    /// Run the journal at `input_path` against a new engine
    fn run(&self, input_path: &Path) -> Result<JournalRun>;

    /// Run the journal and write the final remittance states to `output`
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<JournalRun> {
        let run = self.run(input_path)?;
        write_report(&run.engine, output)?;

        tracing::info!(
            applied = run.applied,
            failed = run.failed,
            rejected = run.rejected,
            "journal processed"
        );
        Ok(run)
    }
}

/// Write every tenant's remittances as CSV
pub fn write_report(engine: &SettlementEngine, output: &mut dyn Write) -> Result<()> {
    let mut outgoing = Vec::new();
    let mut incoming = Vec::new();
    for tenant in engine.tenants() {
        outgoing.extend(engine.outgoing_for_tenant(tenant));
        incoming.extend(engine.incoming_for_tenant(tenant));
    }
    write_remittances_csv(&outgoing, &incoming, output)
}

/// Create the pipeline for a processing mode
///
/// `batch` is only used by the async pipeline; the default applies when absent.
pub fn create_pipeline(
    mode: ProcessingMode,
    engine_config: EngineConfig,
    batch: Option<BatchConfig>,
) -> Box<dyn ProcessingPipeline> {
    match mode {
        ProcessingMode::Sync => Box::new(SyncPipeline::new(engine_config)),
        ProcessingMode::Async => Box::new(AsyncPipeline::new(
            engine_config,
            batch.unwrap_or_default(),
        )),
    }
}
