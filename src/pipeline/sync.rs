//! Synchronous journal pipeline
//!
//! Applies a journal strictly in file order on the calling thread. Delegates
//! row parsing to `SyncReader` and command dispatch to `SettlementEngine::execute`.
//!
//! Memory use is bounded by the engine state, not by the journal size: rows are
//! streamed one at a time.

use crate::config::EngineConfig;
use crate::core::SettlementEngine;
use crate::io::sync_reader::SyncReader;
use crate::pipeline::{JournalRun, ProcessingPipeline};
use crate::types::Result;
use std::path::Path;
use std::sync::Arc;

/// Single-threaded, file-order pipeline
///
/// # Examples
///
/// ```no_run
/// use remittance_settlement_engine::config::EngineConfig;
/// use remittance_settlement_engine::pipeline::{ProcessingPipeline, SyncPipeline};
/// use std::path::Path;
///
/// let pipeline = SyncPipeline::new(EngineConfig::default());
/// let mut output = std::io::stdout();
/// pipeline.process(Path::new("journal.csv"), &mut output).expect("journal failed");
/// ```
#[derive(Debug, Clone)]
pub struct SyncPipeline {
    engine_config: EngineConfig,
}

impl SyncPipeline {
    pub fn new(engine_config: EngineConfig) -> Self {
        Self { engine_config }
    }
}

impl ProcessingPipeline for SyncPipeline {
    fn run(&self, input_path: &Path) -> Result<JournalRun> {
        let engine = Arc::new(SettlementEngine::new(self.engine_config.clone()));
        let reader = SyncReader::new(input_path)?;

        let mut run = JournalRun {
            engine: Arc::clone(&engine),
            applied: 0,
            failed: 0,
            rejected: 0,
        };

        for entry in reader {
            match entry {
                Ok(entry) => {
                    let op = entry.command.op();
                    let tenant = entry.command.tenant();
                    match engine.execute(entry.command) {
                        Ok(_) => run.applied += 1,
                        Err(e) => {
                            run.failed += 1;
                            tracing::warn!(line = entry.line, op, tenant, "command failed: {}", e);
                        }
                    }
                }
                Err(e) => {
                    run.rejected += 1;
                    tracing::warn!("{}", e);
                }
            }
        }

        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IncomingStatus, OutgoingStatus, SettlementError};
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str =
        "op,tenant,branch,ref,other_ref,sender,recipient,amount,rate,received,fee,currency,strategy,actor,note,at\n";

    fn create_temp_csv(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(HEADER.as_bytes())
            .expect("Failed to write to temp file");
        file.write_all(rows.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_sync_pipeline_applies_journal_in_order() {
        let file = create_temp_csv(
            "outgoing,1,1,O1,,Ali,Sara,100,10,1000,,USD,,,,\n\
             incoming,1,2,I1,,Reza,Nima,60,11,,,USD,,,,\n\
             settle,1,,O1,I1,,,60,,,,,,ops,,\n\
             payout,1,,I1\n\
             cancel,1,,O1,,,,,,,,,,,customer withdrew,\n",
        );

        let run = SyncPipeline::new(EngineConfig::default())
            .run(file.path())
            .unwrap();

        assert_eq!(run.applied, 4);
        assert_eq!(run.failed, 1);
        assert_eq!(run.rejected, 0);

        let outgoing = run.engine.outgoing_for_tenant(1);
        assert_eq!(outgoing[0].status, OutgoingStatus::Partial);
        assert_eq!(outgoing[0].remaining_amount, Decimal::from(40));

        let incoming = run.engine.incoming_for_tenant(1);
        assert_eq!(incoming[0].status, IncomingStatus::Paid);
    }

    #[test]
    fn test_sync_pipeline_counts_rejected_rows() {
        let file = create_temp_csv(
            "outgoing,1,1,O1,,Ali,Sara,abc,10,,,USD,,,,\n\
             outgoing,1,1,O2,,Ali,Sara,5,10,,,USD,,,,\n",
        );

        let run = SyncPipeline::new(EngineConfig::default())
            .run(file.path())
            .unwrap();

        assert_eq!(run.rejected, 1);
        assert_eq!(run.applied, 1);
    }

    #[test]
    fn test_sync_pipeline_handles_missing_file() {
        let result = SyncPipeline::new(EngineConfig::default()).run(Path::new("nonexistent.csv"));
        assert!(matches!(result, Err(SettlementError::IoError { .. })));
    }
}
