//! Asynchronous batch pipeline
//!
//! Reads the journal in batches and runs each batch through the
//! `BatchProcessor`, which executes the batch's tenants in parallel.
//!
//! # Architecture
//!
//! ```text
//! AsyncPipeline
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch journal reading)
//!     └── BatchProcessor (tenant partitioning + blocking workers)
//!         └── Arc<SettlementEngine>
//! ```
//!
//! # Ordering
//!
//! Batches are processed one after another, and within a batch each tenant's
//! commands run sequentially. A tenant therefore sees its commands in file
//! order even when they span batches; only commands of different tenants
//! interleave.

use crate::config::EngineConfig;
use crate::core::{BatchProcessor, SettlementEngine};
use crate::io::async_reader::AsyncReader;
use crate::pipeline::{JournalRun, ProcessingPipeline};
use crate::types::{Result, SettlementError};
use std::path::Path;
use std::sync::Arc;

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    /// Journal rows per batch
    pub batch_size: usize,
    /// Worker threads of the runtime
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a BatchConfig, replacing zero values with defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                "Invalid batch_size ({}), using default ({})",
                batch_size,
                default.batch_size
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            tracing::warn!(
                "Invalid max_concurrent_batches ({}), using default ({})",
                max_concurrent_batches,
                default.max_concurrent_batches
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Batched, tenant-parallel pipeline
#[derive(Debug, Clone)]
pub struct AsyncPipeline {
    engine_config: EngineConfig,
    config: BatchConfig,
}

impl AsyncPipeline {
    pub fn new(engine_config: EngineConfig, config: BatchConfig) -> Self {
        Self {
            engine_config,
            config,
        }
    }
}

impl ProcessingPipeline for AsyncPipeline {
    fn run(&self, input_path: &Path) -> Result<JournalRun> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| SettlementError::internal(format!("Failed to create tokio runtime: {}", e)))?;

        runtime.block_on(async {
            let engine = Arc::new(SettlementEngine::new(self.engine_config.clone()));
            let processor = BatchProcessor::new(Arc::clone(&engine));

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| SettlementError::IoError {
                    message: format!("Failed to open file '{}': {}", input_path.display(), e),
                })?;

            // csv-async reads through the futures traits
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut applied = 0;
            let mut failed = 0;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for result in processor.process_batch(batch).await {
                    if result.result.is_ok() {
                        applied += 1;
                    } else {
                        failed += 1;
                    }
                }
            }

            Ok(JournalRun {
                engine,
                applied,
                failed,
                rejected: reader.rejected(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutgoingStatus;
    use rstest::rstest;
    use std::fmt::Write as _;
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

    #[rstest]
    #[case::defaults(1000, 4, 1000, 4)]
    #[case::zero_batch_size(0, 4, 1000, 4)]
    #[case::zero_max_concurrent(500, 0, 500, num_cpus::get())]
    fn test_batch_config_new(
        #[case] batch_size: usize,
        #[case] max_concurrent: usize,
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = BatchConfig::new(batch_size, max_concurrent);
        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_max_concurrent);
    }

    #[test]
    fn test_tenant_order_is_kept_across_batches() {
        // Batch size 2 splits each tenant's create/fund/settle sequence over
        // several batches
        let mut rows = String::new();
        for tenant in 1..=4 {
            writeln!(rows, "outgoing,{},1,O1,,Ali,Sara,100,10,,,USD,,,,", tenant).unwrap();
        }
        for tenant in 1..=4 {
            writeln!(rows, "incoming,{},1,I1,,Reza,Nima,100,11,,,USD,,,,", tenant).unwrap();
        }
        for tenant in 1..=4 {
            writeln!(rows, "auto_settle,{},,O1", tenant).unwrap();
        }
        let file = create_temp_csv(&rows);

        let pipeline = AsyncPipeline::new(EngineConfig::default(), BatchConfig::new(2, 2));
        let run = pipeline.run(file.path()).unwrap();

        assert_eq!(run.applied, 12);
        assert_eq!(run.failed, 0);
        for tenant in 1..=4 {
            let outgoing = run.engine.outgoing_for_tenant(tenant);
            assert_eq!(outgoing[0].status, OutgoingStatus::Completed);
        }
    }

    #[test]
    fn test_async_pipeline_counts_failures_and_rejects() {
        let file = create_temp_csv(
            "payout,1,,I1\n\
             bogus,1\n\
             outgoing,1,1,O1,,Ali,Sara,5,10,,,USD,,,,\n",
        );

        let run = AsyncPipeline::new(EngineConfig::default(), BatchConfig::default())
            .run(file.path())
            .unwrap();

        assert_eq!(run.applied, 1);
        assert_eq!(run.failed, 1);
        assert_eq!(run.rejected, 1);
    }

    #[test]
    fn test_async_pipeline_handles_missing_file() {
        let pipeline = AsyncPipeline::new(EngineConfig::default(), BatchConfig::default());
        let result = pipeline.run(Path::new("nonexistent.csv"));
        assert!(matches!(result, Err(SettlementError::IoError { .. })));
    }
}
