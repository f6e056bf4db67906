//! Batch processing with tenant-based partitioning
//!
//! This module provides the `BatchProcessor`, which runs a batch of journal
//! commands with tenants processed in parallel and each tenant's commands kept
//! in journal order.
//!
//! # Design
//!
//! Tenants never share remittances, references or balances, so commands for
//! different tenants commute. A batch is split into one sub-batch per tenant;
//! every sub-batch runs sequentially on a blocking worker (the engine's row
//! locks and retry backoff block the calling thread), and all sub-batches of a
//! batch run concurrently. Batches themselves are processed one after another
//! by the caller, so a tenant's commands that span batches stay ordered too.
//!
//! ```text
//! BatchProcessor
//!     └── Arc<SettlementEngine>  (shared, thread-safe)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::command::{Command, CommandOutcome};
use crate::core::engine::SettlementEngine;
use crate::types::{Result, TenantId};

/// A journal command with the line it came from
#[derive(Debug, Clone, PartialEq)]
pub struct JournalCommand {
    pub line: u64,
    pub command: Command,
}

/// Result of running one journal command
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub line: u64,
    pub op: &'static str,
    pub tenant: TenantId,
    pub result: Result<CommandOutcome>,
}

/// Runs journal batches against a shared engine
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    engine: Arc<SettlementEngine>,
}

impl BatchProcessor {
    pub fn new(engine: Arc<SettlementEngine>) -> Self {
        Self { engine }
    }

    /// Split a batch into per-tenant sub-batches
    ///
    /// Every command lands in exactly one sub-batch, and each sub-batch keeps
    /// the original relative order.
    pub fn partition_by_tenant(
        &self,
        batch: Vec<JournalCommand>,
    ) -> HashMap<TenantId, Vec<JournalCommand>> {
        let mut tenant_batches: HashMap<TenantId, Vec<JournalCommand>> = HashMap::new();

        for entry in batch {
            tenant_batches
                .entry(entry.command.tenant())
                .or_default()
                .push(entry);
        }

        tenant_batches
    }

    /// Run one tenant's commands in order, logging failures
    ///
    /// A failed command does not stop the ones after it.
    pub fn process_tenant_commands(&self, commands: Vec<JournalCommand>) -> Vec<ProcessingResult> {
        commands
            .into_iter()
            .map(|entry| {
                let op = entry.command.op();
                let tenant = entry.command.tenant();
                let result = self.engine.execute(entry.command);

                if let Err(e) = &result {
                    tracing::warn!(line = entry.line, op, tenant, "command failed: {}", e);
                }

                ProcessingResult {
                    line: entry.line,
                    op,
                    tenant,
                    result,
                }
            })
            .collect()
    }

    /// Run a batch with one blocking task per tenant
    ///
    /// Waits for every task. Results come back grouped by tenant, not in
    /// journal order.
    pub async fn process_batch(&self, batch: Vec<JournalCommand>) -> Vec<ProcessingResult> {
        let tenant_batches = self.partition_by_tenant(batch);

        let mut tasks = Vec::with_capacity(tenant_batches.len());
        for (_tenant, commands) in tenant_batches {
            let processor = self.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                processor.process_tenant_commands(commands)
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(tenant_results) => results.extend(tenant_results),
                Err(e) => {
                    tracing::error!("tenant worker panicked: {}", e);
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::types::{Currency, NewIncoming, NewOutgoing, OutgoingStatus, SettlementError};
    use rust_decimal::Decimal;

    fn usd() -> Currency {
        Currency::new("USD").unwrap()
    }

    fn outgoing(line: u64, tenant: TenantId, reference: &str, amount: i64) -> JournalCommand {
        JournalCommand {
            line,
            command: Command::CreateOutgoing {
                tenant,
                data: NewOutgoing {
                    branch: 1,
                    reference: reference.to_string(),
                    sender_name: "S".to_string(),
                    recipient_name: "R".to_string(),
                    currency: usd(),
                    amount: Decimal::from(amount),
                    acquisition_rate: Decimal::from(10),
                    received_amount: Decimal::ZERO,
                    fee: Decimal::ZERO,
                    created_at: None,
                },
                actor: "journal".to_string(),
            },
        }
    }

    fn incoming(line: u64, tenant: TenantId, reference: &str, amount: i64) -> JournalCommand {
        JournalCommand {
            line,
            command: Command::CreateIncoming {
                tenant,
                data: NewIncoming {
                    branch: 1,
                    reference: reference.to_string(),
                    sender_name: "S".to_string(),
                    recipient_name: "R".to_string(),
                    currency: usd(),
                    amount: Decimal::from(amount),
                    payout_rate: Decimal::from(11),
                    created_at: None,
                },
                actor: "journal".to_string(),
            },
        }
    }

    fn auto_settle(line: u64, tenant: TenantId, reference: &str) -> JournalCommand {
        JournalCommand {
            line,
            command: Command::AutoSettle {
                tenant,
                outgoing_ref: reference.to_string(),
                strategy: None,
                actor: "journal".to_string(),
            },
        }
    }

    fn processor() -> (Arc<SettlementEngine>, BatchProcessor) {
        let engine = Arc::new(SettlementEngine::new(EngineConfig::default()));
        let processor = BatchProcessor::new(Arc::clone(&engine));
        (engine, processor)
    }

    #[test]
    fn test_partition_keeps_order_within_tenant() {
        let (_, processor) = processor();
        let batch = vec![
            outgoing(2, 1, "A", 10),
            outgoing(3, 2, "B", 10),
            incoming(4, 1, "C", 10),
            auto_settle(5, 1, "A"),
        ];

        let partitions = processor.partition_by_tenant(batch);
        assert_eq!(partitions.len(), 2);

        let lines: Vec<u64> = partitions[&1].iter().map(|entry| entry.line).collect();
        assert_eq!(lines, vec![2, 4, 5]);
        assert_eq!(partitions[&2].len(), 1);
    }

    #[test]
    fn test_failures_do_not_stop_tenant() {
        let (engine, processor) = processor();
        let results = processor.process_tenant_commands(vec![
            auto_settle(2, 1, "missing"),
            outgoing(3, 1, "O1", 10),
        ]);

        assert!(matches!(
            results[0].result,
            Err(SettlementError::NotFound { .. })
        ));
        assert!(results[1].result.is_ok());
        assert_eq!(engine.outgoing_for_tenant(1).len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_batch_processes_tenants_independently() {
        let (engine, processor) = processor();

        let mut batch = Vec::new();
        let mut line = 2;
        for tenant in 1..=8 {
            batch.push(outgoing(line, tenant, "O", 100));
            batch.push(incoming(line + 1, tenant, "I", 100));
            batch.push(auto_settle(line + 2, tenant, "O"));
            line += 3;
        }

        let results = processor.process_batch(batch).await;
        assert_eq!(results.len(), 24);
        assert!(results.iter().all(|result| result.result.is_ok()));

        for tenant in 1..=8 {
            let records = engine.outgoing_for_tenant(tenant);
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].status, OutgoingStatus::Completed);
        }
    }
}
