//! Core business logic module
//!
//! This module contains the settlement engine and its components:
//! - `traits` - Injected collaborators (clock)
//! - `remittance_store` - Outgoing/incoming registers with per-row locks
//! - `ledger` - Signed cash entries and cached balances
//! - `settlement_book` - Append-only settlement records
//! - `audit` - Audit trail of every mutation
//! - `allocation` - Greedy strategy-ordered allocation
//! - `selector` - Settlement suggestions for an outgoing debt
//! - `engine` - The `SettlementEngine` facade and settlement primitive
//! - `auto_settle` - Suggestion-driven settlement runs
//! - `summary` - Unsettled summary and consistency verification
//! - `command` - Journal commands and their dispatch
//! - `batch_processor` - Tenant-partitioned parallel batch execution

pub mod allocation;
pub mod audit;
pub mod auto_settle;
pub mod batch_processor;
pub mod command;
pub mod engine;
pub mod ledger;
pub mod remittance_store;
pub mod selector;
pub mod settlement_book;
pub mod summary;
pub mod traits;

pub use allocation::{allocate, Allocation, AllocationItem, AllocationPlan};
pub use audit::{AuditAction, AuditEntry, AuditLog};
pub use batch_processor::{BatchProcessor, JournalCommand, ProcessingResult};
pub use command::{Command, CommandOutcome};
pub use engine::SettlementEngine;
pub use ledger::CashLedger;
pub use traits::{Clock, ManualClock, SystemClock};
