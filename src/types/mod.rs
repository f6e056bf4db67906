//! Types module
//!
//! Contains core data structures used throughout the engine:
//! - `currency`: Currency codes
//! - `remittance`: Outgoing and incoming remittance registers and identifiers
//! - `settlement`: Settlement records, strategies, suggestions, auto-settle reports
//! - `ledger`: Ledger entries and cash balances
//! - `summary`: Unsettled aging/status breakdown
//! - `error`: Error types for the engine

pub mod currency;
pub mod error;
pub mod ledger;
pub mod remittance;
pub mod settlement;
pub mod summary;

pub use currency::Currency;
pub use error::{Result, SettlementError};
pub use ledger::{
    BalanceKey, BalanceRefresh, CashBalance, EntryId, EntrySource, LedgerEntry, LedgerEntryKind,
    PendingEntry,
};
pub use remittance::{
    BranchId, IncomingRemittance, IncomingStatus, NewIncoming, NewOutgoing, OutgoingRemittance,
    OutgoingStatus, RemittanceId, RemittanceKind, TenantId,
};
pub use settlement::{
    spread_profit, AutoSettleOutcome, AutoSettleResult, Settlement, SettlementId,
    SettlementStrategy, SkipReason, SkippedCandidate, Suggestion,
};
pub use summary::{AgingBucket, ConsistencyReport, RegisterSummary, StatusBucket, UnsettledSummary};
