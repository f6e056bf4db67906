//! Ledger and cash-balance types
//!
//! Every cash movement the engine causes is recorded as a signed ledger entry
//! keyed by (tenant, branch, currency). The cached cash balance for a key must
//! always equal the sum of that key's entries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::currency::Currency;
use super::remittance::{BranchId, RemittanceId, TenantId};
use super::settlement::SettlementId;

/// Ledger entry identifier
pub type EntryId = u64;

/// What caused a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryKind {
    /// Customer paid in locally for an outgoing remittance (home currency)
    CustomerDeposit,
    /// Debt opened abroad by an outgoing remittance (debt currency, negative)
    DebtOpened,
    /// Funds collected abroad for an incoming remittance (debt currency)
    FundsReceived,
    /// Part of an outgoing debt discharged by a settlement
    DebtSettled,
    /// Part of an incoming fund consumed by a settlement
    FundsAllocated,
    /// Local payout of an incoming remittance (home currency, negative)
    Payout,
    /// Reversal of a creation entry on cancellation
    Reversal,
    /// Operator-entered adjustment
    Manual,
}

impl LedgerEntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryKind::CustomerDeposit => "CUSTOMER_DEPOSIT",
            LedgerEntryKind::DebtOpened => "DEBT_OPENED",
            LedgerEntryKind::FundsReceived => "FUNDS_RECEIVED",
            LedgerEntryKind::DebtSettled => "DEBT_SETTLED",
            LedgerEntryKind::FundsAllocated => "FUNDS_ALLOCATED",
            LedgerEntryKind::Payout => "PAYOUT",
            LedgerEntryKind::Reversal => "REVERSAL",
            LedgerEntryKind::Manual => "MANUAL",
        }
    }
}

impl fmt::Display for LedgerEntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source record of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrySource {
    Remittance(RemittanceId),
    Settlement(SettlementId),
}

/// Key of a cash balance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BalanceKey {
    pub tenant: TenantId,
    pub branch: BranchId,
    pub currency: Currency,
}

impl BalanceKey {
    pub fn new(tenant: TenantId, branch: BranchId, currency: Currency) -> Self {
        Self {
            tenant,
            branch,
            currency,
        }
    }
}

impl fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tenant, self.branch, self.currency)
    }
}

/// A posted, immutable cash movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub key: BalanceKey,

    /// Signed amount: positive adds to the balance, negative removes from it
    pub amount: Decimal,
    pub kind: LedgerEntryKind,
    pub source: Option<EntrySource>,
    pub memo: String,
    pub created_at: DateTime<Utc>,
}

/// An entry waiting to be posted
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    pub key: BalanceKey,
    pub amount: Decimal,
    pub kind: LedgerEntryKind,
    pub source: Option<EntrySource>,
    pub memo: String,
}

impl PendingEntry {
    pub fn new(
        key: BalanceKey,
        amount: Decimal,
        kind: LedgerEntryKind,
        source: Option<EntrySource>,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            key,
            amount,
            kind,
            source,
            memo: memo.into(),
        }
    }
}

/// Cached cash balance for one key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashBalance {
    pub key: BalanceKey,
    pub balance: Decimal,
    pub entry_count: usize,
}

/// Result of recomputing a cached balance from its entries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceRefresh {
    pub key: BalanceKey,
    pub cached_before: Decimal,
    pub recomputed: Decimal,

    /// `cached_before − recomputed`; zero when the cache was consistent
    pub drift: Decimal,
}

impl BalanceRefresh {
    pub fn has_drift(&self) -> bool {
        !self.drift.is_zero()
    }
}
