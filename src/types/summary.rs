//! Reporting types: unsettled summary and consistency report

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::ledger::BalanceRefresh;
use super::remittance::TenantId;

/// Totals for one status of one register
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBucket {
    pub status: String,
    pub count: usize,
    pub amount: Decimal,
    pub remaining: Decimal,
}

/// Open records grouped by age
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgingBucket {
    pub label: String,
    pub min_days: i64,

    /// Inclusive upper bound; `None` for the last, open-ended bucket
    pub max_days: Option<i64>,
    pub count: usize,
    pub remaining: Decimal,
}

impl AgingBucket {
    pub fn contains(&self, age_days: i64) -> bool {
        age_days >= self.min_days && self.max_days.map_or(true, |max| age_days <= max)
    }
}

/// Status and aging breakdown of one register
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterSummary {
    pub by_status: Vec<StatusBucket>,
    pub aging: Vec<AgingBucket>,
    pub open_count: usize,
    pub total_remaining: Decimal,
}

/// Aging/status breakdown of a tenant's unsettled remittances
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnsettledSummary {
    pub tenant: TenantId,
    pub as_of: DateTime<Utc>,
    pub outgoing: RegisterSummary,
    pub incoming: RegisterSummary,
    pub settlement_count: usize,
    pub realized_profit: Decimal,
}

/// Result of checking a tenant's records and balances against the invariants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyReport {
    pub tenant: TenantId,
    pub checked_remittances: usize,
    pub checked_settlements: usize,
    pub checked_balances: usize,
    pub violations: Vec<String>,
    pub drifts: Vec<BalanceRefresh>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty() && self.drifts.is_empty()
    }
}
