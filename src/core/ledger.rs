//! Cash ledger
//!
//! This module provides the `CashLedger`, which records every cash movement as a
//! signed, immutable entry and keeps a cached balance per
//! (tenant, branch, currency).
//!
//! # Design
//!
//! Entries and cached balances live together behind one `parking_lot::Mutex`.
//! A batch of entries is posted in two passes under that lock: the first pass
//! computes every new balance with checked arithmetic, the second applies them.
//! If any addition overflows nothing is written, so a batch is all-or-nothing.
//!
//! The ledger is always the last lock taken by a mutating operation (after any
//! remittance row locks), and it never calls back into the remittance store.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::types::{
    BalanceKey, BalanceRefresh, CashBalance, EntryId, LedgerEntry, PendingEntry, Result,
    SettlementError, TenantId,
};

#[derive(Debug, Default)]
struct LedgerState {
    entries: Vec<LedgerEntry>,
    balances: HashMap<BalanceKey, CachedBalance>,
}

#[derive(Debug, Default, Clone, Copy)]
struct CachedBalance {
    balance: Decimal,
    entry_count: usize,
}

/// Append-only cash ledger with cached balances
#[derive(Debug, Default)]
pub struct CashLedger {
    state: Mutex<LedgerState>,
}

impl CashLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post a batch of entries atomically
    ///
    /// # Arguments
    ///
    /// * `pending` - Entries to post, in order
    /// * `at` - Timestamp stamped on every entry
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<LedgerEntry>)` - The posted entries with their assigned ids
    /// * `Err(SettlementError::Internal)` - A balance would overflow; nothing was posted
    pub fn post(&self, pending: Vec<PendingEntry>, at: DateTime<Utc>) -> Result<Vec<LedgerEntry>> {
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = self.state.lock();

        // First pass: compute every resulting balance without touching state
        let mut staged: HashMap<BalanceKey, CachedBalance> = HashMap::new();
        for entry in &pending {
            let current = staged
                .get(&entry.key)
                .or_else(|| state.balances.get(&entry.key))
                .copied()
                .unwrap_or_default();

            let balance = current.balance.checked_add(entry.amount).ok_or_else(|| {
                SettlementError::internal(format!(
                    "balance overflow posting {} {} to {}",
                    entry.kind, entry.amount, entry.key
                ))
            })?;

            staged.insert(
                entry.key.clone(),
                CachedBalance {
                    balance,
                    entry_count: current.entry_count + 1,
                },
            );
        }

        // Second pass: apply
        let first_id = state.entries.len() as EntryId + 1;
        let posted: Vec<LedgerEntry> = pending
            .into_iter()
            .enumerate()
            .map(|(offset, entry)| LedgerEntry {
                id: first_id + offset as EntryId,
                key: entry.key,
                amount: entry.amount,
                kind: entry.kind,
                source: entry.source,
                memo: entry.memo,
                created_at: at,
            })
            .collect();

        state.entries.extend(posted.iter().cloned());
        state.balances.extend(staged);

        Ok(posted)
    }

    /// Cached balance for a key; zero when nothing was ever posted to it
    pub fn balance(&self, key: &BalanceKey) -> Decimal {
        self.state
            .lock()
            .balances
            .get(key)
            .map(|cached| cached.balance)
            .unwrap_or_default()
    }

    /// All cached balances of a tenant, ordered by key
    pub fn balances_for_tenant(&self, tenant: TenantId) -> Vec<CashBalance> {
        let state = self.state.lock();
        let mut balances: Vec<CashBalance> = state
            .balances
            .iter()
            .filter(|(key, _)| key.tenant == tenant)
            .map(|(key, cached)| CashBalance {
                key: key.clone(),
                balance: cached.balance,
                entry_count: cached.entry_count,
            })
            .collect();
        balances.sort_by(|a, b| a.key.cmp(&b.key));
        balances
    }

    /// All cached balances, ordered by key
    pub fn all_balances(&self) -> Vec<CashBalance> {
        let state = self.state.lock();
        let mut balances: Vec<CashBalance> = state
            .balances
            .iter()
            .map(|(key, cached)| CashBalance {
                key: key.clone(),
                balance: cached.balance,
                entry_count: cached.entry_count,
            })
            .collect();
        balances.sort_by(|a, b| a.key.cmp(&b.key));
        balances
    }

    /// Entries posted to a key, in posting order
    pub fn entries_for(&self, key: &BalanceKey) -> Vec<LedgerEntry> {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|entry| &entry.key == key)
            .cloned()
            .collect()
    }

    /// Recompute a cached balance from its entries
    ///
    /// Overwrites the cache with the recomputed sum and reports the drift that
    /// was found. Calling it again immediately reports zero drift.
    pub fn refresh_balance(&self, key: &BalanceKey) -> Result<BalanceRefresh> {
        let mut state = self.state.lock();
        Self::refresh_locked(&mut state, key)
    }

    /// Refresh every balance of a tenant, ordered by key
    pub fn refresh_all(&self, tenant: TenantId) -> Result<Vec<BalanceRefresh>> {
        let mut state = self.state.lock();
        let mut keys: Vec<BalanceKey> = state
            .balances
            .keys()
            .filter(|key| key.tenant == tenant)
            .cloned()
            .collect();
        keys.sort();

        keys.iter()
            .map(|key| Self::refresh_locked(&mut state, key))
            .collect()
    }

    /// Compare every cached balance of a tenant with its entries, without repairing
    pub fn drift_report(&self, tenant: TenantId) -> Result<Vec<BalanceRefresh>> {
        let state = self.state.lock();
        let mut keys: Vec<&BalanceKey> = state
            .balances
            .keys()
            .filter(|key| key.tenant == tenant)
            .collect();
        keys.sort();

        keys.into_iter()
            .map(|key| {
                let (recomputed, _) = Self::recompute(&state, key)?;
                let cached_before = state
                    .balances
                    .get(key)
                    .map(|cached| cached.balance)
                    .unwrap_or_default();
                Ok(BalanceRefresh {
                    key: key.clone(),
                    cached_before,
                    recomputed,
                    drift: cached_before - recomputed,
                })
            })
            .collect()
    }

    fn refresh_locked(state: &mut LedgerState, key: &BalanceKey) -> Result<BalanceRefresh> {
        let (recomputed, entry_count) = Self::recompute(state, key)?;
        let cached_before = state
            .balances
            .get(key)
            .map(|cached| cached.balance)
            .unwrap_or_default();

        let refresh = BalanceRefresh {
            key: key.clone(),
            cached_before,
            recomputed,
            drift: cached_before - recomputed,
        };

        if refresh.has_drift() {
            tracing::warn!(
                key = %key,
                cached = %cached_before,
                recomputed = %recomputed,
                "cash balance drift repaired"
            );
        }

        state.balances.insert(
            key.clone(),
            CachedBalance {
                balance: recomputed,
                entry_count,
            },
        );

        Ok(refresh)
    }

    fn recompute(state: &LedgerState, key: &BalanceKey) -> Result<(Decimal, usize)> {
        state
            .entries
            .iter()
            .filter(|entry| &entry.key == key)
            .try_fold((Decimal::ZERO, 0usize), |(sum, count), entry| {
                sum.checked_add(entry.amount)
                    .map(|sum| (sum, count + 1))
                    .ok_or_else(|| {
                        SettlementError::internal(format!("balance overflow recomputing {}", key))
                    })
            })
    }

    /// Overwrite a cached balance without posting an entry
    #[cfg(test)]
    pub(crate) fn corrupt_balance(&self, key: &BalanceKey, balance: Decimal) {
        let mut state = self.state.lock();
        let cached = state.balances.entry(key.clone()).or_default();
        cached.balance = balance;
    }
}
