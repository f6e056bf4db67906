//! Append-only settlement storage
//!
//! Settlements are never updated or removed. The book indexes them by id and by
//! each side's remittance id so per-remittance totals can be checked.

use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{RemittanceId, Settlement, SettlementId, TenantId};

#[derive(Debug)]
pub struct SettlementBook {
    next_id: AtomicU64,
    settlements: DashMap<SettlementId, Settlement>,
    by_outgoing: DashMap<RemittanceId, Vec<SettlementId>>,
    by_incoming: DashMap<RemittanceId, Vec<SettlementId>>,
}

impl SettlementBook {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            settlements: DashMap::new(),
            by_outgoing: DashMap::new(),
            by_incoming: DashMap::new(),
        }
    }

    pub fn next_id(&self) -> SettlementId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn insert(&self, settlement: Settlement) {
        let id = settlement.id;
        self.by_outgoing
            .entry(settlement.outgoing_id)
            .or_default()
            .push(id);
        self.by_incoming
            .entry(settlement.incoming_id)
            .or_default()
            .push(id);
        self.settlements.insert(id, settlement);
    }

    /// Settlements of an outgoing remittance, oldest first
    pub fn for_outgoing(&self, outgoing_id: RemittanceId) -> Vec<Settlement> {
        self.collect(self.by_outgoing.get(&outgoing_id).map(|ids| ids.clone()))
    }

    /// Settlements of an incoming remittance, oldest first
    pub fn for_incoming(&self, incoming_id: RemittanceId) -> Vec<Settlement> {
        self.collect(self.by_incoming.get(&incoming_id).map(|ids| ids.clone()))
    }

    /// Every settlement of a tenant, oldest first
    pub fn for_tenant(&self, tenant: TenantId) -> Vec<Settlement> {
        let mut settlements: Vec<Settlement> = self
            .settlements
            .iter()
            .filter(|entry| entry.value().tenant == tenant)
            .map(|entry| entry.value().clone())
            .collect();
        settlements.sort_by_key(|settlement| settlement.id);
        settlements
    }

    /// Sum of settled amounts against an outgoing remittance
    pub fn settled_total_for_outgoing(&self, outgoing_id: RemittanceId) -> Decimal {
        self.for_outgoing(outgoing_id)
            .iter()
            .map(|settlement| settlement.settled_amount)
            .sum()
    }

    /// Sum of settled amounts drawn from an incoming remittance
    pub fn settled_total_for_incoming(&self, incoming_id: RemittanceId) -> Decimal {
        self.for_incoming(incoming_id)
            .iter()
            .map(|settlement| settlement.settled_amount)
            .sum()
    }

    fn collect(&self, ids: Option<Vec<SettlementId>>) -> Vec<Settlement> {
        let mut settlements: Vec<Settlement> = ids
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| self.settlements.get(&id).map(|entry| entry.value().clone()))
            .collect();
        settlements.sort_by_key(|settlement| settlement.id);
        settlements
    }
}

impl Default for SettlementBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Currency;
    use chrono::Utc;

    fn settlement(
        book: &SettlementBook,
        tenant: TenantId,
        outgoing: RemittanceId,
        incoming: RemittanceId,
        amount: i64,
    ) -> Settlement {
        Settlement {
            id: book.next_id(),
            tenant,
            outgoing_id: outgoing,
            incoming_id: incoming,
            currency: Currency::new("USD").unwrap(),
            settled_amount: Decimal::from(amount),
            acquisition_rate: Decimal::ONE,
            payout_rate: Decimal::ONE,
            profit: Decimal::ZERO,
            outgoing_remaining_before: Decimal::from(amount),
            incoming_remaining_before: Decimal::from(amount),
            created_by: "ops".to_string(),
            created_at: Utc::now(),
            notes: None,
        }
    }

    #[test]
    fn test_indexes_by_both_sides() {
        let book = SettlementBook::new();
        book.insert(settlement(&book, 1, 10, 20, 5));
        book.insert(settlement(&book, 1, 10, 21, 7));
        book.insert(settlement(&book, 1, 11, 20, 3));

        assert_eq!(book.for_outgoing(10).len(), 2);
        assert_eq!(book.for_incoming(20).len(), 2);
        assert_eq!(book.settled_total_for_outgoing(10), Decimal::from(12));
        assert_eq!(book.settled_total_for_incoming(20), Decimal::from(8));
        assert_eq!(book.settled_total_for_incoming(99), Decimal::ZERO);
        assert_eq!(book.for_tenant(1).len(), 3);
    }

    #[test]
    fn test_for_tenant_is_scoped_and_ordered() {
        let book = SettlementBook::new();
        book.insert(settlement(&book, 2, 1, 2, 1));
        book.insert(settlement(&book, 1, 3, 4, 1));
        book.insert(settlement(&book, 1, 5, 6, 1));

        let ids: Vec<SettlementId> = book.for_tenant(1).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
