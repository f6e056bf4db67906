//! Thread-safe remittance registers
//!
//! This module provides the `RemittanceStore`, which owns both remittance
//! registers and the per-tenant reference index.
//!
//! # Design
//!
//! Each register is a `DashMap` from id to an `Arc<Row<T>>`. The map's shard
//! locks are only held long enough to clone the `Arc`; the record itself sits
//! behind a per-row `parking_lot::RwLock`, which is the lock the settlement
//! primitive and cancellation take. Reads (snapshots for suggestions, reports)
//! take the row's read lock briefly and clone.
//!
//! # Lock Order
//!
//! Callers that need both sides of a settlement must take the outgoing row's
//! write lock before the incoming row's. Every mutating path in the engine
//! follows that order, so waits cannot form a cycle.
//!
//! # Tenant Scoping
//!
//! Rows remember the tenant that owns them. Lookups with another tenant fail
//! with `NotFound`, exactly like a missing id.

use dashmap::DashMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::types::{
    Currency, IncomingRemittance, OutgoingRemittance, RemittanceId, RemittanceKind, Result,
    SettlementError, TenantId,
};

/// One lockable remittance record
#[derive(Debug)]
pub struct Row<T> {
    tenant: TenantId,
    data: RwLock<T>,
}

impl<T> Row<T> {
    fn new(tenant: TenantId, record: T) -> Self {
        Self {
            tenant,
            data: RwLock::new(record),
        }
    }

    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    /// Shared access for snapshots
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.data.read()
    }

    /// Exclusive access, waiting at most `timeout`
    ///
    /// A timed-out wait is reported as a single-attempt `Conflict`; the engine's
    /// retry loop decides whether to try again.
    pub fn write_within(
        &self,
        timeout: Duration,
        operation: &str,
        id: RemittanceId,
    ) -> Result<RwLockWriteGuard<'_, T>> {
        self.data
            .try_write_for(timeout)
            .ok_or_else(|| SettlementError::conflict(operation, id, 1))
    }
}

/// Both remittance registers plus the reference index
#[derive(Debug)]
pub struct RemittanceStore {
    /// Shared id sequence for both registers
    next_id: AtomicU64,

    outgoing: DashMap<RemittanceId, Arc<Row<OutgoingRemittance>>>,
    incoming: DashMap<RemittanceId, Arc<Row<IncomingRemittance>>>,

    /// (tenant, reference) → register and id
    references: DashMap<(TenantId, String), (RemittanceKind, RemittanceId)>,
}

impl RemittanceStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            outgoing: DashMap::new(),
            incoming: DashMap::new(),
            references: DashMap::new(),
        }
    }

    /// Allocate the next remittance id
    pub fn next_id(&self) -> RemittanceId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Claim a reference for a remittance about to be inserted
    ///
    /// References are unique per tenant across both registers. If two threads
    /// race for the same reference, exactly one wins.
    pub fn reserve_reference(
        &self,
        tenant: TenantId,
        reference: &str,
        kind: RemittanceKind,
        id: RemittanceId,
    ) -> Result<()> {
        use dashmap::mapref::entry::Entry;

        match self.references.entry((tenant, reference.to_string())) {
            Entry::Occupied(_) => Err(SettlementError::validation(
                "reference",
                format!("'{}' is already used by tenant {}", reference, tenant),
            )),
            Entry::Vacant(slot) => {
                slot.insert((kind, id));
                Ok(())
            }
        }
    }

    /// Undo a reservation whose insert did not go ahead
    pub fn release_reference(&self, tenant: TenantId, reference: &str) {
        self.references.remove(&(tenant, reference.to_string()));
    }

    /// Resolve a reference to its register and id
    ///
    /// A reservation whose row is not inserted yet does not resolve, so a caller
    /// that gets an id back can always look the record up.
    pub fn find_by_reference(
        &self,
        tenant: TenantId,
        reference: &str,
    ) -> Option<(RemittanceKind, RemittanceId)> {
        let (kind, id) = *self.references.get(&(tenant, reference.to_string()))?.value();
        let inserted = match kind {
            RemittanceKind::Outgoing => self.outgoing.contains_key(&id),
            RemittanceKind::Incoming => self.incoming.contains_key(&id),
        };
        inserted.then_some((kind, id))
    }

    pub fn insert_outgoing(&self, record: OutgoingRemittance) {
        let row = Arc::new(Row::new(record.tenant, record));
        let id = row.read().id;
        self.outgoing.insert(id, row);
    }

    pub fn insert_incoming(&self, record: IncomingRemittance) {
        let row = Arc::new(Row::new(record.tenant, record));
        let id = row.read().id;
        self.incoming.insert(id, row);
    }

    /// Lockable handle to an outgoing remittance owned by `tenant`
    pub fn outgoing_row(
        &self,
        tenant: TenantId,
        id: RemittanceId,
    ) -> Result<Arc<Row<OutgoingRemittance>>> {
        self.outgoing
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .filter(|row| row.tenant() == tenant)
            .ok_or_else(|| SettlementError::not_found(RemittanceKind::Outgoing.entity(), id, tenant))
    }

    /// Lockable handle to an incoming remittance owned by `tenant`
    pub fn incoming_row(
        &self,
        tenant: TenantId,
        id: RemittanceId,
    ) -> Result<Arc<Row<IncomingRemittance>>> {
        self.incoming
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .filter(|row| row.tenant() == tenant)
            .ok_or_else(|| SettlementError::not_found(RemittanceKind::Incoming.entity(), id, tenant))
    }

    /// Snapshot of an outgoing remittance
    pub fn get_outgoing(&self, tenant: TenantId, id: RemittanceId) -> Result<OutgoingRemittance> {
        let row = self.outgoing_row(tenant, id)?;
        let snapshot = row.read().clone();
        Ok(snapshot)
    }

    /// Snapshot of an incoming remittance
    pub fn get_incoming(&self, tenant: TenantId, id: RemittanceId) -> Result<IncomingRemittance> {
        let row = self.incoming_row(tenant, id)?;
        let snapshot = row.read().clone();
        Ok(snapshot)
    }

    /// Which register holds `id` for `tenant`
    pub fn kind_of(&self, tenant: TenantId, id: RemittanceId) -> Result<RemittanceKind> {
        if self.outgoing_row(tenant, id).is_ok() {
            Ok(RemittanceKind::Outgoing)
        } else if self.incoming_row(tenant, id).is_ok() {
            Ok(RemittanceKind::Incoming)
        } else {
            Err(SettlementError::not_found("remittance", id, tenant))
        }
    }

    /// Snapshots of a tenant's outgoing remittances, ordered by id
    pub fn outgoing_for_tenant(&self, tenant: TenantId) -> Vec<OutgoingRemittance> {
        let mut records: Vec<OutgoingRemittance> = Self::rows_for(&self.outgoing, tenant)
            .iter()
            .map(|row| row.read().clone())
            .collect();
        records.sort_by_key(|record| record.id);
        records
    }

    /// Snapshots of a tenant's incoming remittances, ordered by id
    pub fn incoming_for_tenant(&self, tenant: TenantId) -> Vec<IncomingRemittance> {
        let mut records: Vec<IncomingRemittance> = Self::rows_for(&self.incoming, tenant)
            .iter()
            .map(|row| row.read().clone())
            .collect();
        records.sort_by_key(|record| record.id);
        records
    }

    /// Incoming remittances the strategy selector may choose from
    ///
    /// Open (PENDING/PARTIAL), positive remaining, matching currency. The result
    /// is a set of snapshots: it may be stale by the time it is used.
    pub fn incoming_candidates(
        &self,
        tenant: TenantId,
        currency: &Currency,
    ) -> Vec<IncomingRemittance> {
        Self::rows_for(&self.incoming, tenant)
            .iter()
            .map(|row| row.read().clone())
            .filter(|record| record.is_candidate() && &record.currency == currency)
            .collect()
    }

    /// Open outgoing debts in `currency` that a payment could be spread over
    pub fn outgoing_candidates(
        &self,
        tenant: TenantId,
        currency: &Currency,
    ) -> Vec<OutgoingRemittance> {
        Self::rows_for(&self.outgoing, tenant)
            .iter()
            .map(|row| row.read().clone())
            .filter(|record| {
                record.is_settleable()
                    && record.remaining_amount > Decimal::ZERO
                    && &record.currency == currency
            })
            .collect()
    }

    /// Every tenant with at least one remittance, ascending
    pub fn tenants(&self) -> Vec<TenantId> {
        let mut tenants: Vec<TenantId> = self
            .outgoing
            .iter()
            .map(|entry| entry.value().tenant())
            .chain(self.incoming.iter().map(|entry| entry.value().tenant()))
            .collect();
        tenants.sort_unstable();
        tenants.dedup();
        tenants
    }

    /// Collect a tenant's row handles without holding shard locks while reading rows
    fn rows_for<T>(map: &DashMap<RemittanceId, Arc<Row<T>>>, tenant: TenantId) -> Vec<Arc<Row<T>>> {
        map.iter()
            .filter(|entry| entry.value().tenant() == tenant)
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}

impl Default for RemittanceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IncomingStatus, OutgoingStatus};
    use chrono::Utc;

    fn usd() -> Currency {
        Currency::new("USD").unwrap()
    }

    fn outgoing(id: RemittanceId, tenant: TenantId) -> OutgoingRemittance {
        let now = Utc::now();
        OutgoingRemittance {
            id,
            tenant,
            branch: 1,
            reference: format!("O{}", id),
            sender_name: "Sender".to_string(),
            recipient_name: "Recipient".to_string(),
            currency: usd(),
            amount: Decimal::from(100),
            acquisition_rate: Decimal::from(10),
            received_amount: Decimal::from(1000),
            fee: Decimal::ZERO,
            settled_amount: Decimal::ZERO,
            remaining_amount: Decimal::from(100),
            status: OutgoingStatus::Pending,
            profit: Decimal::ZERO,
            created_by: "teller".to_string(),
            created_at: now,
            updated_at: now,
            cancelled_by: None,
            cancelled_at: None,
            cancellation_reason: None,
        }
    }

    fn incoming(id: RemittanceId, tenant: TenantId, currency: Currency) -> IncomingRemittance {
        let now = Utc::now();
        IncomingRemittance {
            id,
            tenant,
            branch: 1,
            reference: format!("I{}", id),
            sender_name: "Sender".to_string(),
            recipient_name: "Recipient".to_string(),
            currency,
            amount: Decimal::from(50),
            payout_rate: Decimal::from(11),
            allocated_amount: Decimal::ZERO,
            remaining_amount: Decimal::from(50),
            status: IncomingStatus::Pending,
            profit: Decimal::ZERO,
            created_by: "teller".to_string(),
            created_at: now,
            updated_at: now,
            paid_by: None,
            paid_at: None,
            cancelled_by: None,
            cancelled_at: None,
            cancellation_reason: None,
        }
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let store = RemittanceStore::new();
        let first = store.next_id();
        let second = store.next_id();
        assert!(second > first);
    }

    #[test]
    fn test_tenant_mismatch_is_not_found() {
        let store = RemittanceStore::new();
        store.insert_outgoing(outgoing(1, 7));

        assert!(store.get_outgoing(7, 1).is_ok());
        match store.get_outgoing(8, 1) {
            Err(SettlementError::NotFound { tenant, .. }) => assert_eq!(tenant, 8),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_kind_of_resolves_register() {
        let store = RemittanceStore::new();
        store.insert_outgoing(outgoing(1, 1));
        store.insert_incoming(incoming(2, 1, usd()));

        assert_eq!(store.kind_of(1, 1).unwrap(), RemittanceKind::Outgoing);
        assert_eq!(store.kind_of(1, 2).unwrap(), RemittanceKind::Incoming);
        assert!(store.kind_of(1, 3).is_err());
        assert!(store.kind_of(2, 1).is_err());
    }

    #[test]
    fn test_duplicate_reference_rejected_per_tenant() {
        let store = RemittanceStore::new();
        store
            .reserve_reference(1, "REF-1", RemittanceKind::Outgoing, 1)
            .unwrap();

        let duplicate = store.reserve_reference(1, "REF-1", RemittanceKind::Incoming, 2);
        assert!(matches!(
            duplicate,
            Err(SettlementError::ValidationError { .. })
        ));

        // Another tenant may reuse it
        store
            .reserve_reference(2, "REF-1", RemittanceKind::Incoming, 3)
            .unwrap();

        store.insert_outgoing(outgoing(1, 1));
        assert_eq!(
            store.find_by_reference(1, "REF-1"),
            Some((RemittanceKind::Outgoing, 1))
        );

        store.release_reference(1, "REF-1");
        assert_eq!(store.find_by_reference(1, "REF-1"), None);
    }

    #[test]
    fn test_reference_resolves_only_after_insert() {
        let store = RemittanceStore::new();
        store
            .reserve_reference(1, "REF-IN", RemittanceKind::Incoming, 5)
            .unwrap();
        store
            .reserve_reference(1, "REF-OUT", RemittanceKind::Outgoing, 6)
            .unwrap();

        assert_eq!(store.find_by_reference(1, "REF-IN"), None);
        assert_eq!(store.find_by_reference(1, "REF-OUT"), None);

        // Still reserved: a duplicate is rejected while the row is pending
        assert!(store
            .reserve_reference(1, "REF-IN", RemittanceKind::Incoming, 7)
            .is_err());

        store.insert_incoming(incoming(5, 1, usd()));
        assert_eq!(
            store.find_by_reference(1, "REF-IN"),
            Some((RemittanceKind::Incoming, 5))
        );
        assert!(store.get_incoming(1, 5).is_ok());
        assert_eq!(store.find_by_reference(1, "REF-OUT"), None);
    }

    #[test]
    fn test_candidates_filter_status_currency_and_tenant() {
        let store = RemittanceStore::new();
        store.insert_incoming(incoming(1, 1, usd()));

        let mut completed = incoming(2, 1, usd());
        completed.status = IncomingStatus::Completed;
        completed.allocated_amount = Decimal::from(50);
        completed.remaining_amount = Decimal::ZERO;
        store.insert_incoming(completed);

        store.insert_incoming(incoming(3, 1, Currency::new("EUR").unwrap()));
        store.insert_incoming(incoming(4, 2, usd()));

        let candidates = store.incoming_candidates(1, &usd());
        let ids: Vec<RemittanceId> = candidates.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_write_within_times_out_as_conflict() {
        let store = RemittanceStore::new();
        store.insert_outgoing(outgoing(1, 1));
        let row = store.outgoing_row(1, 1).unwrap();

        let _held = row.write_within(Duration::from_millis(50), "test", 1).unwrap();
        let second = row.write_within(Duration::from_millis(10), "settle", 1);

        assert!(matches!(second, Err(SettlementError::Conflict { attempts: 1, .. })));
    }

    #[test]
    fn test_concurrent_reference_reservation_has_one_winner() {
        use std::thread;

        let store = Arc::new(RemittanceStore::new());
        let mut handles = vec![];

        for i in 0..16u64 {
            let store_clone = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                store_clone
                    .reserve_reference(1, "SHARED", RemittanceKind::Outgoing, i)
                    .is_ok()
            }));
        }

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_tenants_are_deduplicated() {
        let store = RemittanceStore::new();
        store.insert_outgoing(outgoing(1, 3));
        store.insert_incoming(incoming(2, 3, usd()));
        store.insert_incoming(incoming(3, 1, usd()));

        assert_eq!(store.tenants(), vec![1, 3]);
    }
}
