//! Settlement engine
//!
//! This module provides the `SettlementEngine`, the facade every caller goes
//! through. It coordinates the remittance registers, the settlement book, the
//! cash ledger and the audit trail, and enforces the business rules:
//!
//! - A remittance's `settled + remaining` always equals its `amount`
//! - Terminal remittances (COMPLETED, PAID, CANCELLED) are never settled again
//! - A settlement never exceeds either side's remaining balance
//! - Every cash movement is posted to the ledger in the same commit as the
//!   state change that caused it
//!
//! # Commit Protocol
//!
//! Mutations lock the affected remittance rows (outgoing first, then incoming),
//! validate, stage the new row values on clones, post the ledger entries, and
//! only then write the staged values back. A failure at any step before the
//! write-back leaves every row untouched; the ledger rejects a batch as a whole.
//!
//! # Concurrency
//!
//! Row locks are taken with a bounded wait. A wait that times out is a
//! `Conflict`; the engine retries the whole attempt with a doubling backoff and
//! surfaces `Conflict` once `max_attempts` is spent.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::core::audit::{AuditAction, AuditEntry, AuditLog};
use crate::core::ledger::CashLedger;
use crate::core::remittance_store::RemittanceStore;
use crate::core::selector;
use crate::core::settlement_book::SettlementBook;
use crate::core::traits::{Clock, SystemClock};
use crate::types::remittance::{require_positive, require_present};
use crate::types::{
    spread_profit, BalanceKey, BalanceRefresh, BranchId, CashBalance, Currency, EntrySource,
    IncomingRemittance, IncomingStatus, LedgerEntry, LedgerEntryKind, NewIncoming, NewOutgoing,
    OutgoingRemittance, OutgoingStatus, PendingEntry, RemittanceId, RemittanceKind, Result,
    Settlement, SettlementError, SettlementStrategy, Suggestion, TenantId,
};

/// Thread-safe remittance settlement engine
///
/// All operations take `&self`; share the engine across threads with `Arc`.
#[derive(Debug)]
pub struct SettlementEngine {
    pub(crate) config: EngineConfig,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) store: RemittanceStore,
    pub(crate) book: SettlementBook,
    pub(crate) ledger: CashLedger,
    pub(crate) audit: AuditLog,
}

impl SettlementEngine {
    /// Create an engine driven by the system clock
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create an engine driven by the given clock
    ///
    /// # Arguments
    ///
    /// * `config` - Engine configuration; unusable values are replaced by defaults
    /// * `clock` - Source of every timestamp the engine writes
    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: config.sanitized(),
            clock,
            store: RemittanceStore::new(),
            book: SettlementBook::new(),
            ledger: CashLedger::new(),
            audit: AuditLog::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Open an outgoing remittance (a debt owed abroad)
    ///
    /// Posts `CUSTOMER_DEPOSIT +(received + fee)` in the home currency and
    /// `DEBT_OPENED −amount` in the debt currency, both on the record's branch.
    ///
    /// # Errors
    ///
    /// * `ValidationError` - Missing names/reference, non-positive amount or rate,
    ///   negative funding, or a reference already used by the tenant
    /// * `Internal` - Arithmetic overflow; nothing was created
    pub fn create_outgoing(
        &self,
        tenant: TenantId,
        data: NewOutgoing,
        actor: &str,
    ) -> Result<OutgoingRemittance> {
        data.validate()?;
        require_present("actor", actor)?;

        let id = self.store.next_id();
        let reference = data.reference.clone();
        self.store
            .reserve_reference(tenant, &reference, RemittanceKind::Outgoing, id)?;

        let record = match self.open_outgoing(tenant, id, data, actor) {
            Ok(record) => record,
            Err(e) => {
                self.store.release_reference(tenant, &reference);
                return Err(e);
            }
        };

        self.store.insert_outgoing(record.clone());
        self.audit.record(
            record.updated_at,
            tenant,
            actor,
            AuditAction::CreateOutgoing,
            id,
            format!(
                "outgoing {} opened: {} {} at {}",
                record.reference, record.amount, record.currency, record.acquisition_rate
            ),
        );

        Ok(record)
    }

    fn open_outgoing(
        &self,
        tenant: TenantId,
        id: RemittanceId,
        data: NewOutgoing,
        actor: &str,
    ) -> Result<OutgoingRemittance> {
        let now = self.clock.now();
        let deposit = data
            .received_amount
            .checked_add(data.fee)
            .ok_or_else(|| SettlementError::arithmetic_overflow("create_outgoing", id))?;

        let mut entries = Vec::with_capacity(2);
        if !deposit.is_zero() {
            entries.push(PendingEntry::new(
                self.home_key(tenant, data.branch),
                deposit,
                LedgerEntryKind::CustomerDeposit,
                Some(EntrySource::Remittance(id)),
                format!("deposit for outgoing {}", data.reference),
            ));
        }
        entries.push(PendingEntry::new(
            BalanceKey::new(tenant, data.branch, data.currency.clone()),
            -data.amount,
            LedgerEntryKind::DebtOpened,
            Some(EntrySource::Remittance(id)),
            format!("debt opened by outgoing {}", data.reference),
        ));
        self.ledger.post(entries, now)?;

        Ok(OutgoingRemittance {
            id,
            tenant,
            branch: data.branch,
            reference: data.reference,
            sender_name: data.sender_name,
            recipient_name: data.recipient_name,
            currency: data.currency,
            amount: data.amount,
            acquisition_rate: data.acquisition_rate,
            received_amount: data.received_amount,
            fee: data.fee,
            settled_amount: Decimal::ZERO,
            remaining_amount: data.amount,
            status: OutgoingStatus::Pending,
            profit: Decimal::ZERO,
            created_by: actor.to_string(),
            created_at: data.created_at.unwrap_or(now),
            updated_at: now,
            cancelled_by: None,
            cancelled_at: None,
            cancellation_reason: None,
        })
    }

    /// Register an incoming remittance (funds collected abroad)
    ///
    /// Posts `FUNDS_RECEIVED +amount` in the remittance currency on its branch.
    ///
    /// # Errors
    ///
    /// * `ValidationError` - Missing names/reference, non-positive amount or rate,
    ///   or a reference already used by the tenant
    pub fn create_incoming(
        &self,
        tenant: TenantId,
        data: NewIncoming,
        actor: &str,
    ) -> Result<IncomingRemittance> {
        data.validate()?;
        require_present("actor", actor)?;

        let id = self.store.next_id();
        self.store
            .reserve_reference(tenant, &data.reference, RemittanceKind::Incoming, id)?;

        let now = self.clock.now();
        let entry = PendingEntry::new(
            BalanceKey::new(tenant, data.branch, data.currency.clone()),
            data.amount,
            LedgerEntryKind::FundsReceived,
            Some(EntrySource::Remittance(id)),
            format!("funds received for incoming {}", data.reference),
        );
        if let Err(e) = self.ledger.post(vec![entry], now) {
            self.store.release_reference(tenant, &data.reference);
            return Err(e);
        }

        let record = IncomingRemittance {
            id,
            tenant,
            branch: data.branch,
            reference: data.reference,
            sender_name: data.sender_name,
            recipient_name: data.recipient_name,
            currency: data.currency,
            amount: data.amount,
            payout_rate: data.payout_rate,
            allocated_amount: Decimal::ZERO,
            remaining_amount: data.amount,
            status: IncomingStatus::Pending,
            profit: Decimal::ZERO,
            created_by: actor.to_string(),
            created_at: data.created_at.unwrap_or(now),
            updated_at: now,
            paid_by: None,
            paid_at: None,
            cancelled_by: None,
            cancelled_at: None,
            cancellation_reason: None,
        };

        self.store.insert_incoming(record.clone());
        self.audit.record(
            now,
            tenant,
            actor,
            AuditAction::CreateIncoming,
            id,
            format!(
                "incoming {} registered: {} {} at {}",
                record.reference, record.amount, record.currency, record.payout_rate
            ),
        );

        Ok(record)
    }

    // ------------------------------------------------------------------
    // Settlement primitive
    // ------------------------------------------------------------------

    /// Net `amount` of an outgoing debt against an incoming fund
    ///
    /// Both rows are locked exclusively for the whole commit. The amount is
    /// never clamped: asking for more than either side has left is an error.
    ///
    /// # Arguments
    ///
    /// * `tenant` - Tenant performing the settlement
    /// * `outgoing_id` - Debt to reduce
    /// * `incoming_id` - Fund to draw from
    /// * `amount` - Debt-currency amount, must be positive
    /// * `actor` - User recorded on the settlement and audit entry
    /// * `notes` - Optional free text stored on the settlement
    ///
    /// # Returns
    ///
    /// * `Ok(Settlement)` - The immutable settlement record
    /// * `Err(ValidationError)` - Non-positive amount or currency mismatch
    /// * `Err(NotFound)` - Either id is unknown to the tenant
    /// * `Err(InvalidState)` - Either side is CANCELLED, COMPLETED or PAID
    /// * `Err(InsufficientFunds)` - `amount > min(outgoing.remaining, incoming.remaining)`
    /// * `Err(Conflict)` - Row locks could not be taken within the retry budget
    /// * `Err(Internal)` - Arithmetic overflow; nothing changed
    pub fn settle(
        &self,
        tenant: TenantId,
        outgoing_id: RemittanceId,
        incoming_id: RemittanceId,
        amount: Decimal,
        actor: &str,
        notes: Option<&str>,
    ) -> Result<Settlement> {
        require_positive("settle_amount", amount)?;
        require_present("actor", actor)?;

        self.with_retry("settle", outgoing_id, || {
            self.try_settle(tenant, outgoing_id, incoming_id, amount, actor, notes)
        })
    }

    fn try_settle(
        &self,
        tenant: TenantId,
        outgoing_id: RemittanceId,
        incoming_id: RemittanceId,
        amount: Decimal,
        actor: &str,
        notes: Option<&str>,
    ) -> Result<Settlement> {
        let outgoing_row = self.store.outgoing_row(tenant, outgoing_id)?;
        let incoming_row = self.store.incoming_row(tenant, incoming_id)?;

        let timeout = self.config.lock_timeout;
        let mut outgoing = outgoing_row.write_within(timeout, "settle", outgoing_id)?;
        let mut incoming = incoming_row.write_within(timeout, "settle", incoming_id)?;

        if !outgoing.is_settleable() {
            return Err(SettlementError::invalid_state(
                RemittanceKind::Outgoing.entity(),
                outgoing_id,
                outgoing.status,
                "settle",
            ));
        }
        if !incoming.is_settleable() {
            return Err(SettlementError::invalid_state(
                RemittanceKind::Incoming.entity(),
                incoming_id,
                incoming.status,
                "settle",
            ));
        }

        if outgoing.currency != incoming.currency {
            return Err(SettlementError::validation(
                "currency",
                format!(
                    "outgoing {} is in {} but incoming {} is in {}",
                    outgoing_id, outgoing.currency, incoming_id, incoming.currency
                ),
            ));
        }

        let available = outgoing.remaining_amount.min(incoming.remaining_amount);
        if amount > available {
            return Err(SettlementError::insufficient_funds(
                outgoing_id,
                incoming_id,
                available,
                amount,
            ));
        }

        let profit = spread_profit(amount, outgoing.acquisition_rate, incoming.payout_rate)
            .ok_or_else(|| SettlementError::arithmetic_overflow("settle", outgoing_id))?;
        let now = self.clock.now();

        let mut staged_outgoing = outgoing.clone();
        staged_outgoing.apply_settlement(amount, profit, now)?;
        let mut staged_incoming = incoming.clone();
        staged_incoming.apply_allocation(amount, profit, now)?;

        let settlement_id = self.book.next_id();
        let source = Some(EntrySource::Settlement(settlement_id));
        self.ledger.post(
            vec![
                PendingEntry::new(
                    BalanceKey::new(tenant, outgoing.branch, outgoing.currency.clone()),
                    amount,
                    LedgerEntryKind::DebtSettled,
                    source,
                    format!("settlement {} of outgoing {}", settlement_id, outgoing.reference),
                ),
                PendingEntry::new(
                    BalanceKey::new(tenant, incoming.branch, incoming.currency.clone()),
                    -amount,
                    LedgerEntryKind::FundsAllocated,
                    source,
                    format!("settlement {} of incoming {}", settlement_id, incoming.reference),
                ),
            ],
            now,
        )?;

        let settlement = Settlement {
            id: settlement_id,
            tenant,
            outgoing_id,
            incoming_id,
            currency: outgoing.currency.clone(),
            settled_amount: amount,
            acquisition_rate: outgoing.acquisition_rate,
            payout_rate: incoming.payout_rate,
            profit,
            outgoing_remaining_before: outgoing.remaining_amount,
            incoming_remaining_before: incoming.remaining_amount,
            created_by: actor.to_string(),
            created_at: now,
            notes: notes.map(str::to_string),
        };

        *outgoing = staged_outgoing;
        *incoming = staged_incoming;
        self.book.insert(settlement.clone());

        self.audit.record(
            now,
            tenant,
            actor,
            AuditAction::Settle,
            settlement_id,
            format!(
                "settled {} {} of outgoing {} ({}) against incoming {} ({}), profit {}",
                amount,
                settlement.currency,
                outgoing_id,
                outgoing.status,
                incoming_id,
                incoming.status,
                profit
            ),
        );

        Ok(settlement)
    }

    /// Run `attempt` until it succeeds, fails for good, or retries run out
    ///
    /// Only `Conflict` is retried. The final `Conflict` reports the number of
    /// attempts made.
    pub(crate) fn with_retry<T>(
        &self,
        operation: &str,
        id: RemittanceId,
        mut attempt: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut backoff = self.config.retry_backoff;

        for n in 1..=max_attempts {
            match attempt() {
                Err(e) if e.is_retryable() => {
                    if n == max_attempts {
                        tracing::warn!(operation, id, attempts = n, "giving up after lock conflicts");
                        return Err(SettlementError::conflict(operation, id, n));
                    }
                    tracing::warn!(operation, id, attempt = n, "lock conflict, retrying");
                    if !backoff.is_zero() {
                        std::thread::sleep(backoff);
                    }
                    backoff = backoff.saturating_mul(2);
                }
                other => return other,
            }
        }

        Err(SettlementError::conflict(operation, id, max_attempts))
    }

    // ------------------------------------------------------------------
    // Strategy selector
    // ------------------------------------------------------------------

    /// Rank open incoming funds for an outgoing debt
    ///
    /// Read-only: works on snapshots and takes no write locks. The result may be
    /// stale by the time it is executed.
    ///
    /// # Errors
    ///
    /// * `NotFound` - Outgoing unknown to the tenant
    /// * `ValidationError` - `limit` is zero
    pub fn suggest_settlements(
        &self,
        tenant: TenantId,
        outgoing_id: RemittanceId,
        strategy: SettlementStrategy,
        limit: usize,
    ) -> Result<Vec<Suggestion>> {
        let outgoing = self.store.get_outgoing(tenant, outgoing_id)?;
        let candidates = self.store.incoming_candidates(tenant, &outgoing.currency);
        let suggestions = selector::suggest(&outgoing, &candidates, strategy, limit)?;

        tracing::debug!(
            tenant,
            outgoing = outgoing_id,
            strategy = %strategy,
            candidates = candidates.len(),
            suggestions = suggestions.len(),
            "generated settlement suggestions"
        );

        Ok(suggestions)
    }

    // ------------------------------------------------------------------
    // Cancellation and payout
    // ------------------------------------------------------------------

    /// Cancel a remittance in either register
    ///
    /// Only remittances with nothing settled can be cancelled. The creation
    /// ledger entries are reversed in the same commit.
    ///
    /// # Returns
    ///
    /// * `Ok(RemittanceKind)` - Which register the cancelled record lives in
    /// * `Err(NotFound)` - Id unknown to the tenant
    /// * `Err(InvalidState)` - Already cancelled, or something was settled
    /// * `Err(ValidationError)` - Missing reason or actor
    pub fn cancel(
        &self,
        tenant: TenantId,
        id: RemittanceId,
        actor: &str,
        reason: &str,
    ) -> Result<RemittanceKind> {
        match self.store.kind_of(tenant, id)? {
            RemittanceKind::Outgoing => {
                self.cancel_outgoing(tenant, id, actor, reason)?;
                Ok(RemittanceKind::Outgoing)
            }
            RemittanceKind::Incoming => {
                self.cancel_incoming(tenant, id, actor, reason)?;
                Ok(RemittanceKind::Incoming)
            }
        }
    }

    pub fn cancel_outgoing(
        &self,
        tenant: TenantId,
        id: RemittanceId,
        actor: &str,
        reason: &str,
    ) -> Result<OutgoingRemittance> {
        require_present("actor", actor)?;
        require_present("reason", reason)?;

        self.with_retry("cancel", id, || {
            let row = self.store.outgoing_row(tenant, id)?;
            let mut record = row.write_within(self.config.lock_timeout, "cancel", id)?;

            if record.status != OutgoingStatus::Pending || !record.settled_amount.is_zero() {
                return Err(SettlementError::invalid_state(
                    RemittanceKind::Outgoing.entity(),
                    id,
                    record.status,
                    "cancel",
                ));
            }

            let now = self.clock.now();
            let deposit = record
                .received_amount
                .checked_add(record.fee)
                .ok_or_else(|| SettlementError::arithmetic_overflow("cancel", id))?;

            let mut reversals = Vec::with_capacity(2);
            if !deposit.is_zero() {
                reversals.push(PendingEntry::new(
                    self.home_key(tenant, record.branch),
                    -deposit,
                    LedgerEntryKind::Reversal,
                    Some(EntrySource::Remittance(id)),
                    format!("reverse deposit of cancelled outgoing {}", record.reference),
                ));
            }
            reversals.push(PendingEntry::new(
                BalanceKey::new(tenant, record.branch, record.currency.clone()),
                record.amount,
                LedgerEntryKind::Reversal,
                Some(EntrySource::Remittance(id)),
                format!("reverse debt of cancelled outgoing {}", record.reference),
            ));
            self.ledger.post(reversals, now)?;

            record.status = OutgoingStatus::Cancelled;
            record.cancelled_by = Some(actor.to_string());
            record.cancelled_at = Some(now);
            record.cancellation_reason = Some(reason.to_string());
            record.updated_at = now;

            self.audit.record(
                now,
                tenant,
                actor,
                AuditAction::Cancel,
                id,
                format!("outgoing {} cancelled: {}", record.reference, reason),
            );

            Ok(record.clone())
        })
    }

    pub fn cancel_incoming(
        &self,
        tenant: TenantId,
        id: RemittanceId,
        actor: &str,
        reason: &str,
    ) -> Result<IncomingRemittance> {
        require_present("actor", actor)?;
        require_present("reason", reason)?;

        self.with_retry("cancel", id, || {
            let row = self.store.incoming_row(tenant, id)?;
            let mut record = row.write_within(self.config.lock_timeout, "cancel", id)?;

            if record.status != IncomingStatus::Pending || !record.allocated_amount.is_zero() {
                return Err(SettlementError::invalid_state(
                    RemittanceKind::Incoming.entity(),
                    id,
                    record.status,
                    "cancel",
                ));
            }

            let now = self.clock.now();
            self.ledger.post(
                vec![PendingEntry::new(
                    BalanceKey::new(tenant, record.branch, record.currency.clone()),
                    -record.amount,
                    LedgerEntryKind::Reversal,
                    Some(EntrySource::Remittance(id)),
                    format!("reverse funds of cancelled incoming {}", record.reference),
                )],
                now,
            )?;

            record.status = IncomingStatus::Cancelled;
            record.cancelled_by = Some(actor.to_string());
            record.cancelled_at = Some(now);
            record.cancellation_reason = Some(reason.to_string());
            record.updated_at = now;

            self.audit.record(
                now,
                tenant,
                actor,
                AuditAction::Cancel,
                id,
                format!("incoming {} cancelled: {}", record.reference, reason),
            );

            Ok(record.clone())
        })
    }

    /// Mark a fully allocated incoming remittance as paid out locally
    ///
    /// Posts `PAYOUT −(amount × payout_rate)` in the home currency.
    ///
    /// # Errors
    ///
    /// * `NotFound` - Id unknown to the tenant
    /// * `InvalidState` - The incoming is not COMPLETED
    pub fn record_payout(
        &self,
        tenant: TenantId,
        incoming_id: RemittanceId,
        actor: &str,
    ) -> Result<IncomingRemittance> {
        require_present("actor", actor)?;

        self.with_retry("payout", incoming_id, || {
            let row = self.store.incoming_row(tenant, incoming_id)?;
            let mut record = row.write_within(self.config.lock_timeout, "payout", incoming_id)?;

            if record.status != IncomingStatus::Completed {
                return Err(SettlementError::invalid_state(
                    RemittanceKind::Incoming.entity(),
                    incoming_id,
                    record.status,
                    "pay out",
                ));
            }

            let value = record
                .payout_value()
                .ok_or_else(|| SettlementError::arithmetic_overflow("payout", incoming_id))?;
            let now = self.clock.now();

            self.ledger.post(
                vec![PendingEntry::new(
                    self.home_key(tenant, record.branch),
                    -value,
                    LedgerEntryKind::Payout,
                    Some(EntrySource::Remittance(incoming_id)),
                    format!("payout of incoming {} to {}", record.reference, record.recipient_name),
                )],
                now,
            )?;

            record.status = IncomingStatus::Paid;
            record.paid_by = Some(actor.to_string());
            record.paid_at = Some(now);
            record.updated_at = now;

            self.audit.record(
                now,
                tenant,
                actor,
                AuditAction::Payout,
                incoming_id,
                format!(
                    "incoming {} paid out: {} {}",
                    record.reference, value, self.config.home_currency
                ),
            );

            Ok(record.clone())
        })
    }

    // ------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------

    /// Post an operator adjustment to a cash balance
    ///
    /// # Errors
    ///
    /// * `ValidationError` - Zero amount, or missing memo/actor
    pub fn record_manual_entry(
        &self,
        tenant: TenantId,
        branch: BranchId,
        currency: Currency,
        amount: Decimal,
        actor: &str,
        memo: &str,
    ) -> Result<LedgerEntry> {
        if amount.is_zero() {
            return Err(SettlementError::validation("amount", "must not be zero"));
        }
        require_present("actor", actor)?;
        require_present("memo", memo)?;

        let now = self.clock.now();
        let key = BalanceKey::new(tenant, branch, currency);
        let mut posted = self.ledger.post(
            vec![PendingEntry::new(
                key.clone(),
                amount,
                LedgerEntryKind::Manual,
                None,
                memo,
            )],
            now,
        )?;
        let entry = posted
            .pop()
            .ok_or_else(|| SettlementError::internal("manual entry was not posted"))?;

        self.audit.record(
            now,
            tenant,
            actor,
            AuditAction::ManualEntry,
            entry.id,
            format!("manual entry {} on {}: {}", amount, key, memo),
        );

        Ok(entry)
    }

    /// Cached cash balance; zero when nothing was posted to the key
    pub fn cash_balance(&self, key: &BalanceKey) -> Decimal {
        self.ledger.balance(key)
    }

    pub fn balances(&self, tenant: TenantId) -> Vec<CashBalance> {
        self.ledger.balances_for_tenant(tenant)
    }

    pub fn all_balances(&self) -> Vec<CashBalance> {
        self.ledger.all_balances()
    }

    pub fn ledger_entries(&self, key: &BalanceKey) -> Vec<LedgerEntry> {
        self.ledger.entries_for(key)
    }

    /// Recompute one cached balance from its entries, reporting any drift
    pub fn refresh_balance(&self, key: &BalanceKey) -> Result<BalanceRefresh> {
        self.ledger.refresh_balance(key)
    }

    /// Recompute every cached balance of a tenant
    pub fn refresh_all(&self, tenant: TenantId) -> Result<Vec<BalanceRefresh>> {
        self.ledger.refresh_all(tenant)
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn get_outgoing(&self, tenant: TenantId, id: RemittanceId) -> Result<OutgoingRemittance> {
        self.store.get_outgoing(tenant, id)
    }

    pub fn get_incoming(&self, tenant: TenantId, id: RemittanceId) -> Result<IncomingRemittance> {
        self.store.get_incoming(tenant, id)
    }

    /// Resolve a caller reference to its register and id
    pub fn find_by_reference(
        &self,
        tenant: TenantId,
        reference: &str,
    ) -> Result<(RemittanceKind, RemittanceId)> {
        self.store
            .find_by_reference(tenant, reference)
            .ok_or_else(|| SettlementError::not_found("remittance", reference, tenant))
    }

    pub fn outgoing_for_tenant(&self, tenant: TenantId) -> Vec<OutgoingRemittance> {
        self.store.outgoing_for_tenant(tenant)
    }

    pub fn incoming_for_tenant(&self, tenant: TenantId) -> Vec<IncomingRemittance> {
        self.store.incoming_for_tenant(tenant)
    }

    pub fn settlements_for_outgoing(&self, outgoing_id: RemittanceId) -> Vec<Settlement> {
        self.book.for_outgoing(outgoing_id)
    }

    pub fn settlements_for_incoming(&self, incoming_id: RemittanceId) -> Vec<Settlement> {
        self.book.for_incoming(incoming_id)
    }

    pub fn settlements_for_tenant(&self, tenant: TenantId) -> Vec<Settlement> {
        self.book.for_tenant(tenant)
    }

    pub fn audit_trail(&self, tenant: TenantId) -> Vec<AuditEntry> {
        self.audit.for_tenant(tenant)
    }

    /// Every tenant with at least one remittance, ascending
    pub fn tenants(&self) -> Vec<TenantId> {
        self.store.tenants()
    }

    fn home_key(&self, tenant: TenantId, branch: BranchId) -> BalanceKey {
        BalanceKey::new(tenant, branch, self.config.home_currency.clone())
    }
}

impl Default for SettlementEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
