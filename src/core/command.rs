//! Engine commands
//!
//! A `Command` is one engine operation addressed by caller references instead of
//! engine ids, as found in a journal. `SettlementEngine::execute` resolves the
//! references through the tenant's reference index and dispatches.

use rust_decimal::Decimal;

use crate::core::engine::SettlementEngine;
use crate::types::{
    AutoSettleResult, BranchId, Currency, EntryId, NewIncoming, NewOutgoing, RemittanceId,
    RemittanceKind, Result, Settlement, SettlementError, SettlementStrategy, TenantId,
};

/// One engine operation
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateOutgoing {
        tenant: TenantId,
        data: NewOutgoing,
        actor: String,
    },
    CreateIncoming {
        tenant: TenantId,
        data: NewIncoming,
        actor: String,
    },
    Settle {
        tenant: TenantId,
        outgoing_ref: String,
        incoming_ref: String,
        amount: Decimal,
        actor: String,
        notes: Option<String>,
    },
    AutoSettle {
        tenant: TenantId,
        outgoing_ref: String,
        /// Engine default when absent
        strategy: Option<SettlementStrategy>,
        actor: String,
    },
    Distribute {
        tenant: TenantId,
        incoming_ref: String,
        strategy: Option<SettlementStrategy>,
        actor: String,
    },
    Cancel {
        tenant: TenantId,
        reference: String,
        actor: String,
        reason: String,
    },
    Payout {
        tenant: TenantId,
        incoming_ref: String,
        actor: String,
    },
    ManualEntry {
        tenant: TenantId,
        branch: BranchId,
        currency: Currency,
        amount: Decimal,
        actor: String,
        memo: String,
    },
}

impl Command {
    /// Tenant the command acts on
    pub fn tenant(&self) -> TenantId {
        match self {
            Command::CreateOutgoing { tenant, .. }
            | Command::CreateIncoming { tenant, .. }
            | Command::Settle { tenant, .. }
            | Command::AutoSettle { tenant, .. }
            | Command::Distribute { tenant, .. }
            | Command::Cancel { tenant, .. }
            | Command::Payout { tenant, .. }
            | Command::ManualEntry { tenant, .. } => *tenant,
        }
    }

    /// Journal op name
    pub fn op(&self) -> &'static str {
        match self {
            Command::CreateOutgoing { .. } => "outgoing",
            Command::CreateIncoming { .. } => "incoming",
            Command::Settle { .. } => "settle",
            Command::AutoSettle { .. } => "auto_settle",
            Command::Distribute { .. } => "distribute",
            Command::Cancel { .. } => "cancel",
            Command::Payout { .. } => "payout",
            Command::ManualEntry { .. } => "entry",
        }
    }
}

/// What a successful command produced
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Created(RemittanceKind, RemittanceId),
    Settled(Settlement),
    AutoSettled(AutoSettleResult),
    Distributed(Vec<Settlement>),
    Cancelled(RemittanceKind, RemittanceId),
    PaidOut(RemittanceId),
    Posted(EntryId),
}

impl SettlementEngine {
    /// Execute one command
    ///
    /// # Errors
    ///
    /// * `NotFound` - A reference is unknown to the tenant
    /// * `ValidationError` - A reference names a remittance of the wrong register
    /// * Anything the underlying operation returns
    pub fn execute(&self, command: Command) -> Result<CommandOutcome> {
        match command {
            Command::CreateOutgoing {
                tenant,
                data,
                actor,
            } => {
                let record = self.create_outgoing(tenant, data, &actor)?;
                Ok(CommandOutcome::Created(RemittanceKind::Outgoing, record.id))
            }
            Command::CreateIncoming {
                tenant,
                data,
                actor,
            } => {
                let record = self.create_incoming(tenant, data, &actor)?;
                Ok(CommandOutcome::Created(RemittanceKind::Incoming, record.id))
            }
            Command::Settle {
                tenant,
                outgoing_ref,
                incoming_ref,
                amount,
                actor,
                notes,
            } => {
                let outgoing_id = self.resolve(tenant, &outgoing_ref, RemittanceKind::Outgoing)?;
                let incoming_id = self.resolve(tenant, &incoming_ref, RemittanceKind::Incoming)?;
                let settlement = self.settle(
                    tenant,
                    outgoing_id,
                    incoming_id,
                    amount,
                    &actor,
                    notes.as_deref(),
                )?;
                Ok(CommandOutcome::Settled(settlement))
            }
            Command::AutoSettle {
                tenant,
                outgoing_ref,
                strategy,
                actor,
            } => {
                let outgoing_id = self.resolve(tenant, &outgoing_ref, RemittanceKind::Outgoing)?;
                let strategy = strategy.unwrap_or(self.config.default_strategy);
                let result = self.auto_settle(tenant, outgoing_id, &actor, strategy)?;
                Ok(CommandOutcome::AutoSettled(result))
            }
            Command::Distribute {
                tenant,
                incoming_ref,
                strategy,
                actor,
            } => {
                let incoming_id = self.resolve(tenant, &incoming_ref, RemittanceKind::Incoming)?;
                let strategy = strategy.unwrap_or(self.config.default_strategy);
                let settlements = self.distribute_incoming(tenant, incoming_id, &actor, strategy)?;
                Ok(CommandOutcome::Distributed(settlements))
            }
            Command::Cancel {
                tenant,
                reference,
                actor,
                reason,
            } => {
                let (_, id) = self.find_by_reference(tenant, &reference)?;
                let kind = self.cancel(tenant, id, &actor, &reason)?;
                Ok(CommandOutcome::Cancelled(kind, id))
            }
            Command::Payout {
                tenant,
                incoming_ref,
                actor,
            } => {
                let incoming_id = self.resolve(tenant, &incoming_ref, RemittanceKind::Incoming)?;
                self.record_payout(tenant, incoming_id, &actor)?;
                Ok(CommandOutcome::PaidOut(incoming_id))
            }
            Command::ManualEntry {
                tenant,
                branch,
                currency,
                amount,
                actor,
                memo,
            } => {
                let entry =
                    self.record_manual_entry(tenant, branch, currency, amount, &actor, &memo)?;
                Ok(CommandOutcome::Posted(entry.id))
            }
        }
    }

    fn resolve(
        &self,
        tenant: TenantId,
        reference: &str,
        expected: RemittanceKind,
    ) -> Result<RemittanceId> {
        let (kind, id) = self.find_by_reference(tenant, reference)?;
        if kind != expected {
            return Err(SettlementError::validation(
                "reference",
                format!("'{}' is an {} remittance, expected {}", reference, kind, expected),
            ));
        }
        Ok(id)
    }
}
