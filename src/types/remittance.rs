//! Remittance register types
//!
//! This module defines the two parallel registers the engine nets against each
//! other: outgoing remittances (debts owed abroad) and incoming remittances
//! (funds collected abroad, awaiting local payout).
//!
//! # Balance Invariant
//!
//! For every remittance `settled + remaining == amount` holds at all times, and
//! the status is derived from those two figures. Only cancellation (with nothing
//! settled) and payout (of a fully allocated incoming) move a record outside the
//! derived status.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::currency::Currency;
use super::error::{Result, SettlementError};

/// Tenant identifier, resolved upstream
pub type TenantId = u32;

/// Branch identifier within a tenant
pub type BranchId = u32;

/// Remittance identifier
///
/// Outgoing and incoming remittances share one id sequence, so an id alone
/// identifies which register a record lives in.
pub type RemittanceId = u64;

/// Which register a remittance belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemittanceKind {
    Outgoing,
    Incoming,
}

impl RemittanceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemittanceKind::Outgoing => "outgoing",
            RemittanceKind::Incoming => "incoming",
        }
    }

    /// Entity name used in error messages
    pub fn entity(&self) -> &'static str {
        match self {
            RemittanceKind::Outgoing => "outgoing remittance",
            RemittanceKind::Incoming => "incoming remittance",
        }
    }
}

impl fmt::Display for RemittanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an outgoing remittance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutgoingStatus {
    /// Nothing settled yet
    Pending,
    /// Partially settled
    Partial,
    /// Fully settled (terminal)
    Completed,
    /// Cancelled before any settlement (terminal)
    Cancelled,
}

impl OutgoingStatus {
    /// Status implied by the settled/remaining figures
    pub fn derive(settled: Decimal, remaining: Decimal) -> Self {
        if remaining.is_zero() {
            OutgoingStatus::Completed
        } else if settled.is_zero() {
            OutgoingStatus::Pending
        } else {
            OutgoingStatus::Partial
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OutgoingStatus::Completed | OutgoingStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutgoingStatus::Pending => "PENDING",
            OutgoingStatus::Partial => "PARTIAL",
            OutgoingStatus::Completed => "COMPLETED",
            OutgoingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OutgoingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an incoming remittance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomingStatus {
    /// Nothing allocated yet
    Pending,
    /// Partially allocated
    Partial,
    /// Fully allocated, awaiting payout (terminal for settlement)
    Completed,
    /// Fully allocated and paid out to the local recipient (terminal)
    Paid,
    /// Cancelled before any allocation (terminal)
    Cancelled,
}

impl IncomingStatus {
    /// Status implied by the allocated/remaining figures
    pub fn derive(allocated: Decimal, remaining: Decimal) -> Self {
        if remaining.is_zero() {
            IncomingStatus::Completed
        } else if allocated.is_zero() {
            IncomingStatus::Pending
        } else {
            IncomingStatus::Partial
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IncomingStatus::Completed | IncomingStatus::Paid | IncomingStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IncomingStatus::Pending => "PENDING",
            IncomingStatus::Partial => "PARTIAL",
            IncomingStatus::Completed => "COMPLETED",
            IncomingStatus::Paid => "PAID",
            IncomingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for IncomingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A debt owed in a destination region
///
/// Created when a customer pays in locally to send money abroad. `amount` is the
/// face value in the debt currency; `received_amount` and `fee` are what the
/// customer paid in the home currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingRemittance {
    pub id: RemittanceId,
    pub tenant: TenantId,
    pub branch: BranchId,

    /// Caller reference, unique per tenant across both registers
    pub reference: String,
    pub sender_name: String,
    pub recipient_name: String,

    /// Debt currency
    pub currency: Currency,

    /// Face value in the debt currency
    pub amount: Decimal,

    /// Buy rate locked in at creation (home units per debt-currency unit)
    pub acquisition_rate: Decimal,

    /// Funding received from the customer, in the home currency
    pub received_amount: Decimal,
    pub fee: Decimal,

    pub settled_amount: Decimal,
    pub remaining_amount: Decimal,
    pub status: OutgoingStatus,

    /// Spread profit accumulated across settlements, in the home currency
    pub profit: Decimal,

    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_by: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

impl OutgoingRemittance {
    /// Whether the settlement primitive may still touch this record
    pub fn is_settleable(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Apply one settlement to this record with checked arithmetic
    ///
    /// Leaves the record untouched on error.
    pub(crate) fn apply_settlement(
        &mut self,
        amount: Decimal,
        profit: Decimal,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let settled = self
            .settled_amount
            .checked_add(amount)
            .ok_or_else(|| SettlementError::arithmetic_overflow("settle", self.id))?;
        let remaining = self
            .remaining_amount
            .checked_sub(amount)
            .ok_or_else(|| SettlementError::arithmetic_overflow("settle", self.id))?;
        let total_profit = self
            .profit
            .checked_add(profit)
            .ok_or_else(|| SettlementError::arithmetic_overflow("settle", self.id))?;

        self.settled_amount = settled;
        self.remaining_amount = remaining;
        self.profit = total_profit;
        self.status = OutgoingStatus::derive(settled, remaining);
        self.updated_at = at;
        Ok(())
    }

    /// Descriptions of every broken record-level invariant
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.settled_amount + self.remaining_amount != self.amount {
            violations.push(format!(
                "outgoing {}: settled {} + remaining {} != amount {}",
                self.id, self.settled_amount, self.remaining_amount, self.amount
            ));
        }
        if self.remaining_amount < Decimal::ZERO {
            violations.push(format!(
                "outgoing {}: negative remaining {}",
                self.id, self.remaining_amount
            ));
        }
        let expected = match self.status {
            OutgoingStatus::Cancelled if self.settled_amount.is_zero() => {
                OutgoingStatus::Cancelled
            }
            _ => OutgoingStatus::derive(self.settled_amount, self.remaining_amount),
        };
        if self.status != expected {
            violations.push(format!(
                "outgoing {}: status {} but figures imply {}",
                self.id, self.status, expected
            ));
        }
        violations
    }
}

/// Funds available locally, collected from abroad and awaiting payout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingRemittance {
    pub id: RemittanceId,
    pub tenant: TenantId,
    pub branch: BranchId,
    pub reference: String,
    pub sender_name: String,
    pub recipient_name: String,
    pub currency: Currency,
    pub amount: Decimal,

    /// Sell rate promised at creation (home units per debt-currency unit)
    pub payout_rate: Decimal,

    pub allocated_amount: Decimal,
    pub remaining_amount: Decimal,
    pub status: IncomingStatus,
    pub profit: Decimal,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_by: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

impl IncomingRemittance {
    pub fn is_settleable(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Whether this record belongs in the strategy selector's candidate set
    pub fn is_candidate(&self) -> bool {
        matches!(self.status, IncomingStatus::Pending | IncomingStatus::Partial)
            && self.remaining_amount > Decimal::ZERO
    }

    /// Home-currency value owed to the local recipient
    pub fn payout_value(&self) -> Option<Decimal> {
        self.amount.checked_mul(self.payout_rate)
    }

    pub(crate) fn apply_allocation(
        &mut self,
        amount: Decimal,
        profit: Decimal,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let allocated = self
            .allocated_amount
            .checked_add(amount)
            .ok_or_else(|| SettlementError::arithmetic_overflow("settle", self.id))?;
        let remaining = self
            .remaining_amount
            .checked_sub(amount)
            .ok_or_else(|| SettlementError::arithmetic_overflow("settle", self.id))?;
        let total_profit = self
            .profit
            .checked_add(profit)
            .ok_or_else(|| SettlementError::arithmetic_overflow("settle", self.id))?;

        self.allocated_amount = allocated;
        self.remaining_amount = remaining;
        self.profit = total_profit;
        self.status = IncomingStatus::derive(allocated, remaining);
        self.updated_at = at;
        Ok(())
    }

    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.allocated_amount + self.remaining_amount != self.amount {
            violations.push(format!(
                "incoming {}: allocated {} + remaining {} != amount {}",
                self.id, self.allocated_amount, self.remaining_amount, self.amount
            ));
        }
        if self.remaining_amount < Decimal::ZERO {
            violations.push(format!(
                "incoming {}: negative remaining {}",
                self.id, self.remaining_amount
            ));
        }
        let expected = match self.status {
            IncomingStatus::Cancelled if self.allocated_amount.is_zero() => {
                IncomingStatus::Cancelled
            }
            IncomingStatus::Paid if self.remaining_amount.is_zero() => IncomingStatus::Paid,
            _ => IncomingStatus::derive(self.allocated_amount, self.remaining_amount),
        };
        if self.status != expected {
            violations.push(format!(
                "incoming {}: status {} but figures imply {}",
                self.id, self.status, expected
            ));
        }
        violations
    }
}

/// Data required to open an outgoing remittance
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutgoing {
    pub branch: BranchId,
    pub reference: String,
    pub sender_name: String,
    pub recipient_name: String,
    pub currency: Currency,
    pub amount: Decimal,
    pub acquisition_rate: Decimal,
    pub received_amount: Decimal,
    pub fee: Decimal,

    /// Backdated creation time for imported records; the engine clock otherwise
    pub created_at: Option<DateTime<Utc>>,
}

impl NewOutgoing {
    pub fn validate(&self) -> Result<()> {
        validate_common(&self.reference, &self.sender_name, &self.recipient_name)?;
        require_positive("amount", self.amount)?;
        require_positive("acquisition_rate", self.acquisition_rate)?;
        require_non_negative("received_amount", self.received_amount)?;
        require_non_negative("fee", self.fee)?;
        Ok(())
    }
}

/// Data required to register an incoming remittance
#[derive(Debug, Clone, PartialEq)]
pub struct NewIncoming {
    pub branch: BranchId,
    pub reference: String,
    pub sender_name: String,
    pub recipient_name: String,
    pub currency: Currency,
    pub amount: Decimal,
    pub payout_rate: Decimal,
    pub created_at: Option<DateTime<Utc>>,
}

impl NewIncoming {
    pub fn validate(&self) -> Result<()> {
        validate_common(&self.reference, &self.sender_name, &self.recipient_name)?;
        require_positive("amount", self.amount)?;
        require_positive("payout_rate", self.payout_rate)?;
        Ok(())
    }
}

fn validate_common(reference: &str, sender: &str, recipient: &str) -> Result<()> {
    require_present("reference", reference)?;
    require_present("sender_name", sender)?;
    require_present("recipient_name", recipient)
}

pub(crate) fn require_present(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SettlementError::validation(field, "is required"));
    }
    Ok(())
}

pub(crate) fn require_positive(field: &str, value: Decimal) -> Result<()> {
    if value <= Decimal::ZERO {
        return Err(SettlementError::validation(
            field,
            format!("must be positive, got {}", value),
        ));
    }
    Ok(())
}

fn require_non_negative(field: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(SettlementError::validation(
            field,
            format!("must not be negative, got {}", value),
        ));
    }
    Ok(())
}
