//! CSV format handling for journal records and report output
//!
//! This module centralizes all CSV format concerns, providing:
//! - `JournalRecord` structure for deserialization
//! - Conversion from journal records to engine `Command`s
//! - Remittance-state and cash-balance output serialization
//!
//! All functions are pure (no file I/O) for easy testing.
//!
//! # Journal Columns
//!
//! `op,tenant,branch,ref,other_ref,sender,recipient,amount,rate,received,fee,currency,strategy,actor,note,at`
//!
//! | op            | uses                                                          |
//! |---------------|---------------------------------------------------------------|
//! | `outgoing`    | branch, ref, sender, recipient, amount, rate, received, fee, currency, at |
//! | `incoming`    | branch, ref, sender, recipient, amount, rate, currency, at    |
//! | `settle`      | ref (outgoing), other_ref (incoming), amount, note            |
//! | `auto_settle` | ref (outgoing), strategy                                      |
//! | `distribute`  | ref (incoming), strategy                                      |
//! | `cancel`      | ref, note (reason)                                            |
//! | `payout`      | ref (incoming)                                                |
//! | `entry`       | branch, currency, amount (signed), note (memo)                |
//!
//! `actor` defaults to `journal` when empty.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

use crate::core::command::Command;
use crate::types::{
    BranchId, CashBalance, Currency, IncomingRemittance, NewIncoming, NewOutgoing,
    OutgoingRemittance, Result, SettlementError, SettlementStrategy, TenantId,
};

/// Actor recorded when a journal row leaves `actor` empty
pub const DEFAULT_ACTOR: &str = "journal";

/// One journal row as it appears in the file
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct JournalRecord {
    pub op: String,
    pub tenant: TenantId,
    pub branch: Option<BranchId>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub other_ref: Option<String>,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub amount: Option<String>,
    pub rate: Option<String>,
    pub received: Option<String>,
    pub fee: Option<String>,
    pub currency: Option<String>,
    pub strategy: Option<String>,
    pub actor: Option<String>,
    pub note: Option<String>,
    pub at: Option<String>,
}

/// Convert a journal row into an engine command
///
/// # Arguments
///
/// * `record` - The deserialized journal row
///
/// # Returns
///
/// * `Ok(Command)` - The command the row describes
/// * `Err(SettlementError::ValidationError)` - Unknown op, or a field the op needs is missing or malformed
pub fn convert_journal_record(record: JournalRecord) -> Result<Command> {
    let tenant = record.tenant;
    let actor = present(record.actor).unwrap_or_else(|| DEFAULT_ACTOR.to_string());

    match record.op.trim().to_ascii_lowercase().as_str() {
        "outgoing" => Ok(Command::CreateOutgoing {
            tenant,
            data: NewOutgoing {
                branch: required("branch", record.branch)?,
                reference: required("ref", present(record.reference))?,
                sender_name: required("sender", present(record.sender))?,
                recipient_name: required("recipient", present(record.recipient))?,
                currency: currency(record.currency)?,
                amount: required("amount", decimal("amount", record.amount)?)?,
                acquisition_rate: required("rate", decimal("rate", record.rate)?)?,
                received_amount: decimal("received", record.received)?.unwrap_or_default(),
                fee: decimal("fee", record.fee)?.unwrap_or_default(),
                created_at: timestamp(record.at)?,
            },
            actor,
        }),
        "incoming" => Ok(Command::CreateIncoming {
            tenant,
            data: NewIncoming {
                branch: required("branch", record.branch)?,
                reference: required("ref", present(record.reference))?,
                sender_name: required("sender", present(record.sender))?,
                recipient_name: required("recipient", present(record.recipient))?,
                currency: currency(record.currency)?,
                amount: required("amount", decimal("amount", record.amount)?)?,
                payout_rate: required("rate", decimal("rate", record.rate)?)?,
                created_at: timestamp(record.at)?,
            },
            actor,
        }),
        "settle" => Ok(Command::Settle {
            tenant,
            outgoing_ref: required("ref", present(record.reference))?,
            incoming_ref: required("other_ref", present(record.other_ref))?,
            amount: required("amount", decimal("amount", record.amount)?)?,
            actor,
            notes: present(record.note),
        }),
        "auto_settle" | "auto-settle" => Ok(Command::AutoSettle {
            tenant,
            outgoing_ref: required("ref", present(record.reference))?,
            strategy: strategy(record.strategy)?,
            actor,
        }),
        "distribute" => Ok(Command::Distribute {
            tenant,
            incoming_ref: required("ref", present(record.reference))?,
            strategy: strategy(record.strategy)?,
            actor,
        }),
        "cancel" => Ok(Command::Cancel {
            tenant,
            reference: required("ref", present(record.reference))?,
            actor,
            reason: required("note", present(record.note))?,
        }),
        "payout" => Ok(Command::Payout {
            tenant,
            incoming_ref: required("ref", present(record.reference))?,
            actor,
        }),
        "entry" => Ok(Command::ManualEntry {
            tenant,
            branch: required("branch", record.branch)?,
            currency: currency(record.currency)?,
            amount: required("amount", decimal("amount", record.amount)?)?,
            actor,
            memo: required("note", present(record.note))?,
        }),
        other => Err(SettlementError::validation(
            "op",
            format!("unknown journal op '{}'", other),
        )),
    }
}

/// Trimmed value, `None` when absent or blank
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<T>(field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| SettlementError::validation(field, "is required for this op"))
}

fn decimal(field: &str, value: Option<String>) -> Result<Option<Decimal>> {
    present(value)
        .map(|raw| {
            Decimal::from_str(&raw).map_err(|_| {
                SettlementError::validation(field, format!("'{}' is not a decimal number", raw))
            })
        })
        .transpose()
}

fn currency(value: Option<String>) -> Result<Currency> {
    Currency::new(&required("currency", present(value))?)
}

fn strategy(value: Option<String>) -> Result<Option<SettlementStrategy>> {
    present(value).map(|raw| raw.parse()).transpose()
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` date taken as midnight UTC
fn timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    present(value)
        .map(|raw| {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
                return Ok(parsed.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
                .ok_or_else(|| {
                    SettlementError::validation("at", format!("'{}' is not a timestamp", raw))
                })
        })
        .transpose()
}

fn write_error(e: impl std::fmt::Display) -> SettlementError {
    SettlementError::IoError {
        message: format!("Failed to write output: {}", e),
    }
}

/// Write remittance states to CSV
///
/// Columns: `kind,tenant,branch,ref,currency,amount,rate,settled,remaining,status,profit`.
/// Rows are sorted by tenant, then id. For incoming rows `rate` is the payout
/// rate and `settled` the allocated amount.
pub fn write_remittances_csv(
    outgoing: &[OutgoingRemittance],
    incoming: &[IncomingRemittance],
    output: &mut dyn Write,
) -> Result<()> {
    let mut rows: Vec<(TenantId, u64, [String; 11])> = Vec::new();

    for record in outgoing {
        rows.push((
            record.tenant,
            record.id,
            [
                "outgoing".to_string(),
                record.tenant.to_string(),
                record.branch.to_string(),
                record.reference.clone(),
                record.currency.to_string(),
                record.amount.normalize().to_string(),
                record.acquisition_rate.normalize().to_string(),
                record.settled_amount.normalize().to_string(),
                record.remaining_amount.normalize().to_string(),
                record.status.to_string(),
                record.profit.normalize().to_string(),
            ],
        ));
    }
    for record in incoming {
        rows.push((
            record.tenant,
            record.id,
            [
                "incoming".to_string(),
                record.tenant.to_string(),
                record.branch.to_string(),
                record.reference.clone(),
                record.currency.to_string(),
                record.amount.normalize().to_string(),
                record.payout_rate.normalize().to_string(),
                record.allocated_amount.normalize().to_string(),
                record.remaining_amount.normalize().to_string(),
                record.status.to_string(),
                record.profit.normalize().to_string(),
            ],
        ));
    }
    rows.sort_by_key(|(tenant, id, _)| (*tenant, *id));

    let mut writer = csv::Writer::from_writer(output);
    writer
        .write_record([
            "kind", "tenant", "branch", "ref", "currency", "amount", "rate", "settled",
            "remaining", "status", "profit",
        ])
        .map_err(write_error)?;

    for (_, _, row) in rows {
        writer.write_record(&row).map_err(write_error)?;
    }

    writer.flush().map_err(write_error)?;
    Ok(())
}

/// Write cash balances to CSV
///
/// Columns: `tenant,branch,currency,balance,entries`, sorted by key.
pub fn write_balances_csv(balances: &[CashBalance], output: &mut dyn Write) -> Result<()> {
    let mut sorted = balances.to_vec();
    sorted.sort_by(|a, b| a.key.cmp(&b.key));

    let mut writer = csv::Writer::from_writer(output);
    writer
        .write_record(["tenant", "branch", "currency", "balance", "entries"])
        .map_err(write_error)?;

    for balance in sorted {
        writer
            .write_record(&[
                balance.key.tenant.to_string(),
                balance.key.branch.to_string(),
                balance.key.currency.to_string(),
                balance.balance.normalize().to_string(),
                balance.entry_count.to_string(),
            ])
            .map_err(write_error)?;
    }

    writer.flush().map_err(write_error)?;
    Ok(())
}
