//! Audit trail
//!
//! Every mutating engine operation appends exactly one `AuditEntry` and emits the
//! same information as a structured `tracing` event.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;

use crate::types::TenantId;

/// Kind of mutation recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateOutgoing,
    CreateIncoming,
    Settle,
    Cancel,
    Payout,
    ManualEntry,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateOutgoing => "CREATE_OUTGOING",
            AuditAction::CreateIncoming => "CREATE_INCOMING",
            AuditAction::Settle => "SETTLE",
            AuditAction::Cancel => "CANCEL",
            AuditAction::Payout => "PAYOUT",
            AuditAction::ManualEntry => "MANUAL_ENTRY",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub tenant: TenantId,
    pub actor: String,
    pub action: AuditAction,

    /// Remittance, settlement or ledger entry id the action produced or changed
    pub entity_id: u64,
    pub detail: String,
}

#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        at: DateTime<Utc>,
        tenant: TenantId,
        actor: &str,
        action: AuditAction,
        entity_id: u64,
        detail: impl Into<String>,
    ) {
        let entry = AuditEntry {
            at,
            tenant,
            actor: actor.to_string(),
            action,
            entity_id,
            detail: detail.into(),
        };

        tracing::info!(
            tenant = entry.tenant,
            actor = %entry.actor,
            action = %entry.action,
            entity = entry.entity_id,
            "{}",
            entry.detail
        );

        self.entries.lock().push(entry);
    }

    /// Audit entries of a tenant, oldest first
    pub fn for_tenant(&self, tenant: TenantId) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.tenant == tenant)
            .cloned()
            .collect()
    }
}
