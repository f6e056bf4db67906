//! Read-only reports: unsettled summary and consistency verification

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::core::engine::SettlementEngine;
use crate::types::{
    AgingBucket, ConsistencyReport, IncomingStatus, OutgoingStatus, RegisterSummary, Result,
    SettlementError, StatusBucket, TenantId, UnsettledSummary,
};

/// Aging bucket bounds in whole days: (label, min, max inclusive)
const AGING_BUCKETS: [(&str, i64, Option<i64>); 4] = [
    ("0-7", 0, Some(7)),
    ("8-30", 8, Some(30)),
    ("31-90", 31, Some(90)),
    ("90+", 91, None),
];

/// Figures of one record that the summary needs
struct Line {
    status: &'static str,
    open: bool,
    amount: Decimal,
    remaining: Decimal,
    created_at: DateTime<Utc>,
}

/// Sum with overflow reported as an internal error naming `what`
fn checked_total(values: impl IntoIterator<Item = Decimal>, what: &str) -> Result<Decimal> {
    values.into_iter().try_fold(Decimal::ZERO, |sum, value| {
        sum.checked_add(value)
            .ok_or_else(|| SettlementError::internal(format!("overflow summing {}", what)))
    })
}

fn summarize(
    lines: &[Line],
    statuses: &[&'static str],
    as_of: DateTime<Utc>,
) -> Result<RegisterSummary> {
    let by_status = statuses
        .iter()
        .map(|status| -> Result<StatusBucket> {
            let matching = lines.iter().filter(|line| line.status == *status);
            Ok(StatusBucket {
                status: status.to_string(),
                count: matching.clone().count(),
                amount: checked_total(matching.clone().map(|line| line.amount), "status amounts")?,
                remaining: checked_total(matching.map(|line| line.remaining), "status remaining")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut aging: Vec<AgingBucket> = AGING_BUCKETS
        .iter()
        .map(|(label, min_days, max_days)| AgingBucket {
            label: label.to_string(),
            min_days: *min_days,
            max_days: *max_days,
            count: 0,
            remaining: Decimal::ZERO,
        })
        .collect();

    let open: Vec<&Line> = lines.iter().filter(|line| line.open).collect();
    let total_remaining = checked_total(open.iter().map(|line| line.remaining), "open remaining")?;

    for line in &open {
        // Records dated after `as_of` count as brand new
        let age_days = (as_of - line.created_at).num_days().max(0);
        if let Some(bucket) = aging.iter_mut().find(|bucket| bucket.contains(age_days)) {
            bucket.count += 1;
            bucket.remaining = bucket.remaining.checked_add(line.remaining).ok_or_else(|| {
                SettlementError::internal(format!("overflow summing aging bucket {}", bucket.label))
            })?;
        }
    }

    Ok(RegisterSummary {
        by_status,
        aging,
        open_count: open.len(),
        total_remaining,
    })
}

impl SettlementEngine {
    /// Status and aging breakdown of a tenant's remittances
    ///
    /// Open records are PENDING or PARTIAL; their age is measured in whole days
    /// from `created_at` to `as_of`. Realized profit sums the tenant's settlements.
    /// Totals that overflow `Decimal` fail with `Internal`.
    pub fn unsettled_summary(
        &self,
        tenant: TenantId,
        as_of: DateTime<Utc>,
    ) -> Result<UnsettledSummary> {
        let outgoing: Vec<Line> = self
            .store
            .outgoing_for_tenant(tenant)
            .into_iter()
            .map(|record| Line {
                status: record.status.as_str(),
                open: matches!(record.status, OutgoingStatus::Pending | OutgoingStatus::Partial),
                amount: record.amount,
                remaining: record.remaining_amount,
                created_at: record.created_at,
            })
            .collect();

        let incoming: Vec<Line> = self
            .store
            .incoming_for_tenant(tenant)
            .into_iter()
            .map(|record| Line {
                status: record.status.as_str(),
                open: matches!(record.status, IncomingStatus::Pending | IncomingStatus::Partial),
                amount: record.amount,
                remaining: record.remaining_amount,
                created_at: record.created_at,
            })
            .collect();

        let settlements = self.book.for_tenant(tenant);

        Ok(UnsettledSummary {
            tenant,
            as_of,
            outgoing: summarize(
                &outgoing,
                &[
                    OutgoingStatus::Pending.as_str(),
                    OutgoingStatus::Partial.as_str(),
                    OutgoingStatus::Completed.as_str(),
                    OutgoingStatus::Cancelled.as_str(),
                ],
                as_of,
            )?,
            incoming: summarize(
                &incoming,
                &[
                    IncomingStatus::Pending.as_str(),
                    IncomingStatus::Partial.as_str(),
                    IncomingStatus::Completed.as_str(),
                    IncomingStatus::Paid.as_str(),
                    IncomingStatus::Cancelled.as_str(),
                ],
                as_of,
            )?,
            settlement_count: settlements.len(),
            realized_profit: checked_total(settlements.iter().map(|s| s.profit), "realized profit")?,
        })
    }

    /// Check a tenant's records, settlements and cached balances
    ///
    /// Verifies for every remittance that `settled + remaining == amount`, that the
    /// status matches the figures, and that its settlements add up to its settled
    /// total; for every settlement that it is positive and did not exceed either
    /// side's remaining balance; and for every cached balance that it equals the
    /// sum of its entries. Nothing is repaired.
    ///
    /// Run it while the tenant is quiescent: concurrent settlements can be seen
    /// half-applied across the separate reads.
    pub fn verify_consistency(&self, tenant: TenantId) -> Result<ConsistencyReport> {
        let mut violations = Vec::new();

        let outgoing = self.store.outgoing_for_tenant(tenant);
        for record in &outgoing {
            violations.extend(record.invariant_violations());
            let settled = self.book.settled_total_for_outgoing(record.id);
            if settled != record.settled_amount {
                violations.push(format!(
                    "outgoing {}: settlements total {} but settled amount is {}",
                    record.id, settled, record.settled_amount
                ));
            }
        }

        let incoming = self.store.incoming_for_tenant(tenant);
        for record in &incoming {
            violations.extend(record.invariant_violations());
            let allocated = self.book.settled_total_for_incoming(record.id);
            if allocated != record.allocated_amount {
                violations.push(format!(
                    "incoming {}: settlements total {} but allocated amount is {}",
                    record.id, allocated, record.allocated_amount
                ));
            }
        }

        let settlements = self.book.for_tenant(tenant);
        for settlement in &settlements {
            if settlement.settled_amount <= Decimal::ZERO {
                violations.push(format!(
                    "settlement {}: non-positive amount {}",
                    settlement.id, settlement.settled_amount
                ));
            }
            if settlement.settled_amount > settlement.outgoing_remaining_before
                || settlement.settled_amount > settlement.incoming_remaining_before
            {
                violations.push(format!(
                    "settlement {}: amount {} exceeds remaining (outgoing {}, incoming {})",
                    settlement.id,
                    settlement.settled_amount,
                    settlement.outgoing_remaining_before,
                    settlement.incoming_remaining_before
                ));
            }
        }

        let balances = self.ledger.drift_report(tenant)?;
        let checked_balances = balances.len();
        let drifts: Vec<_> = balances
            .into_iter()
            .filter(|refresh| refresh.has_drift())
            .collect();

        let report = ConsistencyReport {
            tenant,
            checked_remittances: outgoing.len() + incoming.len(),
            checked_settlements: settlements.len(),
            checked_balances,
            violations,
            drifts,
        };

        if !report.is_consistent() {
            tracing::warn!(
                tenant,
                violations = report.violations.len(),
                drifts = report.drifts.len(),
                "consistency check failed"
            );
        }

        Ok(report)
    }
}
