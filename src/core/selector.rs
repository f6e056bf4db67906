//! Strategy selector
//!
//! Pure, read-only ranking of incoming funds for one outgoing debt. The selector
//! works on snapshots and never locks or mutates anything; its output is advisory
//! and is re-validated by the settlement primitive when executed.

use crate::core::allocation::{allocate, AllocationItem};
use crate::types::{
    spread_profit, IncomingRemittance, OutgoingRemittance, RemittanceId, Result, SettlementError,
    SettlementStrategy, Suggestion,
};

/// Rank candidates for `outgoing` and greedily fill its remaining debt
///
/// Candidates outside the outgoing's tenant or currency, or not open for
/// allocation, are ignored. A terminal outgoing yields no suggestions.
///
/// # Arguments
///
/// * `outgoing` - Snapshot of the debt to cover
/// * `candidates` - Snapshots of incoming funds
/// * `strategy` - Ordering rule
/// * `limit` - Maximum number of suggestions, must be positive
///
/// # Returns
///
/// * `Ok(Vec<Suggestion>)` - In strategy order; amounts sum to at most the outgoing's remaining
/// * `Err(SettlementError::ValidationError)` - `limit` is zero
pub fn suggest(
    outgoing: &OutgoingRemittance,
    candidates: &[IncomingRemittance],
    strategy: SettlementStrategy,
    limit: usize,
) -> Result<Vec<Suggestion>> {
    if limit == 0 {
        return Err(SettlementError::validation("limit", "must be at least 1"));
    }
    if !outgoing.is_settleable() {
        return Ok(Vec::new());
    }

    let eligible: Vec<&IncomingRemittance> = candidates
        .iter()
        .filter(|incoming| {
            incoming.tenant == outgoing.tenant
                && incoming.currency == outgoing.currency
                && incoming.is_candidate()
        })
        .collect();

    let items = eligible
        .iter()
        .map(|incoming| AllocationItem {
            id: incoming.id,
            remaining: incoming.remaining_amount,
            created_at: incoming.created_at,
            spread: incoming.payout_rate - outgoing.acquisition_rate,
        })
        .collect();

    let plan = allocate(outgoing.remaining_amount, items, strategy, limit);

    plan.allocations
        .iter()
        .map(|allocation| {
            let incoming = find(&eligible, allocation.id)?;
            let expected_profit =
                spread_profit(allocation.amount, outgoing.acquisition_rate, incoming.payout_rate)
                    .ok_or_else(|| {
                        SettlementError::arithmetic_overflow("suggest_settlements", outgoing.id)
                    })?;

            Ok(Suggestion {
                incoming_id: incoming.id,
                suggested_amount: allocation.amount,
                expected_profit,
                payout_rate: incoming.payout_rate,
                incoming_created_at: incoming.created_at,
            })
        })
        .collect()
}

fn find<'a>(
    eligible: &[&'a IncomingRemittance],
    id: RemittanceId,
) -> Result<&'a IncomingRemittance> {
    eligible
        .iter()
        .copied()
        .find(|incoming| incoming.id == id)
        .ok_or_else(|| SettlementError::internal(format!("allocated unknown incoming {}", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Currency, IncomingStatus, OutgoingStatus};
    use rust_decimal::Decimal;
    use chrono::{Duration, TimeZone, Utc};
    use rstest::rstest;

    fn usd() -> Currency {
        Currency::new("USD").unwrap()
    }

    fn outgoing(amount: i64, rate: i64) -> OutgoingRemittance {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        OutgoingRemittance {
            id: 1,
            tenant: 1,
            branch: 1,
            reference: "O1".to_string(),
            sender_name: "S".to_string(),
            recipient_name: "R".to_string(),
            currency: usd(),
            amount: Decimal::from(amount),
            acquisition_rate: Decimal::from(rate),
            received_amount: Decimal::ZERO,
            fee: Decimal::ZERO,
            settled_amount: Decimal::ZERO,
            remaining_amount: Decimal::from(amount),
            status: OutgoingStatus::Pending,
            profit: Decimal::ZERO,
            created_by: "teller".to_string(),
            created_at: at,
            updated_at: at,
            cancelled_by: None,
            cancelled_at: None,
            cancellation_reason: None,
        }
    }

    fn incoming(id: RemittanceId, amount: i64, rate: i64, day: i64) -> IncomingRemittance {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day);
        IncomingRemittance {
            id,
            tenant: 1,
            branch: 1,
            reference: format!("I{}", id),
            sender_name: "S".to_string(),
            recipient_name: "R".to_string(),
            currency: usd(),
            amount: Decimal::from(amount),
            payout_rate: Decimal::from(rate),
            allocated_amount: Decimal::ZERO,
            remaining_amount: Decimal::from(amount),
            status: IncomingStatus::Pending,
            profit: Decimal::ZERO,
            created_by: "teller".to_string(),
            created_at: at,
            updated_at: at,
            paid_by: None,
            paid_at: None,
            cancelled_by: None,
            cancelled_at: None,
            cancellation_reason: None,
        }
    }

    #[test]
    fn test_best_rate_prefers_higher_payout() {
        let debt = outgoing(1_000_000, 85_000);
        let candidates = vec![
            incoming(2, 400_000, 84_000, 0),
            incoming(3, 700_000, 86_000, 1),
        ];

        let suggestions = suggest(&debt, &candidates, SettlementStrategy::BestRate, 10).unwrap();

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].incoming_id, 3);
        assert_eq!(suggestions[0].suggested_amount, Decimal::from(700_000));
        assert_eq!(suggestions[0].expected_profit, Decimal::from(700_000_000i64));
        assert_eq!(suggestions[1].incoming_id, 2);
        assert_eq!(suggestions[1].suggested_amount, Decimal::from(300_000));
        assert_eq!(suggestions[1].expected_profit, Decimal::from(-300_000_000i64));
    }

    #[rstest]
    #[case::fifo(SettlementStrategy::Fifo, vec![2, 3])]
    #[case::lifo(SettlementStrategy::Lifo, vec![3, 2])]
    fn test_time_ordered_strategies(
        #[case] strategy: SettlementStrategy,
        #[case] expected: Vec<RemittanceId>,
    ) {
        let debt = outgoing(100, 10);
        let candidates = vec![incoming(3, 60, 10, 5), incoming(2, 60, 10, 1)];

        let ids: Vec<RemittanceId> = suggest(&debt, &candidates, strategy, 10)
            .unwrap()
            .iter()
            .map(|s| s.incoming_id)
            .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_suggestions_never_exceed_remaining() {
        let debt = outgoing(100, 10);
        let candidates: Vec<IncomingRemittance> =
            (2..8).map(|id| incoming(id, 30, 11, id as i64)).collect();

        let suggestions = suggest(&debt, &candidates, SettlementStrategy::Fifo, 10).unwrap();
        let total: Decimal = suggestions.iter().map(|s| s.suggested_amount).sum();
        assert_eq!(total, Decimal::from(100));
        assert_eq!(suggestions.last().unwrap().suggested_amount, Decimal::from(10));
    }

    #[test]
    fn test_ineligible_candidates_are_ignored() {
        let debt = outgoing(100, 10);

        let mut other_currency = incoming(2, 50, 10, 0);
        other_currency.currency = Currency::new("EUR").unwrap();
        let mut other_tenant = incoming(3, 50, 10, 0);
        other_tenant.tenant = 2;
        let mut cancelled = incoming(4, 50, 10, 0);
        cancelled.status = IncomingStatus::Cancelled;
        let open = incoming(5, 50, 10, 0);

        let suggestions = suggest(
            &debt,
            &[other_currency, other_tenant, cancelled, open],
            SettlementStrategy::Fifo,
            10,
        )
        .unwrap();

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].incoming_id, 5);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let debt = outgoing(100, 10);
        assert!(matches!(
            suggest(&debt, &[], SettlementStrategy::Fifo, 0),
            Err(SettlementError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_terminal_outgoing_has_no_suggestions() {
        let mut debt = outgoing(100, 10);
        debt.status = OutgoingStatus::Cancelled;
        let candidates = vec![incoming(2, 50, 10, 0)];

        assert!(suggest(&debt, &candidates, SettlementStrategy::Fifo, 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_no_candidates_is_empty_not_error() {
        let debt = outgoing(100, 10);
        assert!(suggest(&debt, &[], SettlementStrategy::BestRate, 5)
            .unwrap()
            .is_empty());
    }
}
