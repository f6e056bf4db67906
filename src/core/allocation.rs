//! Greedy payment allocation
//!
//! Spreads an amount over a list of open items, in strategy order, giving each
//! item `min(left to allocate, item remaining)`. The strategy selector uses it to
//! turn an outgoing debt into settlement suggestions, and batch payments use it
//! to spread one payment over several open remittances.
//!
//! # Ordering
//!
//! - `FIFO`: oldest `created_at` first, lower id first among equals
//! - `LIFO`: newest `created_at` first, lower id first among equals
//! - `BEST_RATE`: highest rate spread first, then FIFO
//!
//! The ordering is total, so the same inputs always produce the same allocation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::cmp::Ordering;

use crate::types::{RemittanceId, SettlementStrategy};

/// An open item that can absorb part of an amount
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationItem {
    pub id: RemittanceId,
    pub remaining: Decimal,
    pub created_at: DateTime<Utc>,

    /// Rate spread used by `BEST_RATE`; higher is preferred
    pub spread: Decimal,
}

/// Portion of the amount given to one item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    pub id: RemittanceId,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationPlan {
    pub allocations: Vec<Allocation>,

    /// Amount that no item could absorb
    pub leftover: Decimal,
}

/// Sort items into strategy order
pub fn order_items(items: &mut [AllocationItem], strategy: SettlementStrategy) {
    items.sort_by(|a, b| compare(a, b, strategy));
}

fn compare(a: &AllocationItem, b: &AllocationItem, strategy: SettlementStrategy) -> Ordering {
    let fifo = a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id));
    match strategy {
        SettlementStrategy::Fifo => fifo,
        SettlementStrategy::Lifo => b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)),
        SettlementStrategy::BestRate => b.spread.cmp(&a.spread).then(fifo),
    }
}

/// Spread `amount` greedily over `items` in strategy order
///
/// Items with nothing remaining are skipped. At most `limit` allocations are
/// produced; whatever is not allocated is reported as `leftover`.
///
/// # Arguments
///
/// * `amount` - Amount to allocate; non-positive amounts allocate nothing
/// * `items` - Candidate items in any order
/// * `strategy` - Ordering rule
/// * `limit` - Maximum number of allocations
pub fn allocate(
    amount: Decimal,
    mut items: Vec<AllocationItem>,
    strategy: SettlementStrategy,
    limit: usize,
) -> AllocationPlan {
    order_items(&mut items, strategy);

    let mut left = amount.max(Decimal::ZERO);
    let mut allocations = Vec::new();

    for item in items {
        if left.is_zero() || allocations.len() >= limit {
            break;
        }
        if item.remaining <= Decimal::ZERO {
            continue;
        }

        let portion = left.min(item.remaining);
        allocations.push(Allocation {
            id: item.id,
            amount: portion,
        });
        left -= portion;
    }

    AllocationPlan {
        allocations,
        leftover: left,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn item(id: RemittanceId, remaining: i64, day: i64, spread: i64) -> AllocationItem {
        AllocationItem {
            id,
            remaining: Decimal::from(remaining),
            created_at: base() + Duration::days(day),
            spread: Decimal::from(spread),
        }
    }

    fn ids(plan: &AllocationPlan) -> Vec<RemittanceId> {
        plan.allocations.iter().map(|a| a.id).collect()
    }

    #[rstest]
    #[case::fifo(SettlementStrategy::Fifo, vec![1, 2, 3])]
    #[case::lifo(SettlementStrategy::Lifo, vec![3, 2, 1])]
    #[case::best_rate(SettlementStrategy::BestRate, vec![2, 3, 1])]
    fn test_strategy_order(#[case] strategy: SettlementStrategy, #[case] expected: Vec<u64>) {
        let items = vec![item(3, 10, 2, 50), item(1, 10, 0, -10), item(2, 10, 1, 100)];
        let plan = allocate(Decimal::from(30), items, strategy, 10);
        assert_eq!(ids(&plan), expected);
        assert_eq!(plan.leftover, Decimal::ZERO);
    }

    #[test]
    fn test_ties_break_on_id() {
        let items = vec![item(9, 10, 0, 5), item(4, 10, 0, 5)];

        for strategy in [
            SettlementStrategy::Fifo,
            SettlementStrategy::Lifo,
            SettlementStrategy::BestRate,
        ] {
            let plan = allocate(Decimal::from(20), items.clone(), strategy, 10);
            assert_eq!(ids(&plan), vec![4, 9], "strategy {}", strategy);
        }
    }

    #[test]
    fn test_last_allocation_is_clamped() {
        let items = vec![item(1, 400, 0, 0), item(2, 700, 1, 0)];
        let plan = allocate(Decimal::from(1000), items, SettlementStrategy::Fifo, 10);

        assert_eq!(plan.allocations[0].amount, Decimal::from(400));
        assert_eq!(plan.allocations[1].amount, Decimal::from(600));
        assert_eq!(plan.leftover, Decimal::ZERO);
    }

    #[test]
    fn test_leftover_when_items_run_out() {
        let items = vec![item(1, 40, 0, 0)];
        let plan = allocate(Decimal::from(100), items, SettlementStrategy::Fifo, 10);
        assert_eq!(plan.leftover, Decimal::from(60));
    }

    #[test]
    fn test_limit_caps_allocations() {
        let items = (1..=5).map(|id| item(id, 10, id as i64, 0)).collect();
        let plan = allocate(Decimal::from(50), items, SettlementStrategy::Fifo, 2);
        assert_eq!(ids(&plan), vec![1, 2]);
        assert_eq!(plan.leftover, Decimal::from(30));
    }

    #[test]
    fn test_exhausted_items_are_skipped() {
        let items = vec![item(1, 0, 0, 0), item(2, 5, 1, 0)];
        let plan = allocate(Decimal::from(5), items, SettlementStrategy::Fifo, 1);
        assert_eq!(ids(&plan), vec![2]);
    }
}
