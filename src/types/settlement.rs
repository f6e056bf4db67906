//! Settlement records, strategies, and auto-settle results

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::currency::Currency;
use super::error::SettlementError;
use super::remittance::{OutgoingStatus, RemittanceId, TenantId};

/// Settlement identifier
pub type SettlementId = u64;

/// Immutable record netting part of one outgoing debt against one incoming fund
///
/// Settlements are append-only: once created they are never updated or deleted.
/// Both rates are snapshots taken from the two remittances at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub tenant: TenantId,
    pub outgoing_id: RemittanceId,
    pub incoming_id: RemittanceId,
    pub currency: Currency,
    pub settled_amount: Decimal,
    pub acquisition_rate: Decimal,
    pub payout_rate: Decimal,

    /// Spread profit in the home currency
    pub profit: Decimal,

    /// Outgoing remaining balance just before this settlement
    pub outgoing_remaining_before: Decimal,

    /// Incoming remaining balance just before this settlement
    pub incoming_remaining_before: Decimal,

    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Spread profit of settling `amount` debt-currency units
///
/// `amount × payout_rate − amount × acquisition_rate`, in the home currency.
/// Returns `None` on arithmetic overflow.
pub fn spread_profit(
    amount: Decimal,
    acquisition_rate: Decimal,
    payout_rate: Decimal,
) -> Option<Decimal> {
    let revenue = amount.checked_mul(payout_rate)?;
    let cost = amount.checked_mul(acquisition_rate)?;
    revenue.checked_sub(cost)
}

/// Rule choosing which incoming funds satisfy an outgoing debt first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStrategy {
    /// Oldest incoming funds first
    Fifo,
    /// Newest incoming funds first
    Lifo,
    /// Most profitable payout rate first, oldest first among equals
    BestRate,
}

impl SettlementStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStrategy::Fifo => "FIFO",
            SettlementStrategy::Lifo => "LIFO",
            SettlementStrategy::BestRate => "BEST_RATE",
        }
    }
}

impl fmt::Display for SettlementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettlementStrategy {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fifo" => Ok(SettlementStrategy::Fifo),
            "lifo" => Ok(SettlementStrategy::Lifo),
            "best_rate" | "bestrate" => Ok(SettlementStrategy::BestRate),
            other => Err(SettlementError::validation(
                "strategy",
                format!("unknown strategy '{}' (expected fifo, lifo or best_rate)", other),
            )),
        }
    }
}

/// Advisory settlement proposal produced by the strategy selector
///
/// State may change before the suggestion is executed; the settlement primitive
/// re-validates everything at commit time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub incoming_id: RemittanceId,
    pub suggested_amount: Decimal,
    pub expected_profit: Decimal,
    pub payout_rate: Decimal,
    pub incoming_created_at: DateTime<Utc>,
}

/// Final classification of an auto-settle run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoSettleOutcome {
    /// The outgoing debt is fully settled
    AllSettled,
    /// Some debt was settled, some remains
    PartiallySettled,
    /// Nothing could be settled; a soft outcome, not an error
    NoFundsAvailable,
}

impl fmt::Display for AutoSettleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AutoSettleOutcome::AllSettled => "ALL_SETTLED",
            AutoSettleOutcome::PartiallySettled => "PARTIALLY_SETTLED",
            AutoSettleOutcome::NoFundsAvailable => "NO_FUNDS_AVAILABLE",
        };
        f.write_str(label)
    }
}

/// Why an auto-settle run passed over a suggested candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// Another settlement consumed the balance first
    LostRace,
    /// The incoming remittance became terminal (completed, paid, cancelled)
    IncomingUnavailable,
    /// The row lock could not be obtained within the retry budget
    Conflict,
}

/// A suggestion the orchestrator could not execute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedCandidate {
    pub incoming_id: RemittanceId,
    pub attempted_amount: Decimal,
    pub reason: SkipReason,
    pub detail: String,
}

/// Report returned by an auto-settle run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoSettleResult {
    pub outgoing_id: RemittanceId,
    pub strategy: SettlementStrategy,
    pub total_settled: Decimal,
    pub remaining_amount: Decimal,
    pub final_status: OutgoingStatus,
    pub settlements: Vec<Settlement>,
    pub skipped: Vec<SkippedCandidate>,
    pub outcome: AutoSettleOutcome,

    /// Number of suggestion passes performed
    pub rounds: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("fifo", SettlementStrategy::Fifo)]
    #[case("LIFO", SettlementStrategy::Lifo)]
    #[case("best_rate", SettlementStrategy::BestRate)]
    #[case("best-rate", SettlementStrategy::BestRate)]
    #[case("BEST_RATE", SettlementStrategy::BestRate)]
    fn test_strategy_parsing(#[case] input: &str, #[case] expected: SettlementStrategy) {
        assert_eq!(input.parse::<SettlementStrategy>().unwrap(), expected);
    }

    #[test]
    fn test_strategy_parsing_rejects_unknown() {
        assert!(matches!(
            "cheapest".parse::<SettlementStrategy>(),
            Err(SettlementError::ValidationError { .. })
        ));
    }

    #[rstest]
    #[case::positive_spread(700_000, 85_000, 86_000, 700_000_000)]
    #[case::negative_spread(300_000, 85_000, 84_000, -300_000_000)]
    #[case::flat(10, 5, 5, 0)]
    fn test_spread_profit(
        #[case] amount: i64,
        #[case] acquisition: i64,
        #[case] payout: i64,
        #[case] expected: i64,
    ) {
        let profit = spread_profit(
            Decimal::from(amount),
            Decimal::from(acquisition),
            Decimal::from(payout),
        )
        .unwrap();
        assert_eq!(profit, Decimal::from(expected));
    }

    #[test]
    fn test_spread_profit_keeps_fractional_precision() {
        let profit = spread_profit(
            Decimal::new(1, 1),
            Decimal::new(12345, 4),
            Decimal::new(12355, 4),
        )
        .unwrap();
        assert_eq!(profit, Decimal::new(1, 4));
    }
}
