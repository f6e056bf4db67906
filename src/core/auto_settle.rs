//! Auto-settle orchestration
//!
//! Drives the settlement primitive from strategy suggestions. Suggestions are
//! snapshots, so a suggestion can be stale by the time it runs; failures that
//! only mean "someone else got there first" skip the candidate and the run goes
//! on. When a pass skipped anything and debt remains, fresh suggestions are
//! generated, up to `auto_settle_max_rounds` passes.
//!
//! # Skip Rules
//!
//! | Error from `settle`                 | Treatment                    |
//! |-------------------------------------|------------------------------|
//! | `InsufficientFunds`                 | skip, `LostRace`             |
//! | `InvalidState` on the incoming side | skip, `IncomingUnavailable`  |
//! | `Conflict`                          | skip, `Conflict`             |
//! | `InvalidState` on the outgoing side | stop the run, report so far  |
//! | anything else                       | abort with the error         |

use rust_decimal::Decimal;

use crate::core::allocation::{allocate, AllocationItem};
use crate::core::engine::SettlementEngine;
use crate::types::{
    AutoSettleOutcome, AutoSettleResult, OutgoingStatus, RemittanceId, RemittanceKind, Result,
    Settlement, SettlementError, SettlementStrategy, SkipReason, SkippedCandidate, TenantId,
};

/// How a failed `settle` call affects a run
enum Disposition {
    Skip(SkipReason),
    Stop,
    Abort,
}

fn classify(error: &SettlementError, counterpart: RemittanceKind) -> Disposition {
    match error {
        SettlementError::InsufficientFunds { .. } => Disposition::Skip(SkipReason::LostRace),
        SettlementError::Conflict { .. } => Disposition::Skip(SkipReason::Conflict),
        SettlementError::InvalidState { entity, .. } if entity == counterpart.entity() => {
            Disposition::Skip(SkipReason::IncomingUnavailable)
        }
        SettlementError::InvalidState { .. } => Disposition::Stop,
        _ => Disposition::Abort,
    }
}

/// Outcome of a run from what it settled and where the debt ended up
///
/// A run that made no settlements reports `NoFundsAvailable` even when a
/// concurrent settlement completed the debt meanwhile.
fn run_outcome(settled_any: bool, status: OutgoingStatus) -> AutoSettleOutcome {
    if !settled_any {
        AutoSettleOutcome::NoFundsAvailable
    } else if status == OutgoingStatus::Completed {
        AutoSettleOutcome::AllSettled
    } else {
        AutoSettleOutcome::PartiallySettled
    }
}

impl SettlementEngine {
    /// Settle an outgoing debt from open incoming funds, best candidates first
    ///
    /// # Arguments
    ///
    /// * `tenant` - Tenant owning the debt
    /// * `outgoing_id` - Debt to settle
    /// * `actor` - User recorded on every settlement created
    /// * `strategy` - Candidate ordering
    ///
    /// # Returns
    ///
    /// * `Ok(AutoSettleResult)` - Settlements made, candidates skipped, and the outcome.
    ///   Finding nothing to settle is `NoFundsAvailable`, not an error.
    /// * `Err(NotFound)` - Outgoing unknown to the tenant
    /// * `Err(InvalidState)` - Outgoing already COMPLETED or CANCELLED
    /// * `Err(_)` - Any error that is not a lost race; settlements made before it stay
    pub fn auto_settle(
        &self,
        tenant: TenantId,
        outgoing_id: RemittanceId,
        actor: &str,
        strategy: SettlementStrategy,
    ) -> Result<AutoSettleResult> {
        let outgoing = self.store.get_outgoing(tenant, outgoing_id)?;
        if !outgoing.is_settleable() {
            return Err(SettlementError::invalid_state(
                RemittanceKind::Outgoing.entity(),
                outgoing_id,
                outgoing.status,
                "auto-settle",
            ));
        }

        let notes = format!("auto-settle {}", strategy);
        let mut settlements: Vec<Settlement> = Vec::new();
        let mut skipped: Vec<SkippedCandidate> = Vec::new();
        let mut rounds = 0;

        'rounds: while rounds < self.config.auto_settle_max_rounds {
            rounds += 1;

            let suggestions = self.suggest_settlements(
                tenant,
                outgoing_id,
                strategy,
                self.config.suggestion_limit,
            )?;
            if suggestions.is_empty() {
                break;
            }

            let mut skipped_this_round = false;
            for suggestion in suggestions {
                match self.settle(
                    tenant,
                    outgoing_id,
                    suggestion.incoming_id,
                    suggestion.suggested_amount,
                    actor,
                    Some(&notes),
                ) {
                    Ok(settlement) => settlements.push(settlement),
                    Err(e) => match classify(&e, RemittanceKind::Incoming) {
                        Disposition::Skip(reason) => {
                            tracing::warn!(
                                tenant,
                                outgoing = outgoing_id,
                                incoming = suggestion.incoming_id,
                                ?reason,
                                "auto-settle skipped candidate: {}",
                                e
                            );
                            skipped.push(SkippedCandidate {
                                incoming_id: suggestion.incoming_id,
                                attempted_amount: suggestion.suggested_amount,
                                reason,
                                detail: e.to_string(),
                            });
                            skipped_this_round = true;
                        }
                        Disposition::Stop => {
                            tracing::warn!(
                                tenant,
                                outgoing = outgoing_id,
                                "auto-settle stopped: {}",
                                e
                            );
                            break 'rounds;
                        }
                        Disposition::Abort => return Err(e),
                    },
                }
            }

            if !skipped_this_round {
                break;
            }
        }

        let current = self.store.get_outgoing(tenant, outgoing_id)?;
        let total_settled: Decimal = settlements.iter().map(|s| s.settled_amount).sum();

        let outcome = run_outcome(!settlements.is_empty(), current.status);

        tracing::info!(
            tenant,
            outgoing = outgoing_id,
            strategy = %strategy,
            total = %total_settled,
            settlements = settlements.len(),
            skipped = skipped.len(),
            rounds,
            outcome = %outcome,
            "auto-settle finished"
        );

        Ok(AutoSettleResult {
            outgoing_id,
            strategy,
            total_settled,
            remaining_amount: current.remaining_amount,
            final_status: current.status,
            settlements,
            skipped,
            outcome,
            rounds,
        })
    }

    /// Spread an incoming fund over the tenant's open debts in its currency
    ///
    /// Debts are ordered by `strategy` (for `BEST_RATE`, the debt with the lowest
    /// acquisition rate earns the widest spread and goes first) and each receives
    /// `min(fund left, debt remaining)`. Lost races are skipped with a warning.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Settlement>)` - Settlements created, possibly empty
    /// * `Err(NotFound)` - Incoming unknown to the tenant
    /// * `Err(InvalidState)` - Incoming not open for allocation
    pub fn distribute_incoming(
        &self,
        tenant: TenantId,
        incoming_id: RemittanceId,
        actor: &str,
        strategy: SettlementStrategy,
    ) -> Result<Vec<Settlement>> {
        let incoming = self.store.get_incoming(tenant, incoming_id)?;
        if !incoming.is_settleable() {
            return Err(SettlementError::invalid_state(
                RemittanceKind::Incoming.entity(),
                incoming_id,
                incoming.status,
                "distribute",
            ));
        }

        let items = self
            .store
            .outgoing_candidates(tenant, &incoming.currency)
            .into_iter()
            .map(|outgoing| AllocationItem {
                id: outgoing.id,
                remaining: outgoing.remaining_amount,
                created_at: outgoing.created_at,
                spread: incoming.payout_rate - outgoing.acquisition_rate,
            })
            .collect();

        let plan = allocate(
            incoming.remaining_amount,
            items,
            strategy,
            self.config.suggestion_limit,
        );

        let notes = format!("distribute {}", strategy);
        let mut settlements = Vec::with_capacity(plan.allocations.len());

        for allocation in plan.allocations {
            match self.settle(
                tenant,
                allocation.id,
                incoming_id,
                allocation.amount,
                actor,
                Some(&notes),
            ) {
                Ok(settlement) => settlements.push(settlement),
                Err(e) => match classify(&e, RemittanceKind::Outgoing) {
                    Disposition::Skip(_) => {
                        tracing::warn!(
                            tenant,
                            incoming = incoming_id,
                            outgoing = allocation.id,
                            "distribution skipped debt: {}",
                            e
                        );
                    }
                    Disposition::Stop => break,
                    Disposition::Abort => return Err(e),
                },
            }
        }

        Ok(settlements)
    }
}
