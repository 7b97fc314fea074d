// Assertion engine: bonded claims, a single dispute, settlement by liveness
// expiry or by the escalation resolver's verdict.

use super::MarketEngine;
use crate::error::{MarketError, MarketResult};
use crate::events::MarketEvent;
use crate::ledger::BOND_ESCROW;
use crate::market_resolve::{
    dispute_split, outcome_hash, required_bond, Assertion, DisputeKey, Resolution,
};
use crate::registry::lock;
use serde::Serialize;
use tracing::info;

/// Outcome of `settle_assertion`
#[derive(Debug, Clone, Serialize)]
pub struct AssertionSettlement {
    pub assertion_id: u64,
    pub market_id: u64,
    pub disputed: bool,
    /// True when the asserter's claim stands
    pub resolution: bool,
    /// Account that receives the bonds
    pub winner: String,
    pub payout: u64,
    pub oracle_fee: u64,
    /// Market reward paid to the asserter, if the claim stood
    pub reward_paid: u64,
    /// Set when the market is now resolved
    pub market_resolution: Option<Resolution>,
}

impl MarketEngine {
    /// Bond a claim that `claim` is the market's outcome.
    ///
    /// The claim must name outcome A, outcome B or "Unresolvable". Only one
    /// assertion may be live per market; a false settlement frees the slot.
    pub fn assert_outcome(
        &self,
        caller: &str,
        market_id: u64,
        claim: &str,
    ) -> MarketResult<Assertion> {
        self.run("assert_outcome", || {
            let now = self.clock.now();
            let (default_fee, burned_pct, liveness) = {
                let config = self.config_read();
                (config.default_fee, config.burned_bond_percentage, config.min_liveness)
            };
            self.with_policy_check(|policy| {
                if policy.blocked() {
                    return Err(MarketError::AssertionsBlocked);
                }
                if !policy.allowed_to_assert(caller) {
                    return Err(MarketError::AsserterNotAllowed(caller.to_string()));
                }
                Ok(())
            })?;

            let record = self.market_record(market_id)?;
            let mut record = lock(&record);
            let market = &mut record.market;
            market.ensure_unresolved()?;
            if market.asserted_outcome_hash.is_some() {
                return Err(MarketError::MarketAlreadyAsserted(market_id));
            }
            let claim = claim.trim();
            if market.resolution_for_claim(claim).is_none() {
                return Err(MarketError::InvalidOutcome(format!(
                    "{:?} is neither {:?}, {:?} nor the void claim",
                    claim, market.outcome_a_label, market.outcome_b_label
                )));
            }
            let bond = required_bond(market.required_bond, default_fee, burned_pct)?;

            let mut ledger = lock(&self.ledger);
            ledger.ensure_transfer(caller, BOND_ESCROW, bond)?;

            let assertion_id = self.assertions.allocate_id();
            let assertion =
                Assertion::new(assertion_id, market_id, caller, claim, bond, liveness, now);
            ledger.transfer(
                caller,
                BOND_ESCROW,
                bond,
                &format!("asserter bond for assertion {}", assertion_id),
            )?;
            drop(ledger);

            market.asserted_outcome_hash = Some(outcome_hash(claim));
            self.assertions.insert(assertion_id, assertion.clone());

            self.emit(now, MarketEvent::AssertionMade {
                assertion_id,
                market_id,
                asserter: caller.to_string(),
                claim: claim.to_string(),
                bond,
                expires_at: assertion.expires_at,
            });
            Ok(assertion)
        })
    }

    /// Challenge a live assertion by posting a matching bond
    pub fn dispute(&self, caller: &str, assertion_id: u64) -> MarketResult<Assertion> {
        self.run("dispute", || {
            let now = self.clock.now();
            self.with_policy_check(|policy| {
                if policy.allowed_to_dispute(caller) {
                    Ok(())
                } else {
                    Err(MarketError::DisputerNotAllowed(caller.to_string()))
                }
            })?;

            let record = self.assertion_record(assertion_id)?;
            let mut assertion = lock(&record);
            assertion.ensure_disputable(now)?;

            let mut ledger = lock(&self.ledger);
            ledger.transfer(
                caller,
                BOND_ESCROW,
                assertion.bond,
                &format!("disputer bond for assertion {}", assertion_id),
            )?;
            drop(ledger);

            assertion.disputer = Some(caller.to_string());

            self.emit(now, MarketEvent::AssertionDisputed {
                assertion_id,
                market_id: assertion.market_id,
                disputer: caller.to_string(),
            });
            Ok(assertion.clone())
        })
    }

    /// Settle an assertion.
    ///
    /// Undisputed and expired: the claim stands and the asserter gets the
    /// bond back. Disputed: the recorded verdict decides; the oracle fee
    /// goes to the treasury and the rest of both bonds to the winner.
    ///
    /// A standing claim resolves the market and releases its reward; a
    /// rejected one clears the market so it can be asserted again.
    pub fn settle_assertion(
        &self,
        caller: &str,
        assertion_id: u64,
    ) -> MarketResult<AssertionSettlement> {
        self.run("settle_assertion", || {
            let now = self.clock.now();
            let (identifier, burned_pct, treasury) = {
                let config = self.config_read();
                (config.identifier.clone(), config.burned_bond_percentage, config.treasury.clone())
            };

            let assertion_lock = self.assertion_record(assertion_id)?;
            let market_id = lock(&assertion_lock).market_id;

            let record = self.market_record(market_id)?;
            let mut record = lock(&record);
            let mut assertion = lock(&assertion_lock);
            assertion.ensure_settleable(now)?;

            let (resolution, winner, payments, oracle_fee, payout) = match &assertion.disputer {
                None => {
                    let bond = assertion.bond;
                    let asserter = assertion.asserter.clone();
                    (true, asserter.clone(), vec![(asserter, bond)], 0, bond)
                }
                Some(disputer) => {
                    let ancillary = assertion.ancillary_data();
                    let key = DisputeKey::new(assertion.created_at, &identifier, &ancillary);
                    let verdict = self
                        .resolver
                        .get_verdict(&key)
                        .ok_or_else(|| MarketError::VerdictNotFound(key.to_string()))?;
                    let split = dispute_split(assertion.bond, burned_pct)?;
                    let winner =
                        if verdict { assertion.asserter.clone() } else { disputer.clone() };
                    let payments = vec![
                        (treasury.clone(), split.oracle_fee),
                        (winner.clone(), split.winner_amount),
                    ];
                    (verdict, winner, payments, split.oracle_fee, split.winner_amount)
                }
            };

            let market = &mut record.market;
            let mut payments = payments;
            let reward_paid = if resolution { market.reward } else { 0 };
            if reward_paid > 0 {
                payments.push((assertion.asserter.clone(), reward_paid));
            }

            lock(&self.ledger).disburse(
                BOND_ESCROW,
                &payments,
                &format!("settlement of assertion {}", assertion_id),
            )?;

            assertion.settled = true;
            assertion.settlement_resolution = resolution;
            let market_resolution = if resolution {
                market.resolved = true;
                market.resolved_at = Some(now);
                market.resolution()
            } else {
                market.asserted_outcome_hash = None;
                None
            };

            info!(
                assertion_id,
                market_id,
                disputed = assertion.disputer.is_some(),
                resolution,
                winner = %winner,
                settled_by = caller,
                "assertion settled"
            );
            self.emit(now, MarketEvent::AssertionSettled {
                assertion_id,
                market_id,
                disputed: assertion.disputer.is_some(),
                resolution,
                winner: winner.clone(),
                payout,
                oracle_fee,
            });
            if let Some(resolved_as) = market_resolution {
                self.emit(now, MarketEvent::MarketResolved {
                    market_id,
                    assertion_id,
                    resolution: resolved_as,
                    reward_paid,
                });
            }

            Ok(AssertionSettlement {
                assertion_id,
                market_id,
                disputed: assertion.disputer.is_some(),
                resolution,
                winner,
                payout,
                oracle_fee,
                reward_paid,
                market_resolution,
            })
        })
    }

    /// Key under which the escalation resolver stores this assertion's verdict
    pub fn dispute_key(&self, assertion_id: u64) -> MarketResult<DisputeKey> {
        let identifier = self.config_read().identifier.clone();
        let record = self.assertion_record(assertion_id)?;
        let assertion = lock(&record);
        Ok(DisputeKey::new(assertion.created_at, &identifier, &assertion.ancillary_data()))
    }

    /// Admin: record the escalation verdict for a disputed assertion
    pub fn record_verdict(
        &self,
        caller: &str,
        assertion_id: u64,
        verdict: bool,
        allow_override: bool,
    ) -> MarketResult<DisputeKey> {
        self.run("record_verdict", || {
            self.ensure_admin(caller)?;
            let identifier = self.config_read().identifier.clone();

            let record = self.assertion_record(assertion_id)?;
            let assertion = lock(&record);
            if assertion.settled {
                return Err(MarketError::AssertionAlreadySettled(assertion_id));
            }
            if assertion.disputer.is_none() {
                return Err(MarketError::AssertionNotDisputed(assertion_id));
            }
            let ancillary = assertion.ancillary_data();
            let key = DisputeKey::new(assertion.created_at, &identifier, &ancillary);
            self.resolver.record_verdict(&key, verdict, allow_override)?;
            drop(assertion);

            self.emit(
                self.clock.now(),
                MarketEvent::VerdictRecorded {
                    assertion_id,
                    dispute_key: key.to_string(),
                    verdict,
                },
            );
            Ok(key)
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
