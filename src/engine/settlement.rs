// Settlement engine: LP redemption into outcome shares, and outcome share
// redemption for collateral once the market is resolved.

use super::MarketEngine;
use crate::error::{MarketError, MarketResult};
use crate::events::MarketEvent;
use crate::ledger::market_escrow;
use crate::market_resolve::Resolution;
use crate::registry::lock;
use crate::shares::{apply_settlement, lp_redemption, settlement_payout};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RedemptionReceipt {
    pub market_id: u64,
    pub lp_burned: u128,
    pub issued_a: u128,
    pub issued_b: u128,
    pub resolution: Option<Resolution>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SettlementReceipt {
    pub market_id: u64,
    pub resolution: Resolution,
    pub burned_a: u128,
    pub burned_b: u128,
    pub payout: u64,
}

impl MarketEngine {
    /// Convert LP shares into outcome shares. Available before and after
    /// resolution; once a single winner is known only its side is issued.
    ///
    /// The reserves stay put to back the issued shares, so after resolution
    /// redeeming and then settling returns the LP's slice of the pool.
    pub fn redeem_lp_for_outcome_tokens(
        &self,
        caller: &str,
        market_id: u64,
        lp_amount: u128,
    ) -> MarketResult<RedemptionReceipt> {
        self.run("redeem_lp_for_outcome_tokens", || {
            let now = self.clock.now();
            let record = self.market_record(market_id)?;
            let mut record = lock(&record);
            let resolution = record.market.resolution();
            let market = &record.market;
            let (share_a, share_b) = (market.outcome_a_share_id, market.outcome_b_share_id);
            let pool = record.pool_mut()?;

            let redemption = lp_redemption(pool, lp_amount, resolution)?;

            let mut shares = lock(&self.shares);
            shares.ensure_balance(pool.lp_share_id, caller, lp_amount)?;
            shares.ensure_mint(share_a, caller, redemption.issued_a)?;
            shares.ensure_mint(share_b, caller, redemption.issued_b)?;

            shares.burn(pool.lp_share_id, caller, lp_amount)?;
            if redemption.issued_a > 0 {
                shares.mint(share_a, caller, redemption.issued_a)?;
            }
            if redemption.issued_b > 0 {
                shares.mint(share_b, caller, redemption.issued_b)?;
            }
            drop(shares);
            pool.apply_redemption(&redemption.slice)?;

            self.emit(now, MarketEvent::LpRedeemed {
                market_id,
                account: caller.to_string(),
                lp_burned: lp_amount,
                issued_a: redemption.issued_a,
                issued_b: redemption.issued_b,
            });
            Ok(RedemptionReceipt {
                market_id,
                lp_burned: lp_amount,
                issued_a: redemption.issued_a,
                issued_b: redemption.issued_b,
                resolution,
            })
        })
    }

    /// Redeem the caller's outcome shares for collateral.
    ///
    /// Holding no shares is not an error: the settlement is simply zero.
    pub fn settle_outcome_tokens(
        &self,
        caller: &str,
        market_id: u64,
    ) -> MarketResult<SettlementReceipt> {
        self.run("settle_outcome_tokens", || {
            let now = self.clock.now();
            let record = self.market_record(market_id)?;
            let mut record = lock(&record);
            let resolution =
                record.market.resolution().ok_or(MarketError::MarketNotResolved(market_id))?;
            let market = &record.market;
            let (share_a, share_b) = (market.outcome_a_share_id, market.outcome_b_share_id);
            let pool = record.pool_mut()?;

            let escrow = market_escrow(market_id);
            let mut ledger = lock(&self.ledger);
            let mut shares = lock(&self.shares);
            let balance_a = shares.balance_of(share_a, caller);
            let balance_b = shares.balance_of(share_b, caller);

            let settlement = settlement_payout(resolution, balance_a, balance_b, pool)?;
            let payout =
                u64::try_from(settlement.payout).map_err(|_| MarketError::ArithmeticOverflow)?;
            ledger.ensure_transfer(&escrow, caller, payout)?;

            shares.burn(share_a, caller, settlement.burn_a)?;
            shares.burn(share_b, caller, settlement.burn_b)?;
            if payout > 0 {
                ledger.transfer(
                    &escrow,
                    caller,
                    payout,
                    &format!("settlement of market {}", market_id),
                )?;
            }
            drop(shares);
            drop(ledger);

            apply_settlement(pool, &settlement);

            self.emit(now, MarketEvent::OutcomeTokensSettled {
                market_id,
                account: caller.to_string(),
                resolution,
                burned_a: settlement.burn_a,
                burned_b: settlement.burn_b,
                payout,
            });
            Ok(SettlementReceipt {
                market_id,
                resolution,
                burned_a: settlement.burn_a,
                burned_b: settlement.burn_b,
                payout,
            })
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
