// ============================================================================
// Share Redemption - Optimistic Prediction Market
// ============================================================================
//
// Redemption converts LP shares and outcome shares back into value.
//
// 1. LP REDEMPTION (anytime once the pool exists):
//    lp_amount / lp_supply of the LP-owned reserves is issued as outcome
//    shares. If the market resolved to a single winner, only the winning
//    side is issued; the losing claim is worthless. The reserves are left
//    in place to back the issued shares and the slice is marked redeemed.
//
// 2. OUTCOME SETTLEMENT (after resolution):
//    Winner:  payout = balance_winner / reserve_winner * (reserve_a + reserve_b)
//             and every A and B share the holder has is burned.
//    Void:    min(balance_a, balance_b) of each side is burned for
//             2 * min(balance_a, balance_b) collateral; the excess of the
//             majority side stays with the holder, unpaid.
//
// A settlement takes exactly its payout out of the reserves: the burned
// winning shares from the winning reserve, the rest from the losing one.
// That keeps total / winning reserve, the price of a winning share, fixed
// for every holder who settles later.
//
// ============================================================================

use crate::error::{MarketError, MarketResult};
use crate::market_resolve::markets::{Outcome, Resolution};
use crate::market_resolve::pool::{apply_ratio, scaled_ratio, LiquidityPool, WithdrawQuote};
use serde::Serialize;

/// What an LP redemption burns and issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LpRedemption {
    pub lp_burned: u128,
    /// Outcome A shares issued to the redeemer
    pub issued_a: u128,
    /// Outcome B shares issued to the redeemer
    pub issued_b: u128,
    /// Proportional slice of the LP-owned reserves, losing side included
    pub slice: WithdrawQuote,
}

/// Split an LP redemption according to the market's resolution state
pub fn lp_redemption(
    pool: &LiquidityPool,
    lp_amount: u128,
    resolution: Option<Resolution>,
) -> MarketResult<LpRedemption> {
    let slice = pool.quote_withdraw(lp_amount)?;
    let (issued_a, issued_b) = match resolution {
        Some(Resolution::OutcomeA) => (slice.out_a, 0),
        Some(Resolution::OutcomeB) => (0, slice.out_b),
        Some(Resolution::Unresolvable) | None => (slice.out_a, slice.out_b),
    };
    Ok(LpRedemption { lp_burned: lp_amount, issued_a, issued_b, slice })
}

/// What an outcome settlement burns and pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutcomeSettlement {
    pub resolution: Resolution,
    pub burn_a: u128,
    pub burn_b: u128,
    pub payout: u128,
}

/// Compute the settlement of a holder's outcome shares
pub fn settlement_payout(
    resolution: Resolution,
    balance_a: u128,
    balance_b: u128,
    pool: &LiquidityPool,
) -> MarketResult<OutcomeSettlement> {
    match resolution {
        Resolution::OutcomeA | Resolution::OutcomeB => {
            let (winning_balance, winning_reserve) = if resolution == Resolution::OutcomeA {
                (balance_a, pool.reserve_a)
            } else {
                (balance_b, pool.reserve_b)
            };
            let payout = winner_payout(winning_balance, winning_reserve, pool.total_reserves()?)?;
            Ok(OutcomeSettlement { resolution, burn_a: balance_a, burn_b: balance_b, payout })
        }
        Resolution::Unresolvable => {
            let pairs = balance_a.min(balance_b);
            let payout = pairs.checked_mul(2).ok_or(MarketError::ArithmeticOverflow)?;
            Ok(OutcomeSettlement { resolution, burn_a: pairs, burn_b: pairs, payout })
        }
    }
}

/// Take a settlement's payout out of the pool reserves
pub fn apply_settlement(pool: &mut LiquidityPool, settlement: &OutcomeSettlement) {
    match settlement.resolution.winner() {
        Some(outcome) => {
            let (burned, winning, losing) = match outcome {
                Outcome::A => (settlement.burn_a, &mut pool.reserve_a, &mut pool.reserve_b),
                Outcome::B => (settlement.burn_b, &mut pool.reserve_b, &mut pool.reserve_a),
            };
            *winning = winning.saturating_sub(burned);
            *losing = losing.saturating_sub(settlement.payout.saturating_sub(burned));
            match outcome {
                Outcome::A => pool.redeemed_a = pool.redeemed_a.saturating_sub(burned),
                Outcome::B => pool.redeemed_b = pool.redeemed_b.saturating_sub(burned),
            }
        }
        None => {
            pool.reserve_a = pool.reserve_a.saturating_sub(settlement.burn_a);
            pool.reserve_b = pool.reserve_b.saturating_sub(settlement.burn_b);
            pool.redeemed_a = pool.redeemed_a.saturating_sub(settlement.burn_a);
            pool.redeemed_b = pool.redeemed_b.saturating_sub(settlement.burn_b);
        }
    }
    pool.redeemed_a = pool.redeemed_a.min(pool.reserve_a);
    pool.redeemed_b = pool.redeemed_b.min(pool.reserve_b);
}

/// `balance / reserve * total`, in fixed point
pub fn winner_payout(balance: u128, reserve: u128, total: u128) -> MarketResult<u128> {
    if balance == 0 {
        return Ok(0);
    }
    if reserve == 0 {
        return Err(MarketError::InsufficientLiquidity("winning reserve is empty".into()));
    }
    apply_ratio(total, scaled_ratio(balance, reserve)?)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(a: u128, b: u128, supply: u128) -> LiquidityPool {
        LiquidityPool {
            market_id: 0,
            owner: "lp".into(),
            reserve_a: a,
            reserve_b: b,
            lp_supply: supply,
            lp_share_id: 3,
            redeemed_a: 0,
            redeemed_b: 0,
        }
    }

    #[test]
    fn test_winner_payout_example() {
        // 1000 A against reserve_a=2000, reserve_b=3000 -> 1000/2000 * 5000
        let settlement =
            settlement_payout(Resolution::OutcomeA, 1_000, 250, &pool(2_000, 3_000, 1)).unwrap();
        assert_eq!(settlement.payout, 2_500);
        assert_eq!(settlement.burn_a, 1_000);
        assert_eq!(settlement.burn_b, 250);
    }

    #[test]
    fn test_winner_ignores_losing_balance() {
        let p = pool(2_000, 3_000, 1);
        let without = settlement_payout(Resolution::OutcomeB, 0, 600, &p).unwrap();
        let with = settlement_payout(Resolution::OutcomeB, 99_999, 600, &p).unwrap();
        assert_eq!(without.payout, with.payout);
        assert_eq!(with.payout, 1_000);
    }

    #[test]
    fn test_void_pays_pairs_only() {
        let settlement =
            settlement_payout(Resolution::Unresolvable, 70, 30, &pool(10, 10, 1)).unwrap();
        assert_eq!(settlement.payout, 60);
        assert_eq!(settlement.burn_a, 30);
        assert_eq!(settlement.burn_b, 30);
    }

    #[test]
    fn test_zero_balance_settles_to_zero() {
        let settlement = settlement_payout(Resolution::OutcomeA, 0, 0, &pool(0, 0, 0)).unwrap();
        assert_eq!(settlement.payout, 0);
        assert_eq!(settlement.burn_a, 0);
    }

    #[test]
    fn test_empty_winning_reserve_rejected() {
        assert!(winner_payout(10, 0, 100).is_err());
    }

    #[test]
    fn test_lp_redemption_unresolved_issues_both() {
        let redemption = lp_redemption(&pool(2_000, 3_000, 2_500), 500, None).unwrap();
        assert_eq!(redemption.issued_a, 400);
        assert_eq!(redemption.issued_b, 600);
    }

    #[test]
    fn test_lp_redemption_resolved_issues_winner_only() {
        let redemption =
            lp_redemption(&pool(2_000, 3_000, 2_500), 500, Some(Resolution::OutcomeB)).unwrap();
        assert_eq!(redemption.issued_a, 0);
        assert_eq!(redemption.issued_b, 600);
        // The losing slice is consumed with it
        assert_eq!(redemption.slice.out_a, 400);
    }

    #[test]
    fn test_lp_redemption_void_issues_both() {
        let redemption =
            lp_redemption(&pool(2_000, 3_000, 2_500), 2_500, Some(Resolution::Unresolvable))
                .unwrap();
        assert_eq!(redemption.issued_a, 2_000);
        assert_eq!(redemption.issued_b, 3_000);
    }

    #[test]
    fn test_settlement_keeps_winning_share_price() {
        let mut p = pool(2_000, 3_000, 1);
        let first = settlement_payout(Resolution::OutcomeA, 1_000, 0, &p).unwrap();
        assert_eq!(first.payout, 2_500);
        apply_settlement(&mut p, &first);
        assert_eq!((p.reserve_a, p.reserve_b), (1_000, 1_500));

        // Same price per share for the next holder
        let second = settlement_payout(Resolution::OutcomeA, 1_000, 0, &p).unwrap();
        assert_eq!(second.payout, 2_500);
        apply_settlement(&mut p, &second);
        assert_eq!(p.total_reserves().unwrap(), 0);
    }

    #[test]
    fn test_void_settlement_burns_pairs_from_reserves() {
        let mut p = pool(100, 80, 1);
        let settlement = settlement_payout(Resolution::Unresolvable, 70, 30, &p).unwrap();
        apply_settlement(&mut p, &settlement);
        assert_eq!((p.reserve_a, p.reserve_b), (70, 50));
    }
}
