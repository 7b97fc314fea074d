use crate::config::PERMILLE;
use crate::error::{MarketError, MarketResult};
use crate::market_resolve::markets::Outcome;
use crate::shares::ShareId;
use serde::{Deserialize, Serialize};

// ============================================================================
// RESERVE-RATIO MARKET MAKER
// ============================================================================

/// Reserve-ratio market maker for a two-outcome market
///
/// Unlike a constant-product pool, the price of an outcome is the share of
/// the *other* reserve in the total:
///
/// - Price(A) = reserve_b / (reserve_a + reserve_b)
/// - Price(B) = reserve_a / (reserve_a + reserve_b)
///
/// A buyer of outcome X receives `net * reserve_x / total` shares and the
/// full collateral (fee included) is added to reserve_x, so fees accrue to
/// LP holders.
///
/// All ratios are computed in fixed point with `SCALE` and checked `u128`
/// arithmetic, multiplying before dividing.

/// Fixed-point scale factor (10^18)
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// `a * b / c` without intermediate truncation
pub fn mul_div(a: u128, b: u128, c: u128) -> MarketResult<u128> {
    if c == 0 {
        return Err(MarketError::InsufficientLiquidity("division by an empty reserve".into()));
    }
    a.checked_mul(b).map(|p| p / c).ok_or(MarketError::ArithmeticOverflow)
}

/// `num / den` as a `SCALE` fixed-point ratio
pub fn scaled_ratio(num: u128, den: u128) -> MarketResult<u128> {
    mul_div(num, SCALE, den)
}

/// Apply a `SCALE` fixed-point ratio to `amount`
pub fn apply_ratio(amount: u128, ratio: u128) -> MarketResult<u128> {
    mul_div(amount, ratio, SCALE)
}

/// Liquidity pool backing one market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityPool {
    pub market_id: u64,
    pub owner: String,
    pub reserve_a: u128,
    pub reserve_b: u128,
    pub lp_supply: u128,
    pub lp_share_id: ShareId,
    /// Reserve units already issued to LP redeemers as outcome shares.
    /// They keep backing settlement but no longer belong to LP holders.
    #[serde(default)]
    pub redeemed_a: u128,
    #[serde(default)]
    pub redeemed_b: u128,
}

/// Result of pricing a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DepositQuote {
    pub lp_minted: u128,
    pub add_a: u128,
    pub add_b: u128,
}

/// Result of pricing a withdrawal or LP redemption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WithdrawQuote {
    pub lp_burned: u128,
    pub out_a: u128,
    pub out_b: u128,
}

impl WithdrawQuote {
    pub fn collateral(&self) -> MarketResult<u128> {
        self.out_a.checked_add(self.out_b).ok_or(MarketError::ArithmeticOverflow)
    }
}

/// Result of pricing a buy or sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TradeQuote {
    pub outcome: Outcome,
    /// Collateral paid in (buy) or paid out (sell)
    pub collateral: u128,
    /// Shares minted (buy) or burned (sell)
    pub shares: u128,
    /// Input amount after the swap fee
    pub net: u128,
}

/// Spot prices, as `SCALE` fixed-point fractions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prices {
    pub price_a: u128,
    pub price_b: u128,
}

impl LiquidityPool {
    /// Seed a pool, splitting the collateral evenly across both reserves.
    ///
    /// Returns the pool and the LP shares owed to the initializer.
    pub fn initialize(
        market_id: u64,
        owner: &str,
        lp_share_id: ShareId,
        collateral: u64,
    ) -> (Self, u128) {
        let half = u128::from(collateral) / 2;
        let pool = Self {
            market_id,
            owner: owner.to_string(),
            reserve_a: half,
            reserve_b: half,
            lp_supply: half,
            lp_share_id,
            redeemed_a: 0,
            redeemed_b: 0,
        };
        (pool, half)
    }

    pub fn reserve(&self, outcome: Outcome) -> u128 {
        match outcome {
            Outcome::A => self.reserve_a,
            Outcome::B => self.reserve_b,
        }
    }

    fn reserve_mut(&mut self, outcome: Outcome) -> &mut u128 {
        match outcome {
            Outcome::A => &mut self.reserve_a,
            Outcome::B => &mut self.reserve_b,
        }
    }

    /// Reserves still owned by LP holders: everything not yet redeemed
    pub fn lp_reserves(&self) -> (u128, u128) {
        (
            self.reserve_a.saturating_sub(self.redeemed_a),
            self.reserve_b.saturating_sub(self.redeemed_b),
        )
    }

    pub fn total_reserves(&self) -> MarketResult<u128> {
        self.reserve_a.checked_add(self.reserve_b).ok_or(MarketError::ArithmeticOverflow)
    }

    pub fn prices(&self) -> MarketResult<Prices> {
        let total = self.total_reserves()?;
        if total == 0 {
            return Ok(Prices { price_a: SCALE / 2, price_b: SCALE / 2 });
        }
        Ok(Prices {
            price_a: scaled_ratio(self.reserve_b, total)?,
            price_b: scaled_ratio(self.reserve_a, total)?,
        })
    }

    // ===== DEPOSIT / WITHDRAW =====

    /// Price a deposit; reserves grow in their current proportion
    pub fn quote_deposit(&self, amount: u64) -> MarketResult<DepositQuote> {
        if amount == 0 {
            return Err(MarketError::InvalidAmount("deposit must be positive".into()));
        }
        let amount = u128::from(amount);
        let total = self.total_reserves()?;
        let lp_minted = apply_ratio(amount, scaled_ratio(self.lp_supply, total)?)?;
        if lp_minted == 0 {
            return Err(MarketError::InvalidAmount(format!(
                "deposit of {} mints no LP shares",
                amount
            )));
        }
        let add_a = apply_ratio(amount, scaled_ratio(self.reserve_a, total)?)?;
        Ok(DepositQuote { lp_minted, add_a, add_b: amount - add_a })
    }

    pub fn apply_deposit(&mut self, quote: &DepositQuote) -> MarketResult<()> {
        let overflow = || MarketError::ArithmeticOverflow;
        let reserve_a = self.reserve_a.checked_add(quote.add_a).ok_or_else(overflow)?;
        let reserve_b = self.reserve_b.checked_add(quote.add_b).ok_or_else(overflow)?;
        let lp_supply = self.lp_supply.checked_add(quote.lp_minted).ok_or_else(overflow)?;
        self.reserve_a = reserve_a;
        self.reserve_b = reserve_b;
        self.lp_supply = lp_supply;
        Ok(())
    }

    /// Price removing `lp_amount / lp_supply` of the LP-owned reserves
    pub fn quote_withdraw(&self, lp_amount: u128) -> MarketResult<WithdrawQuote> {
        if lp_amount == 0 {
            return Err(MarketError::InvalidAmount("LP amount must be positive".into()));
        }
        if lp_amount > self.lp_supply {
            return Err(MarketError::InsufficientLiquidity(format!(
                "{} LP requested, supply is {}",
                lp_amount, self.lp_supply
            )));
        }
        let proportion = scaled_ratio(lp_amount, self.lp_supply)?;
        let (owned_a, owned_b) = self.lp_reserves();
        Ok(WithdrawQuote {
            lp_burned: lp_amount,
            out_a: apply_ratio(owned_a, proportion)?,
            out_b: apply_ratio(owned_b, proportion)?,
        })
    }

    pub fn apply_withdraw(&mut self, quote: &WithdrawQuote) {
        self.reserve_a = self.reserve_a.saturating_sub(quote.out_a);
        self.reserve_b = self.reserve_b.saturating_sub(quote.out_b);
        self.lp_supply = self.lp_supply.saturating_sub(quote.lp_burned);
    }

    /// Hand an LP slice over to redeemers: the LP shares go, the reserves
    /// stay and the slice is marked as redeemed
    pub fn apply_redemption(&mut self, slice: &WithdrawQuote) -> MarketResult<()> {
        let overflow = || MarketError::ArithmeticOverflow;
        let redeemed_a = self.redeemed_a.checked_add(slice.out_a).ok_or_else(overflow)?;
        let redeemed_b = self.redeemed_b.checked_add(slice.out_b).ok_or_else(overflow)?;
        self.redeemed_a = redeemed_a.min(self.reserve_a);
        self.redeemed_b = redeemed_b.min(self.reserve_b);
        self.lp_supply = self.lp_supply.saturating_sub(slice.lp_burned);
        Ok(())
    }

    // ===== TRADING =====

    /// Price buying `outcome` shares with `collateral`
    pub fn quote_buy(
        &self,
        outcome: Outcome,
        collateral: u64,
        fee_permille: u64,
    ) -> MarketResult<TradeQuote> {
        if collateral == 0 {
            return Err(MarketError::InvalidAmount("collateral must be positive".into()));
        }
        let collateral = u128::from(collateral);
        let net = after_fee(collateral, fee_permille)?;
        let total = self.total_reserves()?;
        let shares = apply_ratio(net, scaled_ratio(self.reserve(outcome), total)?)?;
        if shares == 0 {
            return Err(MarketError::InvalidAmount(format!(
                "buying with {} collateral mints no shares",
                collateral
            )));
        }
        Ok(TradeQuote { outcome, collateral, shares, net })
    }

    /// The whole collateral, fee included, lands in the bought outcome's reserve
    pub fn apply_buy(&mut self, quote: &TradeQuote) -> MarketResult<()> {
        let reserve = self.reserve(quote.outcome);
        *self.reserve_mut(quote.outcome) =
            reserve.checked_add(quote.collateral).ok_or(MarketError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Price selling `share_amount` of `outcome` back to the pool
    pub fn quote_sell(
        &self,
        outcome: Outcome,
        share_amount: u128,
        fee_permille: u64,
    ) -> MarketResult<TradeQuote> {
        if share_amount == 0 {
            return Err(MarketError::InvalidAmount("share amount must be positive".into()));
        }
        let reserve = self.reserve(outcome);
        if share_amount > reserve {
            return Err(MarketError::InsufficientLiquidity(format!(
                "selling {} shares against a reserve of {}",
                share_amount, reserve
            )));
        }
        let net = after_fee(share_amount, fee_permille)?;
        let total = self.total_reserves()?;
        // net <= reserve, so the payout never exceeds the total reserves
        let collateral = apply_ratio(net, scaled_ratio(total, reserve)?)?;
        if collateral == 0 {
            return Err(MarketError::InvalidAmount(format!(
                "selling {} shares pays no collateral",
                share_amount
            )));
        }
        Ok(TradeQuote { outcome, collateral, shares: share_amount, net })
    }

    pub fn apply_sell(&mut self, quote: &TradeQuote) {
        let reserve = self.reserve(quote.outcome);
        *self.reserve_mut(quote.outcome) = reserve.saturating_sub(quote.shares);
    }
}

fn after_fee(amount: u128, fee_permille: u64) -> MarketResult<u128> {
    let keep = u128::from(PERMILLE.saturating_sub(fee_permille));
    mul_div(amount, keep, u128::from(PERMILLE))
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(a: u128, b: u128, supply: u128) -> LiquidityPool {
        LiquidityPool {
            market_id: 0,
            owner: "alice".into(),
            reserve_a: a,
            reserve_b: b,
            lp_supply: supply,
            lp_share_id: 9,
            redeemed_a: 0,
            redeemed_b: 0,
        }
    }

    #[test]
    fn test_initialize_splits_evenly() {
        let (pool, minted) = LiquidityPool::initialize(3, "alice", 7, 10_001);
        assert_eq!(pool.reserve_a, 5_000);
        assert_eq!(pool.reserve_b, 5_000);
        assert_eq!(pool.lp_supply, 5_000);
        assert_eq!(minted, 5_000);
    }

    #[test]
    fn test_prices_equal_at_start() {
        let (pool, _) = LiquidityPool::initialize(0, "alice", 1, 1_000);
        let prices = pool.prices().unwrap();
        assert_eq!(prices.price_a, SCALE / 2);
        assert_eq!(prices.price_b, SCALE / 2);
    }

    #[test]
    fn test_buy_mints_by_reserve_share() {
        let pool = pool(2_000, 3_000, 2_500);
        // 1000 collateral, 2% fee -> net 980, 980 * 2000/5000 = 392
        let quote = pool.quote_buy(Outcome::A, 1_000, 20).unwrap();
        assert_eq!(quote.net, 980);
        assert_eq!(quote.shares, 392);
    }

    #[test]
    fn test_buy_adds_full_collateral_to_reserve() {
        let mut pool = pool(500, 500, 500);
        let quote = pool.quote_buy(Outcome::B, 100, 20).unwrap();
        pool.apply_buy(&quote).unwrap();
        assert_eq!(pool.reserve_b, 600);
        assert_eq!(pool.reserve_a, 500);

        let prices = pool.prices().unwrap();
        // Price(A) = reserve_b / total rises after buying B
        assert!(prices.price_a > SCALE / 2);
        assert!(prices.price_a + prices.price_b <= SCALE);
        assert!(SCALE - (prices.price_a + prices.price_b) <= 1);
    }

    #[test]
    fn test_buy_monotonic_in_size() {
        let pool = pool(1_234, 4_321, 2_000);
        let mut last = 0;
        for amount in (100..2_000u64).step_by(37) {
            let shares = pool.quote_buy(Outcome::A, amount, 20).unwrap().shares;
            assert!(shares >= last);
            last = shares;
        }
    }

    #[test]
    fn test_sell_pays_inverse_ratio() {
        let pool = pool(2_000, 3_000, 2_500);
        // 100 shares, 2% fee -> net 98, 98 * 5000/2000 = 245
        let quote = pool.quote_sell(Outcome::A, 100, 20).unwrap();
        assert_eq!(quote.collateral, 245);

        let mut pool = pool;
        pool.apply_sell(&quote);
        assert_eq!(pool.reserve_a, 1_900);
    }

    #[test]
    fn test_sell_monotonic_in_size() {
        let pool = pool(4_321, 1_234, 2_000);
        let mut last = 0;
        for share_amount in (100..4_321u128).step_by(41) {
            let collateral = pool.quote_sell(Outcome::A, share_amount, 20).unwrap().collateral;
            assert!(collateral >= last);
            last = collateral;
        }
    }

    #[test]
    fn test_dust_trades_rejected() {
        let pool = pool(1_000, 1_000, 1_000);
        // net 0 after the fee
        assert!(matches!(pool.quote_buy(Outcome::A, 1, 20), Err(MarketError::InvalidAmount(_))));
        assert!(matches!(pool.quote_sell(Outcome::A, 1, 20), Err(MarketError::InvalidAmount(_))));
        assert!(pool.quote_buy(Outcome::A, 3, 20).is_ok());
    }

    #[test]
    fn test_sell_more_than_reserve_rejected() {
        let pool = pool(100, 900, 500);
        assert!(matches!(
            pool.quote_sell(Outcome::A, 101, 20),
            Err(MarketError::InsufficientLiquidity(_))
        ));
    }

    #[test]
    fn test_selling_whole_reserve_pays_at_most_total() {
        let pool = pool(100, 900, 500);
        assert!(matches!(
            pool.quote_sell(Outcome::A, 100, 20),
            Ok(TradeQuote { collateral: 980, .. })
        ));
        assert!(matches!(
            pool.quote_sell(Outcome::A, 100, 0),
            Ok(TradeQuote { collateral: 1_000, .. })
        ));
    }

    #[test]
    fn test_deposit_preserves_ratio() {
        let mut pool = pool(2_000, 6_000, 4_000);
        let before = pool.prices().unwrap();
        let quote = pool.quote_deposit(800).unwrap();
        assert_eq!(quote.lp_minted, 400);
        assert_eq!(quote.add_a, 200);
        assert_eq!(quote.add_b, 600);
        pool.apply_deposit(&quote).unwrap();
        assert_eq!(pool.prices().unwrap(), before);
    }

    #[test]
    fn test_deposit_then_withdraw_never_profits() {
        let cases = [(333u128, 777u128, 500u128, 1_001u64), (1, 2, 1, 7), (5_000, 5_000, 5_000, 3)];
        for (a, b, supply, amount) in cases {
            let mut pool = pool(a, b, supply);
            let deposit = pool.quote_deposit(amount).unwrap();
            pool.apply_deposit(&deposit).unwrap();
            if deposit.lp_minted == 0 {
                continue;
            }
            let withdraw = pool.quote_withdraw(deposit.lp_minted).unwrap();
            assert!(withdraw.collateral().unwrap() <= u128::from(amount));
        }
    }

    #[test]
    fn test_deposit_minting_no_lp_rejected() {
        // 1 * 10 / 1_000 rounds to zero LP shares
        let pool = pool(500, 500, 10);
        assert!(matches!(pool.quote_deposit(1), Err(MarketError::InvalidAmount(_))));
        assert_eq!(pool.quote_deposit(100).unwrap().lp_minted, 1);
    }

    #[test]
    fn test_redemption_keeps_reserves() {
        let mut pool = pool(2_000, 3_000, 2_500);
        let slice = pool.quote_withdraw(500).unwrap();
        pool.apply_redemption(&slice).unwrap();
        assert_eq!((pool.reserve_a, pool.reserve_b), (2_000, 3_000));
        assert_eq!((pool.redeemed_a, pool.redeemed_b), (400, 600));
        assert_eq!(pool.lp_supply, 2_000);

        // The rest of the supply owns only what was not redeemed
        let rest = pool.quote_withdraw(2_000).unwrap();
        assert_eq!((rest.out_a, rest.out_b), (1_600, 2_400));
    }

    #[test]
    fn test_withdraw_proportional() {
        let mut pool = pool(2_000, 3_000, 2_500);
        let quote = pool.quote_withdraw(500).unwrap();
        assert_eq!(quote.out_a, 400);
        assert_eq!(quote.out_b, 600);
        pool.apply_withdraw(&quote);
        assert_eq!(pool.lp_supply, 2_000);
        assert_eq!(pool.total_reserves().unwrap(), 4_000);
    }

    #[test]
    fn test_withdraw_beyond_supply_rejected() {
        let pool = pool(10, 10, 10);
        assert!(pool.quote_withdraw(11).is_err());
        assert!(pool.quote_withdraw(0).is_err());
    }

    #[test]
    fn test_empty_pool_rejects_deposit() {
        let pool = pool(0, 0, 0);
        assert!(matches!(pool.quote_deposit(100), Err(MarketError::InsufficientLiquidity(_))));
    }
}
