// Liquidity pool operations. Each one quotes against the pool first, checks
// every balance it will touch, then commits; nothing is written on failure.

use super::MarketEngine;
use crate::error::{MarketError, MarketResult};
use crate::events::MarketEvent;
use crate::ledger::market_escrow;
use crate::market_resolve::{LiquidityPool, Outcome, Prices};
use crate::registry::lock;
use crate::shares::{ShareId, ShareKind};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PoolReceipt {
    pub market_id: u64,
    pub lp_share_id: ShareId,
    pub lp_minted: u128,
    pub reserve_a: u128,
    pub reserve_b: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiquidityReceipt {
    pub market_id: u64,
    /// LP shares minted (deposit) or burned (withdraw)
    pub lp_amount: u128,
    /// Collateral paid in (deposit) or out (withdraw)
    pub collateral: u64,
    pub reserve_a: u128,
    pub reserve_b: u128,
    pub lp_supply: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeReceipt {
    pub market_id: u64,
    pub outcome: Outcome,
    pub share_id: ShareId,
    /// Shares minted (buy) or burned (sell)
    pub shares: u128,
    /// Collateral paid in (buy) or out (sell)
    pub collateral: u64,
    pub prices: Prices,
}

fn to_collateral(amount: u128) -> MarketResult<u64> {
    u64::try_from(amount).map_err(|_| MarketError::ArithmeticOverflow)
}

impl MarketEngine {
    /// Seed a market's pool. The initializer becomes the pool owner and
    /// receives `collateral / 2` LP shares.
    pub fn initialize_pool(
        &self,
        caller: &str,
        market_id: u64,
        collateral: u64,
    ) -> MarketResult<PoolReceipt> {
        self.run("initialize_pool", || {
            let now = self.clock.now();
            let min_liquidity = self.config_read().min_liquidity;
            if collateral < min_liquidity {
                return Err(MarketError::BelowMinimumLiquidity {
                    minimum: min_liquidity,
                    provided: collateral,
                });
            }
            if collateral < 2 {
                return Err(MarketError::InvalidAmount(
                    "pool needs collateral on both sides".into(),
                ));
            }

            let record = self.market_record(market_id)?;
            let mut record = lock(&record);
            record.market.ensure_unresolved()?;
            if record.pool.is_some() {
                return Err(MarketError::PoolAlreadyInitialized(market_id));
            }

            let escrow = market_escrow(market_id);
            let mut ledger = lock(&self.ledger);
            ledger.ensure_transfer(caller, &escrow, collateral)?;

            let lp_share_id = self.allocate_share_id();
            let (pool, lp_minted) =
                LiquidityPool::initialize(market_id, caller, lp_share_id, collateral);
            ledger.transfer(
                caller,
                &escrow,
                collateral,
                &format!("pool seed for market {}", market_id),
            )?;
            let mut shares = lock(&self.shares);
            shares.register(lp_share_id, market_id, ShareKind::Lp);
            shares.mint(lp_share_id, caller, lp_minted)?;
            drop(shares);
            drop(ledger);

            let receipt = PoolReceipt {
                market_id,
                lp_share_id,
                lp_minted,
                reserve_a: pool.reserve_a,
                reserve_b: pool.reserve_b,
            };
            record.market.pool_initialized = true;
            record.market.pool_owner = Some(caller.to_string());
            record.pool = Some(pool);

            self.emit(now, MarketEvent::PoolInitialized {
                market_id,
                owner: caller.to_string(),
                collateral,
                lp_minted,
            });
            Ok(receipt)
        })
    }

    /// Add collateral to both reserves in their current ratio
    pub fn deposit_liquidity(
        &self,
        caller: &str,
        market_id: u64,
        amount: u64,
    ) -> MarketResult<LiquidityReceipt> {
        self.run("deposit_liquidity", || {
            let now = self.clock.now();
            let record = self.market_record(market_id)?;
            let mut record = lock(&record);
            record.market.ensure_unresolved()?;
            let pool = record.pool_mut()?;

            let quote = pool.quote_deposit(amount)?;
            let mut next = pool.clone();
            next.apply_deposit(&quote)?;

            let escrow = market_escrow(market_id);
            let mut ledger = lock(&self.ledger);
            let mut shares = lock(&self.shares);
            ledger.ensure_transfer(caller, &escrow, amount)?;
            shares.ensure_mint(pool.lp_share_id, caller, quote.lp_minted)?;

            ledger.transfer(
                caller,
                &escrow,
                amount,
                &format!("liquidity deposit to market {}", market_id),
            )?;
            shares.mint(pool.lp_share_id, caller, quote.lp_minted)?;
            drop(shares);
            drop(ledger);
            *pool = next;

            self.emit(now, MarketEvent::LiquidityDeposited {
                market_id,
                account: caller.to_string(),
                amount,
                lp_minted: quote.lp_minted,
            });
            Ok(LiquidityReceipt {
                market_id,
                lp_amount: quote.lp_minted,
                collateral: amount,
                reserve_a: pool.reserve_a,
                reserve_b: pool.reserve_b,
                lp_supply: pool.lp_supply,
            })
        })
    }

    /// Burn LP shares for the matching slice of both reserves, paid in collateral
    pub fn withdraw_liquidity(
        &self,
        caller: &str,
        market_id: u64,
        lp_amount: u128,
    ) -> MarketResult<LiquidityReceipt> {
        self.run("withdraw_liquidity", || {
            let now = self.clock.now();
            let record = self.market_record(market_id)?;
            let mut record = lock(&record);
            record.market.ensure_unresolved()?;
            let pool = record.pool_mut()?;

            let quote = pool.quote_withdraw(lp_amount)?;
            let collateral = to_collateral(quote.collateral()?)?;

            let escrow = market_escrow(market_id);
            let mut ledger = lock(&self.ledger);
            let mut shares = lock(&self.shares);
            shares.ensure_balance(pool.lp_share_id, caller, lp_amount)?;
            ledger.ensure_transfer(&escrow, caller, collateral)?;

            shares.burn(pool.lp_share_id, caller, lp_amount)?;
            ledger.transfer(
                &escrow,
                caller,
                collateral,
                &format!("liquidity withdrawal from market {}", market_id),
            )?;
            drop(shares);
            drop(ledger);
            pool.apply_withdraw(&quote);

            self.emit(now, MarketEvent::LiquidityWithdrawn {
                market_id,
                account: caller.to_string(),
                lp_burned: lp_amount,
                collateral,
            });
            Ok(LiquidityReceipt {
                market_id,
                lp_amount,
                collateral,
                reserve_a: pool.reserve_a,
                reserve_b: pool.reserve_b,
                lp_supply: pool.lp_supply,
            })
        })
    }

    /// Pay collateral into one outcome's reserve for newly minted shares
    pub fn buy_outcome_tokens(
        &self,
        caller: &str,
        market_id: u64,
        outcome: Outcome,
        collateral: u64,
    ) -> MarketResult<TradeReceipt> {
        self.run("buy_outcome_tokens", || {
            let now = self.clock.now();
            let fee = self.config_read().swap_fee_permille;
            let record = self.market_record(market_id)?;
            let mut record = lock(&record);
            record.market.ensure_unresolved()?;
            let share_id = record.market.share_id(outcome);
            let pool = record.pool_mut()?;

            let quote = pool.quote_buy(outcome, collateral, fee)?;
            let mut next = pool.clone();
            next.apply_buy(&quote)?;
            let prices = next.prices()?;

            let escrow = market_escrow(market_id);
            let mut ledger = lock(&self.ledger);
            let mut shares = lock(&self.shares);
            ledger.ensure_transfer(caller, &escrow, collateral)?;
            shares.ensure_mint(share_id, caller, quote.shares)?;

            ledger.transfer(
                caller,
                &escrow,
                collateral,
                &format!("buy {:?} in market {}", outcome, market_id),
            )?;
            shares.mint(share_id, caller, quote.shares)?;
            drop(shares);
            drop(ledger);
            *pool = next;

            self.emit(now, MarketEvent::OutcomeBought {
                market_id,
                account: caller.to_string(),
                outcome,
                collateral,
                shares: quote.shares,
            });
            Ok(TradeReceipt {
                market_id,
                outcome,
                share_id,
                shares: quote.shares,
                collateral,
                prices,
            })
        })
    }

    /// Return outcome shares to the pool for collateral
    pub fn sell_outcome_tokens(
        &self,
        caller: &str,
        market_id: u64,
        outcome: Outcome,
        share_amount: u128,
    ) -> MarketResult<TradeReceipt> {
        self.run("sell_outcome_tokens", || {
            let now = self.clock.now();
            let fee = self.config_read().swap_fee_permille;
            let record = self.market_record(market_id)?;
            let mut record = lock(&record);
            record.market.ensure_unresolved()?;
            let share_id = record.market.share_id(outcome);
            let pool = record.pool_mut()?;

            let quote = pool.quote_sell(outcome, share_amount, fee)?;
            let collateral = to_collateral(quote.collateral)?;
            let mut next = pool.clone();
            next.apply_sell(&quote);
            let prices = next.prices()?;

            let escrow = market_escrow(market_id);
            let mut ledger = lock(&self.ledger);
            let mut shares = lock(&self.shares);
            shares.ensure_balance(share_id, caller, share_amount)?;
            ledger.ensure_transfer(&escrow, caller, collateral)?;

            shares.burn(share_id, caller, share_amount)?;
            ledger.transfer(
                &escrow,
                caller,
                collateral,
                &format!("sell {:?} in market {}", outcome, market_id),
            )?;
            drop(shares);
            drop(ledger);
            *pool = next;

            self.emit(now, MarketEvent::OutcomeSold {
                market_id,
                account: caller.to_string(),
                outcome,
                shares: share_amount,
                collateral,
            });
            Ok(TradeReceipt {
                market_id,
                outcome,
                share_id,
                shares: share_amount,
                collateral,
                prices,
            })
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use crate::error::MarketError;
    use crate::ledger::market_escrow;
    use crate::market_resolve::{Outcome, SCALE};

    #[test]
    fn test_initialize_pool_splits_collateral() {
        let (engine, _) = engine();
        let market = engine.initialize_market("alice", params(0, 100_000)).unwrap();
        let receipt = engine.initialize_pool("alice", market.id, 10_000).unwrap();

        assert_eq!(receipt.lp_minted, 5_000);
        assert_eq!((receipt.reserve_a, receipt.reserve_b), (5_000, 5_000));
        assert_eq!(engine.share_balance(receipt.lp_share_id, "alice"), 5_000);
        assert_eq!(engine.collateral_balance(&market_escrow(market.id)), 10_000);

        let market = engine.market(market.id).unwrap();
        assert!(market.pool_initialized);
        assert_eq!(market.pool_owner.as_deref(), Some("alice"));
    }

    #[test]
    fn test_initialize_pool_once_and_above_minimum() {
        let (engine, _) = engine();
        let market = engine.initialize_market("alice", params(0, 100_000)).unwrap();
        assert_eq!(
            engine.initialize_pool("alice", market.id, 999).map(|r| r.lp_minted),
            Err(MarketError::BelowMinimumLiquidity { minimum: 1_000, provided: 999 })
        );
        engine.initialize_pool("alice", market.id, 1_000).unwrap();
        assert_eq!(
            engine.initialize_pool("bob", market.id, 1_000).map(|r| r.lp_minted),
            Err(MarketError::PoolAlreadyInitialized(market.id))
        );
        assert_eq!(engine.collateral_balance("bob"), 10_000_000);
    }

    #[test]
    fn test_trading_requires_pool() {
        let (engine, _) = engine();
        let market = engine.initialize_market("alice", params(0, 100_000)).unwrap();
        assert_eq!(
            engine.buy_outcome_tokens("bob", market.id, Outcome::A, 100).map(|r| r.shares),
            Err(MarketError::PoolNotInitialized(market.id))
        );
        assert_eq!(
            engine.deposit_liquidity("bob", 42, 100).map(|r| r.lp_amount),
            Err(MarketError::MarketNotFound(42))
        );
    }

    #[test]
    fn test_buy_moves_price_toward_bought_outcome() {
        let (engine, _) = engine();
        let market = market_with_pool(&engine);

        // net 980 * 5000 / 10000 = 490
        let receipt = engine.buy_outcome_tokens("bob", market.id, Outcome::B, 1_000).unwrap();
        assert_eq!(receipt.shares, 490);
        assert_eq!(engine.share_balance(market.outcome_b_share_id, "bob"), 490);
        assert_eq!(engine.collateral_balance("bob"), 10_000_000 - 1_000);

        let pool = engine.pool(market.id).unwrap();
        assert_eq!((pool.reserve_a, pool.reserve_b), (5_000, 6_000));
        // Price(A) = reserve_b / total
        assert!(receipt.prices.price_a > SCALE / 2);
        assert!(receipt.prices.price_a + receipt.prices.price_b <= SCALE);
    }

    #[test]
    fn test_sell_returns_collateral() {
        let (engine, _) = engine();
        let market = market_with_pool(&engine);
        engine.buy_outcome_tokens("bob", market.id, Outcome::A, 1_000).unwrap();

        // reserves 6000/5000; 100 shares -> net 98 * 11000 / 6000 = 179
        let receipt = engine.sell_outcome_tokens("bob", market.id, Outcome::A, 100).unwrap();
        assert_eq!(receipt.collateral, 179);
        assert_eq!(engine.share_balance(market.outcome_a_share_id, "bob"), 390);
        assert_eq!(engine.pool(market.id).unwrap().reserve_a, 5_900);
        assert_eq!(engine.collateral_balance("bob"), 10_000_000 - 1_000 + 179);
    }

    #[test]
    fn test_sell_without_shares_changes_nothing() {
        let (engine, _) = engine();
        let market = market_with_pool(&engine);
        let before = engine.pool(market.id).unwrap();

        assert!(matches!(
            engine.sell_outcome_tokens("carol", market.id, Outcome::A, 10),
            Err(MarketError::InsufficientShares { .. })
        ));
        let after = engine.pool(market.id).unwrap();
        assert_eq!((before.reserve_a, before.reserve_b), (after.reserve_a, after.reserve_b));
        assert_eq!(engine.collateral_balance("carol"), 10_000_000);
    }

    #[test]
    fn test_dust_buy_rejected_without_taking_collateral() {
        let (engine, _) = engine();
        let market = market_with_pool(&engine);

        assert!(matches!(
            engine.buy_outcome_tokens("carol", market.id, Outcome::A, 1),
            Err(MarketError::InvalidAmount(_))
        ));
        assert_eq!(engine.collateral_balance("carol"), 10_000_000);
        assert_eq!(engine.share_balance(market.outcome_a_share_id, "carol"), 0);
        assert_eq!(engine.pool(market.id).unwrap().reserve_a, 5_000);
    }

    #[test]
    fn test_deposit_then_withdraw_never_profits() {
        let (engine, _) = engine();
        let market = market_with_pool(&engine);
        engine.buy_outcome_tokens("bob", market.id, Outcome::A, 3_333).unwrap();

        let deposit = engine.deposit_liquidity("carol", market.id, 7_777).unwrap();
        let withdraw = engine.withdraw_liquidity("carol", market.id, deposit.lp_amount).unwrap();
        assert!(withdraw.collateral <= 7_777);
        assert_eq!(engine.share_balance(engine.pool(market.id).unwrap().lp_share_id, "carol"), 0);
    }

    #[test]
    fn test_deposit_keeps_prices() {
        let (engine, _) = engine();
        let market = market_with_pool(&engine);
        engine.buy_outcome_tokens("bob", market.id, Outcome::B, 2_000).unwrap();
        let before = engine.prices(market.id).unwrap();

        engine.deposit_liquidity("carol", market.id, 4_000).unwrap();
        let after = engine.prices(market.id).unwrap();
        let drift = before.price_a.abs_diff(after.price_a);
        assert!(drift < SCALE / 1_000);
    }

    #[test]
    fn test_withdraw_more_lp_than_held_rejected() {
        let (engine, _) = engine();
        let market = market_with_pool(&engine);
        engine.deposit_liquidity("bob", market.id, 2_000).unwrap();
        assert!(matches!(
            engine.withdraw_liquidity("bob", market.id, 1_001),
            Err(MarketError::InsufficientShares { .. })
        ));
    }

    #[test]
    fn test_concurrent_buys_on_one_market_match_sequential_replay() {
        let (engine, _) = engine();
        let market_id = market_with_pool(&engine).id;
        let traders = ["bob", "carol", "dave"];

        let mut minted: Vec<u128> = std::thread::scope(|scope| {
            let handles: Vec<_> = traders
                .iter()
                .map(|trader| {
                    let engine = &engine;
                    scope.spawn(move || {
                        (0..20)
                            .map(|_| {
                                engine
                                    .buy_outcome_tokens(trader, market_id, Outcome::A, 100)
                                    .unwrap()
                                    .shares
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().flat_map(|handle| handle.join().unwrap()).collect()
        });

        // Identical buys give the same sequence of fills in any order
        let (replay, _) = crate::engine::fixtures::engine();
        let replay_id = market_with_pool(&replay).id;
        let mut expected: Vec<u128> = (0..60)
            .map(|_| replay.buy_outcome_tokens("bob", replay_id, Outcome::A, 100).unwrap().shares)
            .collect();
        minted.sort_unstable();
        expected.sort_unstable();
        assert_eq!(minted, expected);

        assert_eq!(engine.pool(market_id).unwrap().reserve_a, 5_000 + 6_000);
        assert_eq!(engine.collateral_balance(&market_escrow(market_id)), 10_000 + 6_000);
    }

    #[test]
    fn test_concurrent_buys_and_sells_keep_pool_consistent() {
        let (engine, _) = engine();
        let market = market_with_pool(&engine);
        let market_id = market.id;
        engine.buy_outcome_tokens("bob", market_id, Outcome::A, 2_000).unwrap();
        let bob_shares = engine.share_balance(market.outcome_a_share_id, "bob");

        let paid_out: u64 = std::thread::scope(|scope| {
            let engine = &engine;
            let buyer = scope.spawn(move || {
                for _ in 0..50 {
                    engine.buy_outcome_tokens("carol", market_id, Outcome::B, 100).unwrap();
                }
            });
            let seller = scope.spawn(move || {
                (0..20)
                    .map(|_| {
                        engine
                            .sell_outcome_tokens("bob", market_id, Outcome::A, 10)
                            .unwrap()
                            .collateral
                    })
                    .sum()
            });
            buyer.join().unwrap();
            seller.join().unwrap()
        });

        let pool = engine.pool(market_id).unwrap();
        assert_eq!(pool.reserve_a, 5_000 + 2_000 - 200);
        assert_eq!(pool.reserve_b, 5_000 + 5_000);
        assert_eq!(engine.share_balance(market.outcome_a_share_id, "bob"), bob_shares - 200);
        assert_eq!(
            engine.collateral_balance(&market_escrow(market_id)),
            10_000 + 2_000 + 5_000 - paid_out
        );
    }
}
