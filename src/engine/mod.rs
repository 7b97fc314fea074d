// ============================================================================
// Market Engine - Optimistic Prediction Market
// ============================================================================
//
// Owns every market, pool and assertion plus the collateral and share
// ledgers, and exposes the public operations:
//
//   markets      initialize_market
//   liquidity    initialize_pool, deposit_liquidity, withdraw_liquidity,
//                buy_outcome_tokens, sell_outcome_tokens
//   assertions   assert_outcome, dispute, settle_assertion, record_verdict
//   settlement   redeem_lp_for_outcome_tokens, settle_outcome_tokens
//
// CONCURRENCY:
//   Each market (with its pool) and each assertion sits behind its own
//   mutex, so operations on different markets run in parallel. Operations
//   that touch several records lock in one global order:
//
//       market record -> assertion -> collateral ledger -> share ledger
//
//   The event log and the config lock are leaves and never held while
//   acquiring anything else.
//
// ATOMICITY:
//   Every operation quotes and checks all of its effects (balances, share
//   holdings, overflow) before mutating anything, so a failed operation
//   leaves no trace.
//
// ============================================================================

mod assertions;
mod liquidity;
mod settlement;

pub use assertions::*;
pub use liquidity::*;
pub use settlement::*;

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigUpdate, MarketConfig, WhitelistKind};
use crate::error::{MarketError, MarketResult};
use crate::events::{EventLog, EventRecord, MarketEvent};
use crate::ledger::{CollateralLedger, LedgerStats, BOND_ESCROW};
use crate::market_resolve::{
    Assertion, AssertionPolicy, AssertionState, DisputeKey, EscalationResolver, InMemoryResolver,
    LiquidityPool, Market, NewMarket, Prices,
};
use crate::registry::{lock, Registry};
use crate::shares::{PositionInfo, ShareId, ShareKind, ShareLedger, SharesStats};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};
use tracing::{debug, info};

// ============================================================================
// RECORDS
// ============================================================================

/// A market together with its (optional) liquidity pool; locked as one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRecord {
    pub market: Market,
    pub pool: Option<LiquidityPool>,
}

impl MarketRecord {
    fn pool(&self) -> MarketResult<&LiquidityPool> {
        self.pool.as_ref().ok_or(MarketError::PoolNotInitialized(self.market.id))
    }

    fn pool_mut(&mut self) -> MarketResult<&mut LiquidityPool> {
        let id = self.market.id;
        self.pool.as_mut().ok_or(MarketError::PoolNotInitialized(id))
    }
}

/// An assertion with its lifecycle state at read time
#[derive(Debug, Clone, Serialize)]
pub struct AssertionView {
    #[serde(flatten)]
    pub assertion: Assertion,
    pub state: AssertionState,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub markets: usize,
    pub assertions: usize,
    pub ledger: LedgerStats,
    pub shares: SharesStats,
}

/// Serializable copy of the whole engine, written to disk on shutdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub config: MarketConfig,
    pub markets: Vec<MarketRecord>,
    pub assertions: Vec<Assertion>,
    pub next_market_id: u64,
    pub next_assertion_id: u64,
    pub next_share_id: ShareId,
    pub ledger: CollateralLedger,
    pub shares: ShareLedger,
    #[serde(default)]
    pub verdicts: HashMap<DisputeKey, bool>,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct MarketEngine {
    config: RwLock<MarketConfig>,
    /// Overrides the config-driven whitelist policy when set
    policy: Option<Arc<dyn AssertionPolicy>>,
    resolver: Arc<dyn EscalationResolver>,
    clock: Arc<dyn Clock>,
    markets: Registry<MarketRecord>,
    assertions: Registry<Assertion>,
    next_share_id: AtomicU64,
    ledger: Mutex<CollateralLedger>,
    shares: Mutex<ShareLedger>,
    events: EventLog,
}

impl MarketEngine {
    pub fn new(config: MarketConfig) -> Self {
        Self {
            config: RwLock::new(config),
            policy: None,
            resolver: Arc::new(InMemoryResolver::new()),
            clock: Arc::new(SystemClock),
            markets: Registry::new(),
            assertions: Registry::new(),
            next_share_id: AtomicU64::new(0),
            ledger: Mutex::new(CollateralLedger::new()),
            shares: Mutex::new(ShareLedger::new()),
            events: EventLog::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn EscalationResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn AssertionPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Rebuild an engine from a snapshot. Verdicts go into a fresh
    /// in-memory resolver.
    pub fn from_snapshot(snapshot: EngineSnapshot) -> MarketResult<Self> {
        snapshot.config.validate()?;

        let markets = Registry::starting_at(snapshot.next_market_id);
        for record in snapshot.markets {
            markets.insert(record.market.id, record);
        }
        let assertions = Registry::starting_at(snapshot.next_assertion_id);
        for assertion in snapshot.assertions {
            assertions.insert(assertion.id, assertion);
        }
        Ok(Self {
            config: RwLock::new(snapshot.config),
            policy: None,
            resolver: Arc::new(InMemoryResolver::with_verdicts(snapshot.verdicts)),
            clock: Arc::new(SystemClock),
            markets,
            assertions,
            next_share_id: AtomicU64::new(snapshot.next_share_id),
            ledger: Mutex::new(snapshot.ledger),
            shares: Mutex::new(snapshot.shares),
            events: EventLog::new(),
        })
    }

    /// Copy every record. Records are locked one at a time, so take
    /// snapshots while the engine is quiescent (e.g. on shutdown).
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            config: self.config(),
            markets: self.markets.snapshot(),
            assertions: self.assertions.snapshot(),
            next_market_id: self.markets.next_id(),
            next_assertion_id: self.assertions.next_id(),
            next_share_id: self.next_share_id.load(Ordering::SeqCst),
            ledger: lock(&self.ledger).clone(),
            shares: lock(&self.shares).clone(),
            verdicts: self.resolver.export(),
        }
    }

    // ===== MARKETS =====

    /// Create a market and register its two outcome tokens.
    ///
    /// A non-zero reward is moved from the caller into the bond escrow and
    /// paid to whoever asserts the resolution truthfully.
    pub fn initialize_market(&self, caller: &str, params: NewMarket) -> MarketResult<Market> {
        self.run("initialize_market", || {
            let now = self.clock.now();
            let min_bond = self.config_read().min_bond;
            params.validate(min_bond)?;

            let mut ledger = lock(&self.ledger);
            if params.reward > 0 {
                ledger.ensure_transfer(caller, BOND_ESCROW, params.reward)?;
            }

            let market_id = self.markets.allocate_id();
            let share_ids = (self.allocate_share_id(), self.allocate_share_id());
            let market = Market::new(market_id, caller, params, share_ids, now);

            if market.reward > 0 {
                ledger.transfer(
                    caller,
                    BOND_ESCROW,
                    market.reward,
                    &format!("reward for market {}", market_id),
                )?;
            }
            drop(ledger);

            {
                let mut shares = lock(&self.shares);
                shares.register(share_ids.0, market_id, ShareKind::OutcomeA);
                shares.register(share_ids.1, market_id, ShareKind::OutcomeB);
            }
            self.markets.insert(market_id, MarketRecord { market: market.clone(), pool: None });

            self.emit(now, MarketEvent::MarketInitialized {
                market_id,
                owner: caller.to_string(),
                reward: market.reward,
                required_bond: market.required_bond,
            });
            Ok(market)
        })
    }

    // ===== READS =====

    pub fn market(&self, market_id: u64) -> MarketResult<Market> {
        let record = self.market_record(market_id)?;
        let market = lock(&record).market.clone();
        Ok(market)
    }

    pub fn markets(&self) -> Vec<Market> {
        self.markets.snapshot().into_iter().map(|record| record.market).collect()
    }

    pub fn pool(&self, market_id: u64) -> MarketResult<LiquidityPool> {
        let record = self.market_record(market_id)?;
        let guard = lock(&record);
        let pool = guard.pool()?.clone();
        Ok(pool)
    }

    pub fn prices(&self, market_id: u64) -> MarketResult<Prices> {
        let record = self.market_record(market_id)?;
        let guard = lock(&record);
        let prices = guard.pool()?.prices()?;
        Ok(prices)
    }

    pub fn assertion(&self, assertion_id: u64) -> MarketResult<AssertionView> {
        let now = self.clock.now();
        let record = self.assertion_record(assertion_id)?;
        let assertion = lock(&record).clone();
        let state = assertion.state(now);
        Ok(AssertionView { assertion, state })
    }

    pub fn collateral_balance(&self, account: &str) -> u64 {
        lock(&self.ledger).balance_of(account)
    }

    pub fn share_balance(&self, share_id: ShareId, account: &str) -> u128 {
        lock(&self.shares).balance_of(share_id, account)
    }

    pub fn positions(&self, account: &str) -> Vec<PositionInfo> {
        lock(&self.shares).positions_of(account)
    }

    pub fn events_since(&self, since: u64) -> Vec<EventRecord> {
        self.events.since(since)
    }

    pub fn config(&self) -> MarketConfig {
        self.config_read().clone()
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            markets: self.markets.len(),
            assertions: self.assertions.len(),
            ledger: lock(&self.ledger).stats(),
            shares: lock(&self.shares).stats().clone(),
        }
    }

    // ===== HOLDER OPERATIONS =====

    pub fn transfer_shares(
        &self,
        caller: &str,
        to: &str,
        share_id: ShareId,
        amount: u128,
    ) -> MarketResult<()> {
        self.run("transfer_shares", || {
            if amount == 0 {
                return Err(MarketError::InvalidAmount("share amount must be positive".into()));
            }
            if to.trim().is_empty() {
                return Err(MarketError::InvalidAmount("recipient must be set".into()));
            }
            lock(&self.shares).transfer(share_id, caller, to, amount)?;
            self.emit(self.clock.now(), MarketEvent::SharesTransferred {
                share_id,
                from: caller.to_string(),
                to: to.to_string(),
                amount,
            });
            Ok(())
        })
    }

    // ===== ADMIN =====

    /// Credit new collateral to `account`; returns the new balance
    pub fn mint_collateral(&self, caller: &str, account: &str, amount: u64) -> MarketResult<u64> {
        self.run("mint_collateral", || {
            self.ensure_admin(caller)?;
            if amount == 0 {
                return Err(MarketError::InvalidAmount("mint amount must be positive".into()));
            }
            let balance = {
                let mut ledger = lock(&self.ledger);
                ledger.mint(account, amount)?;
                ledger.balance_of(account)
            };
            self.emit(
                self.clock.now(),
                MarketEvent::CollateralMinted { account: account.to_string(), amount },
            );
            Ok(balance)
        })
    }

    pub fn update_config(&self, caller: &str, update: ConfigUpdate) -> MarketResult<MarketConfig> {
        self.run("update_config", || {
            let updated = {
                let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
                if config.admin != caller {
                    return Err(MarketError::NotAdmin(caller.to_string()));
                }
                config.apply(update)?;
                config.clone()
            };
            info!(admin = caller, "configuration updated");
            self.emit(self.clock.now(), MarketEvent::ConfigUpdated { admin: caller.to_string() });
            Ok(updated)
        })
    }

    /// Add (`allowed = true`) or remove an account from a whitelist
    pub fn set_whitelisted(
        &self,
        caller: &str,
        kind: WhitelistKind,
        account: &str,
        allowed: bool,
    ) -> MarketResult<()> {
        self.run("set_whitelisted", || {
            {
                let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
                if config.admin != caller {
                    return Err(MarketError::NotAdmin(caller.to_string()));
                }
                let list = match kind {
                    WhitelistKind::Asserter => &mut config.asserter_whitelist,
                    WhitelistKind::Disputer => &mut config.disputer_whitelist,
                };
                if allowed {
                    list.insert(account.to_string());
                } else {
                    list.remove(account);
                }
            }
            self.emit(self.clock.now(), MarketEvent::WhitelistUpdated {
                admin: caller.to_string(),
                account: account.to_string(),
                allowed,
            });
            Ok(())
        })
    }

    // ===== INTERNALS =====

    /// Run an operation, logging its error (if any) at debug level
    fn run<T>(&self, op: &'static str, f: impl FnOnce() -> MarketResult<T>) -> MarketResult<T> {
        f().map_err(|err| {
            debug!(op, kind = ?err.kind(), error = %err, "operation rejected");
            err
        })
    }

    fn emit(&self, now: u64, event: MarketEvent) {
        self.events.emit(now, event);
    }

    fn config_read(&self) -> RwLockReadGuard<'_, MarketConfig> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_admin(&self, caller: &str) -> MarketResult<()> {
        if self.config_read().admin != caller {
            return Err(MarketError::NotAdmin(caller.to_string()));
        }
        Ok(())
    }

    fn allocate_share_id(&self) -> ShareId {
        self.next_share_id.fetch_add(1, Ordering::SeqCst)
    }

    fn market_record(&self, market_id: u64) -> MarketResult<Arc<Mutex<MarketRecord>>> {
        self.markets.get(market_id).ok_or(MarketError::MarketNotFound(market_id))
    }

    fn assertion_record(&self, assertion_id: u64) -> MarketResult<Arc<Mutex<Assertion>>> {
        self.assertions.get(assertion_id).ok_or(MarketError::AssertionNotFound(assertion_id))
    }

    /// Apply the injected policy, or the config whitelists if none
    fn with_policy_check<T>(&self, check: impl FnOnce(&dyn AssertionPolicy) -> T) -> T {
        match &self.policy {
            Some(policy) => check(policy.as_ref()),
            None => check(&*self.config_read()),
        }
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================


// ============================================================================
// TESTS
// ============================================================================
