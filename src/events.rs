// ============================================================================
// Events - Optimistic Prediction Market
// ============================================================================
//
// Every state change emits a MarketEvent. Events are kept in a bounded
// in-memory log (for indexers polling GET /events) and written to the
// tracing output.
//
// ============================================================================

use crate::market_resolve::{Outcome, Resolution};
use crate::registry::lock;
use crate::shares::ShareId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::info;

/// Number of events retained in memory
pub const EVENT_LOG_CAPACITY: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    MarketInitialized { market_id: u64, owner: String, reward: u64, required_bond: u64 },
    PoolInitialized { market_id: u64, owner: String, collateral: u64, lp_minted: u128 },
    LiquidityDeposited { market_id: u64, account: String, amount: u64, lp_minted: u128 },
    LiquidityWithdrawn { market_id: u64, account: String, lp_burned: u128, collateral: u64 },
    OutcomeBought {
        market_id: u64,
        account: String,
        outcome: Outcome,
        collateral: u64,
        shares: u128,
    },
    OutcomeSold {
        market_id: u64,
        account: String,
        outcome: Outcome,
        shares: u128,
        collateral: u64,
    },
    LpRedeemed { market_id: u64, account: String, lp_burned: u128, issued_a: u128, issued_b: u128 },
    OutcomeTokensSettled {
        market_id: u64,
        account: String,
        resolution: Resolution,
        burned_a: u128,
        burned_b: u128,
        payout: u64,
    },
    AssertionMade {
        assertion_id: u64,
        market_id: u64,
        asserter: String,
        claim: String,
        bond: u64,
        expires_at: u64,
    },
    AssertionDisputed { assertion_id: u64, market_id: u64, disputer: String },
    AssertionSettled {
        assertion_id: u64,
        market_id: u64,
        disputed: bool,
        resolution: bool,
        winner: String,
        payout: u64,
        oracle_fee: u64,
    },
    MarketResolved { market_id: u64, assertion_id: u64, resolution: Resolution, reward_paid: u64 },
    VerdictRecorded { assertion_id: u64, dispute_key: String, verdict: bool },
    ConfigUpdated { admin: String },
    WhitelistUpdated { admin: String, account: String, allowed: bool },
    CollateralMinted { account: String, amount: u64 },
    SharesTransferred { share_id: ShareId, from: String, to: String, amount: u128 },
}

impl MarketEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MarketEvent::MarketInitialized { .. } => "market_initialized",
            MarketEvent::PoolInitialized { .. } => "pool_initialized",
            MarketEvent::LiquidityDeposited { .. } => "liquidity_deposited",
            MarketEvent::LiquidityWithdrawn { .. } => "liquidity_withdrawn",
            MarketEvent::OutcomeBought { .. } => "outcome_bought",
            MarketEvent::OutcomeSold { .. } => "outcome_sold",
            MarketEvent::LpRedeemed { .. } => "lp_redeemed",
            MarketEvent::OutcomeTokensSettled { .. } => "outcome_tokens_settled",
            MarketEvent::AssertionMade { .. } => "assertion_made",
            MarketEvent::AssertionDisputed { .. } => "assertion_disputed",
            MarketEvent::AssertionSettled { .. } => "assertion_settled",
            MarketEvent::MarketResolved { .. } => "market_resolved",
            MarketEvent::VerdictRecorded { .. } => "verdict_recorded",
            MarketEvent::ConfigUpdated { .. } => "config_updated",
            MarketEvent::WhitelistUpdated { .. } => "whitelist_updated",
            MarketEvent::CollateralMinted { .. } => "collateral_minted",
            MarketEvent::SharesTransferred { .. } => "shares_transferred",
        }
    }
}

/// An event with its position in the log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub timestamp: u64,
    pub event: MarketEvent,
}

#[derive(Debug, Default)]
struct EventLogInner {
    records: VecDeque<EventRecord>,
    next_seq: u64,
}

#[derive(Debug, Default)]
pub struct EventLog {
    inner: Mutex<EventLogInner>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return its sequence number
    pub fn emit(&self, timestamp: u64, event: MarketEvent) -> u64 {
        let mut inner = lock(&self.inner);
        let seq = inner.next_seq;
        inner.next_seq += 1;

        info!(seq, event = event.name(), detail = ?event, "market event");

        inner.records.push_back(EventRecord { seq, timestamp, event });
        if inner.records.len() > EVENT_LOG_CAPACITY {
            inner.records.pop_front();
        }
        seq
    }

    /// Retained events with `seq >= since`, oldest first
    pub fn since(&self, since: u64) -> Vec<EventRecord> {
        lock(&self.inner).records.iter().filter(|r| r.seq >= since).cloned().collect()
    }

    pub fn last(&self) -> Option<EventRecord> {
        lock(&self.inner).records.back().cloned()
    }
}
