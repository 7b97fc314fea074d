// ============================================================================
// Shares Module - Optimistic Prediction Market
// ============================================================================
//
// Fungible share tokens issued by the pool and settlement engines.
//
// Each market owns three tokens:
//   - outcome A shares: redeemable against the reserves if A wins
//   - outcome B shares: redeemable against the reserves if B wins
//   - LP shares: a proportional claim on both outcome reserves
//
// Only the engines mint or burn. Holders move shares freely with transfer.
//
// ============================================================================

pub mod redeem;

pub use redeem::*;

use crate::error::{MarketError, MarketResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Globally unique token id
pub type ShareId = u64;

/// What a share token represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareKind {
    OutcomeA,
    OutcomeB,
    Lp,
}

/// A single fungible share token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareToken {
    pub id: ShareId,
    pub market_id: u64,
    pub kind: ShareKind,
    pub total_supply: u128,
    balances: HashMap<String, u128>,
}

impl ShareToken {
    fn new(id: ShareId, market_id: u64, kind: ShareKind) -> Self {
        Self { id, market_id, kind, total_supply: 0, balances: HashMap::new() }
    }

    pub fn balance_of(&self, account: &str) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn holders(&self) -> usize {
        self.balances.values().filter(|b| **b > 0).count()
    }
}

/// A non-zero holding, as reported by `ShareLedger::positions_of`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionInfo {
    pub share_id: ShareId,
    pub market_id: u64,
    pub kind: ShareKind,
    pub balance: u128,
}

/// Statistics for the share system
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharesStats {
    pub tokens: usize,
    pub total_minted: u128,
    pub total_burned: u128,
    pub total_transfers: u64,
}

/// Balances of every share token
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ShareLedger {
    tokens: HashMap<ShareId, ShareToken>,
    stats: SharesStats,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly allocated token id
    pub fn register(&mut self, id: ShareId, market_id: u64, kind: ShareKind) {
        self.tokens.entry(id).or_insert_with(|| ShareToken::new(id, market_id, kind));
        self.stats.tokens = self.tokens.len();
    }

    pub fn token(&self, id: ShareId) -> Option<&ShareToken> {
        self.tokens.get(&id)
    }

    pub fn balance_of(&self, id: ShareId, account: &str) -> u128 {
        self.tokens.get(&id).map(|t| t.balance_of(account)).unwrap_or(0)
    }

    pub fn total_supply(&self, id: ShareId) -> u128 {
        self.tokens.get(&id).map(|t| t.total_supply).unwrap_or(0)
    }

    /// Fail unless `account` holds at least `amount` of token `id`
    pub fn ensure_balance(&self, id: ShareId, account: &str, amount: u128) -> MarketResult<()> {
        let available = self.balance_of(id, account);
        if available < amount {
            return Err(MarketError::InsufficientShares {
                share_id: id,
                account: account.to_string(),
                available,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Fail unless `mint(id, to, amount)` would succeed
    pub fn ensure_mint(&self, id: ShareId, to: &str, amount: u128) -> MarketResult<()> {
        let token = self
            .tokens
            .get(&id)
            .ok_or_else(|| MarketError::InvalidOutcome(format!("unknown share token {}", id)))?;
        token.total_supply.checked_add(amount).ok_or(MarketError::ArithmeticOverflow)?;
        token.balance_of(to).checked_add(amount).ok_or(MarketError::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn mint(&mut self, id: ShareId, to: &str, amount: u128) -> MarketResult<()> {
        let token = self.token_mut(id)?;
        let supply = token.total_supply.checked_add(amount).ok_or(MarketError::ArithmeticOverflow)?;
        let balance =
            token.balance_of(to).checked_add(amount).ok_or(MarketError::ArithmeticOverflow)?;
        token.total_supply = supply;
        token.balances.insert(to.to_string(), balance);
        self.stats.total_minted = self.stats.total_minted.saturating_add(amount);
        Ok(())
    }

    pub fn burn(&mut self, id: ShareId, from: &str, amount: u128) -> MarketResult<()> {
        self.ensure_balance(id, from, amount)?;
        let token = self.token_mut(id)?;
        let balance = token.balance_of(from) - amount;
        token.balances.insert(from.to_string(), balance);
        token.total_supply = token.total_supply.saturating_sub(amount);
        self.stats.total_burned = self.stats.total_burned.saturating_add(amount);
        Ok(())
    }

    pub fn transfer(
        &mut self,
        id: ShareId,
        from: &str,
        to: &str,
        amount: u128,
    ) -> MarketResult<()> {
        self.ensure_balance(id, from, amount)?;
        let token = self.token_mut(id)?;
        if from != to {
            let credited =
                token.balance_of(to).checked_add(amount).ok_or(MarketError::ArithmeticOverflow)?;
            let debited = token.balance_of(from) - amount;
            token.balances.insert(from.to_string(), debited);
            token.balances.insert(to.to_string(), credited);
        }
        self.stats.total_transfers += 1;
        Ok(())
    }

    /// Every non-zero holding of `account`, ordered by share id
    pub fn positions_of(&self, account: &str) -> Vec<PositionInfo> {
        let mut positions: Vec<PositionInfo> = self
            .tokens
            .values()
            .filter_map(|t| {
                let balance = t.balance_of(account);
                (balance > 0).then(|| PositionInfo {
                    share_id: t.id,
                    market_id: t.market_id,
                    kind: t.kind,
                    balance,
                })
            })
            .collect();
        positions.sort_by_key(|p| p.share_id);
        positions
    }

    pub fn stats(&self) -> &SharesStats {
        &self.stats
    }

    fn token_mut(&mut self, id: ShareId) -> MarketResult<&mut ShareToken> {
        self.tokens
            .get_mut(&id)
            .ok_or_else(|| MarketError::InvalidOutcome(format!("unknown share token {}", id)))
    }
}
