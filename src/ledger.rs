/// Collateral Ledger
///
/// Fungible collateral balances for every account, including the module
/// escrow accounts that hold bonds, rewards and pool collateral without a
/// signer. Transfers are atomic: a transfer that would overdraw the payer
/// fails and changes nothing.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// MODULE ACCOUNTS
// ============================================================================

/// Escrow holding assertion bonds and market rewards
pub const BOND_ESCROW: &str = "escrow_bonds";

/// Escrow holding the collateral backing a market's liquidity pool
pub fn market_escrow(market_id: u64) -> String {
    format!("escrow_market_{}", market_id)
}

/// Transaction history is capped at this many entries
const MAX_HISTORY: usize = 10_000;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Transaction types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Mint,
    Transfer,
}

/// A single collateral movement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub tx_type: TxType,
    pub from: Option<String>,
    pub to: String,
    pub amount: u64,
    pub timestamp: i64,
    /// Human-readable reason, e.g. "assertion bond"
    pub memo: String,
}

impl Transaction {
    fn new(tx_type: TxType, from: Option<&str>, to: &str, amount: u64, memo: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tx_type,
            from: from.map(str::to_string),
            to: to.to_string(),
            amount,
            timestamp: chrono::Utc::now().timestamp(),
            memo: memo.to_string(),
        }
    }
}

/// Summary figures for the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    pub accounts: usize,
    pub transactions: u64,
    pub total_supply: u64,
}

// ============================================================================
// LEDGER
// ============================================================================

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CollateralLedger {
    balances: HashMap<String, u64>,
    history: Vec<Transaction>,
    /// Count of every transaction ever applied, including trimmed history
    sequence: u64,
}

impl CollateralLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &str) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Fail unless `account` holds at least `amount`
    pub fn ensure_balance(&self, account: &str, amount: u64) -> Result<(), LedgerError> {
        let available = self.balance_of(account);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: account.to_string(),
                available,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Fail unless `transfer(from, to, amount)` would succeed
    pub fn ensure_transfer(&self, from: &str, to: &str, amount: u64) -> Result<(), LedgerError> {
        self.ensure_balance(from, amount)?;
        if from != to && self.balance_of(to).checked_add(amount).is_none() {
            return Err(LedgerError::BalanceOverflow(to.to_string()));
        }
        Ok(())
    }

    /// Create new collateral (admin faucet)
    pub fn mint(&mut self, to: &str, amount: u64) -> Result<String, LedgerError> {
        let balance = self.balance_of(to);
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::BalanceOverflow(to.to_string()))?;
        self.balances.insert(to.to_string(), updated);
        Ok(self.record(Transaction::new(TxType::Mint, None, to, amount, "mint")))
    }

    /// Move `amount` from `from` to `to`
    pub fn transfer(
        &mut self,
        from: &str,
        to: &str,
        amount: u64,
        memo: &str,
    ) -> Result<String, LedgerError> {
        self.ensure_balance(from, amount)?;
        if from != to {
            let to_balance = self
                .balance_of(to)
                .checked_add(amount)
                .ok_or_else(|| LedgerError::BalanceOverflow(to.to_string()))?;
            let from_balance = self.balance_of(from) - amount;
            self.balances.insert(from.to_string(), from_balance);
            self.balances.insert(to.to_string(), to_balance);
        }
        Ok(self.record(Transaction::new(TxType::Transfer, Some(from), to, amount, memo)))
    }

    /// Pay several recipients out of one account. Either every payment is
    /// applied or none is.
    pub fn disburse(
        &mut self,
        from: &str,
        payments: &[(String, u64)],
        memo: &str,
    ) -> Result<Vec<String>, LedgerError> {
        let total = payments
            .iter()
            .try_fold(0u64, |acc, (_, amount)| acc.checked_add(*amount))
            .ok_or_else(|| LedgerError::BalanceOverflow(from.to_string()))?;
        self.ensure_balance(from, total)?;

        let mut credits: HashMap<&str, u64> = HashMap::new();
        for (to, amount) in payments {
            let credit = credits.entry(to.as_str()).or_insert(0);
            *credit = credit.saturating_add(*amount);
        }
        for (to, amount) in &credits {
            if *to != from && self.balance_of(to).checked_add(*amount).is_none() {
                return Err(LedgerError::BalanceOverflow(to.to_string()));
            }
        }

        payments
            .iter()
            .filter(|(_, amount)| *amount > 0)
            .map(|(to, amount)| self.transfer(from, to, *amount, memo))
            .collect()
    }

    pub fn recent_transactions(&self, limit: usize) -> Vec<&Transaction> {
        self.history.iter().rev().take(limit).collect()
    }

    pub fn transactions_for(&self, account: &str) -> Vec<&Transaction> {
        self.history
            .iter()
            .filter(|tx| tx.to == account || tx.from.as_deref() == Some(account))
            .collect()
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            accounts: self.balances.len(),
            transactions: self.sequence,
            total_supply: self.balances.values().fold(0u64, |acc, b| acc.saturating_add(*b)),
        }
    }

    fn record(&mut self, tx: Transaction) -> String {
        let id = tx.id.clone();
        self.sequence += 1;
        self.history.push(tx);
        if self.history.len() > MAX_HISTORY {
            self.history.remove(0);
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_and_transfer() {
        let mut ledger = CollateralLedger::new();
        ledger.mint("alice", 1_000).unwrap();
        ledger.transfer("alice", "bob", 400, "gift").unwrap();

        assert_eq!(ledger.balance_of("alice"), 600);
        assert_eq!(ledger.balance_of("bob"), 400);
        assert_eq!(ledger.stats().total_supply, 1_000);
        assert_eq!(ledger.transactions_for("bob").len(), 1);
    }

    #[test]
    fn test_overdraw_changes_nothing() {
        let mut ledger = CollateralLedger::new();
        ledger.mint("alice", 100).unwrap();

        let err = ledger.transfer("alice", "bob", 101, "too much").unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                account: "alice".into(),
                available: 100,
                requested: 101,
            }
        );
        assert_eq!(ledger.balance_of("alice"), 100);
        assert_eq!(ledger.balance_of("bob"), 0);
        assert_eq!(ledger.stats().transactions, 1);
    }

    #[test]
    fn test_escrow_accounts_need_no_signer() {
        let mut ledger = CollateralLedger::new();
        ledger.mint("alice", 50).unwrap();
        ledger.transfer("alice", BOND_ESCROW, 50, "bond").unwrap();
        ledger.transfer(BOND_ESCROW, &market_escrow(7), 20, "move").unwrap();

        assert_eq!(ledger.balance_of(BOND_ESCROW), 30);
        assert_eq!(ledger.balance_of("escrow_market_7"), 20);
    }

    #[test]
    fn test_disburse_is_all_or_nothing() {
        let mut ledger = CollateralLedger::new();
        ledger.mint(BOND_ESCROW, 300).unwrap();

        let too_much = vec![("treasury".to_string(), 100), ("bob".to_string(), 201)];
        assert!(ledger.disburse(BOND_ESCROW, &too_much, "split").is_err());
        assert_eq!(ledger.balance_of(BOND_ESCROW), 300);
        assert_eq!(ledger.balance_of("treasury"), 0);

        let split = vec![
            ("treasury".to_string(), 100),
            ("bob".to_string(), 200),
            ("carol".to_string(), 0),
        ];
        let ids = ledger.disburse(BOND_ESCROW, &split, "split").unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ledger.balance_of("bob"), 200);
        assert_eq!(ledger.balance_of(BOND_ESCROW), 0);
    }

    #[test]
    fn test_ensure_transfer_detects_overflow() {
        let mut ledger = CollateralLedger::new();
        ledger.mint("alice", 10).unwrap();
        ledger.mint("bob", u64::MAX).unwrap();
        assert_eq!(
            ledger.ensure_transfer("alice", "bob", 1),
            Err(LedgerError::BalanceOverflow("bob".into()))
        );
        assert!(ledger.ensure_transfer("alice", "carol", 10).is_ok());
    }

    #[test]
    fn test_self_transfer_is_noop() {
        let mut ledger = CollateralLedger::new();
        ledger.mint("alice", 10).unwrap();
        ledger.transfer("alice", "alice", 10, "loop").unwrap();
        assert_eq!(ledger.balance_of("alice"), 10);
    }
}
