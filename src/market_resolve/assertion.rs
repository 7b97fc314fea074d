use crate::config::BASIS_POINTS;
use crate::error::{MarketError, MarketResult};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ASSERTION LIFECYCLE
// ============================================================================

/// Where an assertion is in its lifecycle
///
/// Flow: Open → (Undisputed | Disputed) → Settled(true | false)
///
/// `Undisputed` is an open assertion whose liveness window has passed
/// without a challenge; only `settle` can move it on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "resolution")]
pub enum AssertionState {
    Open,
    Undisputed,
    Disputed,
    Settled(bool),
}

impl fmt::Display for AssertionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssertionState::Open => write!(f, "open"),
            AssertionState::Undisputed => write!(f, "undisputed"),
            AssertionState::Disputed => write!(f, "disputed"),
            AssertionState::Settled(resolution) => write!(f, "settled({})", resolution),
        }
    }
}

/// A bonded claim about a market's outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assertion {
    pub id: u64,
    pub market_id: u64,
    pub asserter: String,
    /// Claimed outcome label, as submitted
    pub claim: String,
    pub bond: u64,
    pub liveness: u64,
    pub created_at: u64,
    pub expires_at: u64,
    pub disputer: Option<String>,
    pub settled: bool,
    pub settlement_resolution: bool,
}

impl Assertion {
    pub fn new(
        id: u64,
        market_id: u64,
        asserter: &str,
        claim: &str,
        bond: u64,
        liveness: u64,
        now: u64,
    ) -> Self {
        Self {
            id,
            market_id,
            asserter: asserter.to_string(),
            claim: claim.to_string(),
            bond,
            liveness,
            created_at: now,
            expires_at: now.saturating_add(liveness),
            disputer: None,
            settled: false,
            settlement_resolution: false,
        }
    }

    pub fn state(&self, now: u64) -> AssertionState {
        if self.settled {
            AssertionState::Settled(self.settlement_resolution)
        } else if self.disputer.is_some() {
            AssertionState::Disputed
        } else if now >= self.expires_at {
            AssertionState::Undisputed
        } else {
            AssertionState::Open
        }
    }

    /// Checks `dispute` must pass, policy aside
    pub fn ensure_disputable(&self, now: u64) -> MarketResult<()> {
        if self.settled {
            return Err(MarketError::AssertionAlreadySettled(self.id));
        }
        if self.disputer.is_some() {
            return Err(MarketError::AssertionAlreadyDisputed(self.id));
        }
        if now >= self.expires_at {
            return Err(MarketError::AssertionExpired(self.id));
        }
        Ok(())
    }

    /// Checks `settle` must pass before a verdict is looked up
    pub fn ensure_settleable(&self, now: u64) -> MarketResult<()> {
        if self.settled {
            return Err(MarketError::AssertionAlreadySettled(self.id));
        }
        if self.disputer.is_none() && now < self.expires_at {
            return Err(MarketError::AssertionNotExpired(self.id));
        }
        Ok(())
    }

    /// Ancillary data bound into the dispute key: assertion id and asserter
    pub fn ancillary_data(&self) -> String {
        format!("assertionId:{},asserter:{}", self.id, self.asserter)
    }
}

// ============================================================================
// BONDS
// ============================================================================

/// Bond demanded from asserter and disputer alike.
///
/// `default_fee * 10000 / burned_bond_percentage` is the smallest bond whose
/// burned share still covers the flat default fee.
pub fn required_bond(
    market_bond: u64,
    default_fee: u64,
    burned_bond_percentage: u64,
) -> MarketResult<u64> {
    if burned_bond_percentage == 0 {
        return Err(MarketError::InvalidConfig("burned_bond_percentage is zero".into()));
    }
    let floor = default_fee
        .checked_mul(BASIS_POINTS)
        .ok_or(MarketError::ArithmeticOverflow)?
        / burned_bond_percentage;
    Ok(market_bond.max(floor))
}

/// Distribution of the two escrowed bonds after a disputed settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BondSplit {
    pub oracle_fee: u64,
    pub winner_amount: u64,
}

pub fn dispute_split(bond: u64, burned_bond_percentage: u64) -> MarketResult<BondSplit> {
    let oracle_fee = burned_bond_percentage
        .checked_mul(bond)
        .ok_or(MarketError::ArithmeticOverflow)?
        / BASIS_POINTS;
    let escrowed = bond.checked_mul(2).ok_or(MarketError::ArithmeticOverflow)?;
    let winner_amount = escrowed
        .checked_sub(oracle_fee)
        .ok_or_else(|| MarketError::InvalidConfig("oracle fee exceeds escrowed bonds".into()))?;
    Ok(BondSplit { oracle_fee, winner_amount })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assertion() -> Assertion {
        Assertion::new(4, 1, "alice", "Yes", 100_000, 7_200, 1_000)
    }

    #[test]
    fn test_required_bond_uses_fee_floor() {
        // 100 * 10000 / 1000 = 1000
        assert_eq!(required_bond(500, 100, 1_000).unwrap(), 1_000);
        assert_eq!(required_bond(100_000, 100, 1_000).unwrap(), 100_000);
        assert!(required_bond(1, 1, 0).is_err());
    }

    #[test]
    fn test_dispute_split_example() {
        let split = dispute_split(100_000, 1_000).unwrap();
        assert_eq!(split.oracle_fee, 10_000);
        assert_eq!(split.winner_amount, 190_000);
    }

    #[test]
    fn test_burned_share_covers_default_fee() {
        for (fee, pct) in [(100u64, 1_000u64), (7, 3), (999, 10_000), (1, 1)] {
            let bond = required_bond(0, fee, pct).unwrap();
            let split = dispute_split(bond, pct).unwrap();
            assert!(split.oracle_fee + 1 >= fee);
            assert_eq!(split.oracle_fee + split.winner_amount, bond * 2);
        }
    }

    #[test]
    fn test_state_transitions() {
        let mut a = assertion();
        assert_eq!(a.expires_at, 8_200);
        assert_eq!(a.state(8_199), AssertionState::Open);
        assert_eq!(a.state(8_200), AssertionState::Undisputed);

        a.disputer = Some("bob".into());
        assert_eq!(a.state(9_999), AssertionState::Disputed);

        a.settled = true;
        a.settlement_resolution = false;
        assert_eq!(a.state(9_999), AssertionState::Settled(false));
    }

    #[test]
    fn test_dispute_window() {
        let mut a = assertion();
        assert!(a.ensure_disputable(8_199).is_ok());
        assert_eq!(a.ensure_disputable(8_200), Err(MarketError::AssertionExpired(4)));

        a.disputer = Some("bob".into());
        assert_eq!(a.ensure_disputable(1_500), Err(MarketError::AssertionAlreadyDisputed(4)));
    }

    #[test]
    fn test_settle_window() {
        let mut a = assertion();
        assert_eq!(a.ensure_settleable(8_199), Err(MarketError::AssertionNotExpired(4)));
        assert!(a.ensure_settleable(8_200).is_ok());

        // Disputed assertions ignore expiry
        a.disputer = Some("bob".into());
        assert!(a.ensure_settleable(1_001).is_ok());

        a.settled = true;
        assert_eq!(a.ensure_settleable(9_000), Err(MarketError::AssertionAlreadySettled(4)));
    }

    #[test]
    fn test_ancillary_binds_id_and_asserter() {
        assert_eq!(assertion().ancillary_data(), "assertionId:4,asserter:alice");
    }
}
