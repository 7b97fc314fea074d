use crate::error::{MarketError, MarketResult};
use crate::shares::ShareId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Claim that declares a market void. Outcome labels may not use it.
pub const UNRESOLVABLE: &str = "Unresolvable";

/// Hex SHA-256 of an outcome label or claim
pub fn outcome_hash(label: &str) -> String {
    hex::encode(Sha256::digest(label.as_bytes()))
}

/// Outcome selector for trading operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    A,
    B,
}

impl Outcome {
    pub fn opposite(&self) -> Self {
        match self {
            Outcome::A => Outcome::B,
            Outcome::B => Outcome::A,
        }
    }
}

impl std::str::FromStr for Outcome {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Outcome::A),
            "B" => Ok(Outcome::B),
            other => Err(MarketError::InvalidOutcome(format!("expected A or B, got {:?}", other))),
        }
    }
}

/// How a market was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    OutcomeA,
    OutcomeB,
    Unresolvable,
}

impl Resolution {
    /// The single winning outcome, if the market is not void
    pub fn winner(&self) -> Option<Outcome> {
        match self {
            Resolution::OutcomeA => Some(Outcome::A),
            Resolution::OutcomeB => Some(Outcome::B),
            Resolution::Unresolvable => None,
        }
    }
}

/// Parameters for `initialize_market`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMarket {
    pub description: String,
    pub outcome_a_label: String,
    pub outcome_b_label: String,
    #[serde(default)]
    pub reward: u64,
    pub required_bond: u64,
}

impl NewMarket {
    /// Input checks that need no state beyond the configured minimum bond
    pub fn validate(&self, min_bond: u64) -> MarketResult<()> {
        let a = self.outcome_a_label.trim();
        let b = self.outcome_b_label.trim();
        if a.is_empty() || b.is_empty() {
            return Err(MarketError::EmptyOutcomeLabel);
        }
        if a == b {
            return Err(MarketError::IdenticalOutcomeLabels);
        }
        for label in [a, b] {
            if label == UNRESOLVABLE {
                return Err(MarketError::ReservedOutcomeLabel(label.to_string()));
            }
        }
        if self.description.trim().is_empty() {
            return Err(MarketError::EmptyDescription);
        }
        if self.required_bond < min_bond {
            return Err(MarketError::BelowMinimumBond {
                minimum: min_bond,
                provided: self.required_bond,
            });
        }
        Ok(())
    }
}

/// A two-outcome prediction market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: u64,
    pub owner: String,
    pub description: String,
    pub resolved: bool,
    /// Set while an assertion is live or after a true settlement
    pub asserted_outcome_hash: Option<String>,
    /// Escrowed at creation, paid to the asserter on a true settlement
    pub reward: u64,
    pub required_bond: u64,
    pub outcome_a_label: String,
    pub outcome_b_label: String,
    pub outcome_a_share_id: ShareId,
    pub outcome_b_share_id: ShareId,
    pub pool_initialized: bool,
    pub pool_owner: Option<String>,
    pub created_at: u64,
    pub resolved_at: Option<u64>,
}

impl Market {
    pub fn new(
        id: u64,
        owner: &str,
        params: NewMarket,
        share_ids: (ShareId, ShareId),
        created_at: u64,
    ) -> Self {
        Self {
            id,
            owner: owner.to_string(),
            description: params.description.trim().to_string(),
            resolved: false,
            asserted_outcome_hash: None,
            reward: params.reward,
            required_bond: params.required_bond,
            outcome_a_label: params.outcome_a_label.trim().to_string(),
            outcome_b_label: params.outcome_b_label.trim().to_string(),
            outcome_a_share_id: share_ids.0,
            outcome_b_share_id: share_ids.1,
            pool_initialized: false,
            pool_owner: None,
            created_at,
            resolved_at: None,
        }
    }

    /// Map a claim onto A, B or the void sentinel
    pub fn resolution_for_claim(&self, claim: &str) -> Option<Resolution> {
        self.resolution_for_hash(&outcome_hash(claim.trim()))
    }

    fn resolution_for_hash(&self, hash: &str) -> Option<Resolution> {
        if hash == outcome_hash(&self.outcome_a_label) {
            Some(Resolution::OutcomeA)
        } else if hash == outcome_hash(&self.outcome_b_label) {
            Some(Resolution::OutcomeB)
        } else if hash == outcome_hash(UNRESOLVABLE) {
            Some(Resolution::Unresolvable)
        } else {
            None
        }
    }

    /// The settled resolution, once the market is resolved
    pub fn resolution(&self) -> Option<Resolution> {
        if !self.resolved {
            return None;
        }
        self.asserted_outcome_hash.as_deref().and_then(|h| self.resolution_for_hash(h))
    }

    pub fn share_id(&self, outcome: Outcome) -> ShareId {
        match outcome {
            Outcome::A => self.outcome_a_share_id,
            Outcome::B => self.outcome_b_share_id,
        }
    }

    pub fn ensure_unresolved(&self) -> MarketResult<()> {
        if self.resolved {
            return Err(MarketError::MarketAlreadyResolved(self.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> NewMarket {
        NewMarket {
            description: "Will it rain in Lisbon tomorrow?".into(),
            outcome_a_label: "Yes".into(),
            outcome_b_label: "No".into(),
            reward: 0,
            required_bond: 100_000,
        }
    }

    #[test]
    fn test_validate_rejects_bad_labels() {
        let mut p = params();
        p.outcome_b_label = "  ".into();
        assert_eq!(p.validate(0), Err(MarketError::EmptyOutcomeLabel));

        let mut p = params();
        p.outcome_b_label = "Yes".into();
        assert_eq!(p.validate(0), Err(MarketError::IdenticalOutcomeLabels));

        let mut p = params();
        p.outcome_a_label = UNRESOLVABLE.into();
        assert!(matches!(p.validate(0), Err(MarketError::ReservedOutcomeLabel(_))));

        let mut p = params();
        p.description = String::new();
        assert_eq!(p.validate(0), Err(MarketError::EmptyDescription));
    }

    #[test]
    fn test_validate_minimum_bond() {
        assert!(params().validate(100_000).is_ok());
        assert_eq!(
            params().validate(100_001),
            Err(MarketError::BelowMinimumBond { minimum: 100_001, provided: 100_000 })
        );
    }

    #[test]
    fn test_claims_map_to_resolutions() {
        let market = Market::new(0, "owner", params(), (1, 2), 0);
        assert_eq!(market.resolution_for_claim("Yes"), Some(Resolution::OutcomeA));
        assert_eq!(market.resolution_for_claim("No"), Some(Resolution::OutcomeB));
        assert_eq!(market.resolution_for_claim(UNRESOLVABLE), Some(Resolution::Unresolvable));
        assert_eq!(market.resolution_for_claim("Maybe"), None);
    }

    #[test]
    fn test_resolution_requires_resolved_flag() {
        let mut market = Market::new(0, "owner", params(), (1, 2), 0);
        market.asserted_outcome_hash = Some(outcome_hash("No"));
        assert_eq!(market.resolution(), None);

        market.resolved = true;
        assert_eq!(market.resolution(), Some(Resolution::OutcomeB));
        assert_eq!(market.resolution().and_then(|r| r.winner()), Some(Outcome::B));
    }

    #[test]
    fn test_outcome_parse() {
        assert_eq!("a".parse::<Outcome>().unwrap(), Outcome::A);
        assert_eq!("B".parse::<Outcome>().unwrap(), Outcome::B);
        assert!("C".parse::<Outcome>().is_err());
    }
}
