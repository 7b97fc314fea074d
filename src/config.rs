// ============================================================================
// Configuration - Optimistic Prediction Market
// ============================================================================
//
// Two layers:
//   - MarketConfig: admin key-value state (fees, treasury, liveness, policy
//     flags, whitelists). Changes apply to every subsequent operation,
//     including assertions opened under an older fee schedule.
//   - ServerConfig: process settings for the HTTP binary.
//
// Both load from the environment (and a .env file if present).
//
// ============================================================================

use crate::error::{MarketError, MarketResult};
use crate::market_resolve::policy::AssertionPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::Level;

/// Basis-point denominator for `burned_bond_percentage`
pub const BASIS_POINTS: u64 = 10_000;

/// Denominator for `swap_fee_permille`
pub const PERMILLE: u64 = 1_000;

/// Admin-controlled market parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketConfig {
    /// Only account allowed to change configuration or record verdicts
    pub admin: String,
    /// Receives the oracle fee burned from losing bonds
    pub treasury: String,
    /// Flat fee the burned part of a bond must always cover
    pub default_fee: u64,
    /// Share of a disputed bond paid to the treasury, in basis points
    pub burned_bond_percentage: u64,
    /// Liveness window given to every new assertion, in seconds
    pub min_liveness: u64,
    /// Fee on buys and sells, in permille
    pub swap_fee_permille: u64,
    /// Smallest collateral amount accepted by `initialize_pool`
    pub min_liquidity: u64,
    /// Smallest `required_bond` accepted by `initialize_market`
    pub min_bond: u64,
    /// Identifier folded into every dispute key
    pub identifier: String,
    pub block_assertions: bool,
    pub validate_asserters: bool,
    pub validate_disputers: bool,
    #[serde(default)]
    pub asserter_whitelist: BTreeSet<String>,
    #[serde(default)]
    pub disputer_whitelist: BTreeSet<String>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            admin: "admin".to_string(),
            treasury: "treasury".to_string(),
            default_fee: 100,
            burned_bond_percentage: 1_000,
            min_liveness: 7_200,
            swap_fee_permille: 20,
            min_liquidity: 1_000,
            min_bond: 0,
            identifier: "YES_OR_NO_QUERY".to_string(),
            block_assertions: false,
            validate_asserters: false,
            validate_disputers: false,
            asserter_whitelist: BTreeSet::new(),
            disputer_whitelist: BTreeSet::new(),
        }
    }
}

impl MarketConfig {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> MarketResult<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            admin: env_or("ADMIN_ACCOUNT", defaults.admin)?,
            treasury: env_or("TREASURY_ACCOUNT", defaults.treasury)?,
            default_fee: env_or("DEFAULT_FEE", defaults.default_fee)?,
            burned_bond_percentage: env_or(
                "BURNED_BOND_PERCENTAGE",
                defaults.burned_bond_percentage,
            )?,
            min_liveness: env_or("MIN_LIVENESS_SECS", defaults.min_liveness)?,
            swap_fee_permille: env_or("SWAP_FEE_PERMILLE", defaults.swap_fee_permille)?,
            min_liquidity: env_or("MIN_LIQUIDITY", defaults.min_liquidity)?,
            min_bond: env_or("MIN_BOND", defaults.min_bond)?,
            identifier: env_or("PRICE_IDENTIFIER", defaults.identifier)?,
            block_assertions: env_or("BLOCK_ASSERTIONS", false)?,
            validate_asserters: env_or("VALIDATE_ASSERTERS", false)?,
            validate_disputers: env_or("VALIDATE_DISPUTERS", false)?,
            asserter_whitelist: BTreeSet::new(),
            disputer_whitelist: BTreeSet::new(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MarketResult<()> {
        if self.burned_bond_percentage == 0 || self.burned_bond_percentage > BASIS_POINTS {
            return Err(MarketError::InvalidConfig(format!(
                "burned_bond_percentage must be within 1..={}, got {}",
                BASIS_POINTS, self.burned_bond_percentage
            )));
        }
        if self.swap_fee_permille >= PERMILLE {
            return Err(MarketError::InvalidConfig(format!(
                "swap_fee_permille must be below {}, got {}",
                PERMILLE, self.swap_fee_permille
            )));
        }
        if self.admin.trim().is_empty() || self.treasury.trim().is_empty() {
            return Err(MarketError::InvalidConfig("admin and treasury must be set".into()));
        }
        Ok(())
    }

    /// Apply a partial update; the result is validated before it replaces `self`
    pub fn apply(&mut self, update: ConfigUpdate) -> MarketResult<()> {
        let mut next = self.clone();
        if let Some(treasury) = update.treasury {
            next.treasury = treasury;
        }
        if let Some(fee) = update.default_fee {
            next.default_fee = fee;
        }
        if let Some(pct) = update.burned_bond_percentage {
            next.burned_bond_percentage = pct;
        }
        if let Some(liveness) = update.min_liveness {
            next.min_liveness = liveness;
        }
        if let Some(fee) = update.swap_fee_permille {
            next.swap_fee_permille = fee;
        }
        if let Some(min) = update.min_liquidity {
            next.min_liquidity = min;
        }
        if let Some(min) = update.min_bond {
            next.min_bond = min;
        }
        if let Some(identifier) = update.identifier {
            next.identifier = identifier;
        }
        if let Some(flag) = update.block_assertions {
            next.block_assertions = flag;
        }
        if let Some(flag) = update.validate_asserters {
            next.validate_asserters = flag;
        }
        if let Some(flag) = update.validate_disputers {
            next.validate_disputers = flag;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}

impl AssertionPolicy for MarketConfig {
    fn allowed_to_assert(&self, account: &str) -> bool {
        !self.validate_asserters || self.asserter_whitelist.contains(account)
    }

    fn allowed_to_dispute(&self, account: &str) -> bool {
        !self.validate_disputers || self.disputer_whitelist.contains(account)
    }

    fn blocked(&self) -> bool {
        self.block_assertions
    }
}

/// Partial admin update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub treasury: Option<String>,
    pub default_fee: Option<u64>,
    pub burned_bond_percentage: Option<u64>,
    pub min_liveness: Option<u64>,
    pub swap_fee_permille: Option<u64>,
    pub min_liquidity: Option<u64>,
    pub min_bond: Option<u64>,
    pub identifier: Option<String>,
    pub block_assertions: Option<bool>,
    pub validate_asserters: Option<bool>,
    pub validate_disputers: Option<bool>,
}

/// Which whitelist an admin whitelist operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhitelistKind {
    Asserter,
    Disputer,
}

/// Settings for the HTTP binary
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub state_path: String,
    pub log_level: Level,
}

impl ServerConfig {
    pub fn from_env() -> MarketResult<Self> {
        dotenv::dotenv().ok();
        Ok(Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:1234".to_string())?,
            state_path: env_or("STATE_PATH", "data/state.json".to_string())?,
            log_level: parse_log_level(&env_or("LOG_LEVEL", "info".to_string())?)?,
        })
    }
}

/// Accepts the `tracing` level names, case-insensitively
pub fn parse_log_level(raw: &str) -> MarketResult<Level> {
    raw.trim()
        .parse()
        .map_err(|_| MarketError::InvalidConfig(format!("LOG_LEVEL {:?} is not a log level", raw)))
}

fn env_or<T: FromStr>(key: &str, default: T) -> MarketResult<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| {
                MarketError::InvalidConfig(format!("{} has an invalid value: {:?}", key, raw))
            }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(MarketConfig::default().validate().is_ok());
    }

    #[test]
    fn test_apply_rejects_zero_burn_percentage() {
        let mut config = MarketConfig::default();
        let update = ConfigUpdate {
            burned_bond_percentage: Some(0),
            default_fee: Some(7),
            ..Default::default()
        };

        assert!(config.apply(update).is_err());
        // Rejected updates leave every field untouched
        assert_eq!(config.default_fee, 100);
        assert_eq!(config.burned_bond_percentage, 1_000);
    }

    #[test]
    fn test_apply_rejects_full_swap_fee() {
        let mut config = MarketConfig::default();
        let update = ConfigUpdate { swap_fee_permille: Some(1_000), ..Default::default() };
        assert!(config.apply(update).is_err());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(parse_log_level("debug"), Ok(Level::DEBUG));
        assert_eq!(parse_log_level(" WARN "), Ok(Level::WARN));
        assert!(matches!(parse_log_level("verbose"), Err(MarketError::InvalidConfig(_))));
    }

    #[test]
    fn test_whitelist_policy() {
        let mut config = MarketConfig::default();
        assert!(config.allowed_to_assert("anyone"));

        config.validate_asserters = true;
        config.asserter_whitelist.insert("alice".into());
        assert!(config.allowed_to_assert("alice"));
        assert!(!config.allowed_to_assert("bob"));
        // Disputer validation is independent
        assert!(config.allowed_to_dispute("bob"));
    }
}
