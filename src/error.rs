// ============================================================================
// Errors - Optimistic Prediction Market
// ============================================================================
//
// Every failure is scoped to the single operation that raised it and leaves
// state untouched. Errors fall into four classes (see ErrorKind) which the
// HTTP layer maps onto status codes.
//
// ============================================================================

use serde::Serialize;

/// Broad error class used for status mapping and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input, rejected before any state is read
    Validation,
    /// Operation attempted in the wrong lifecycle state
    State,
    /// Caller is not allowed to perform the operation
    Authorization,
    /// Insufficient collateral or share balance
    Resource,
    /// Referenced record does not exist
    NotFound,
}

/// Errors raised by the collateral ledger collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LedgerError {
    InsufficientBalance { account: String, available: u64, requested: u64 },
    BalanceOverflow(String),
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::InsufficientBalance { account, available, requested } => write!(
                f,
                "Insufficient balance for {}: have {}, need {}",
                account, available, requested
            ),
            LedgerError::BalanceOverflow(account) => write!(f, "Balance overflow for {}", account),
        }
    }
}

impl std::error::Error for LedgerError {}

/// Errors raised by the market, pool, assertion and settlement engines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MarketError {
    // ===== VALIDATION =====
    EmptyCaller,
    EmptyOutcomeLabel,
    IdenticalOutcomeLabels,
    ReservedOutcomeLabel(String),
    EmptyDescription,
    InvalidOutcome(String),
    InvalidAmount(String),
    BelowMinimumLiquidity { minimum: u64, provided: u64 },
    BelowMinimumBond { minimum: u64, provided: u64 },
    InvalidConfig(String),
    ArithmeticOverflow,

    // ===== STATE =====
    MarketAlreadyResolved(u64),
    MarketNotResolved(u64),
    MarketAlreadyAsserted(u64),
    PoolAlreadyInitialized(u64),
    PoolNotInitialized(u64),
    AssertionExpired(u64),
    AssertionNotExpired(u64),
    AssertionAlreadyDisputed(u64),
    AssertionAlreadySettled(u64),
    VerdictNotFound(String),
    VerdictAlreadyRecorded(String),
    AssertionNotDisputed(u64),
    InsufficientLiquidity(String),

    // ===== AUTHORIZATION =====
    NotAdmin(String),
    AsserterNotAllowed(String),
    DisputerNotAllowed(String),
    AssertionsBlocked,

    // ===== RESOURCE =====
    Ledger(LedgerError),
    InsufficientShares { share_id: u64, account: String, available: u128, requested: u128 },

    // ===== LOOKUP =====
    MarketNotFound(u64),
    AssertionNotFound(u64),
}

impl MarketError {
    pub fn kind(&self) -> ErrorKind {
        use MarketError::*;
        match self {
            EmptyCaller
            | EmptyOutcomeLabel
            | IdenticalOutcomeLabels
            | ReservedOutcomeLabel(_)
            | EmptyDescription
            | InvalidOutcome(_)
            | InvalidAmount(_)
            | BelowMinimumLiquidity { .. }
            | BelowMinimumBond { .. }
            | InvalidConfig(_)
            | ArithmeticOverflow => ErrorKind::Validation,
            MarketAlreadyResolved(_)
            | MarketNotResolved(_)
            | MarketAlreadyAsserted(_)
            | PoolAlreadyInitialized(_)
            | PoolNotInitialized(_)
            | AssertionExpired(_)
            | AssertionNotExpired(_)
            | AssertionAlreadyDisputed(_)
            | AssertionAlreadySettled(_)
            | VerdictNotFound(_)
            | VerdictAlreadyRecorded(_)
            | AssertionNotDisputed(_)
            | InsufficientLiquidity(_) => ErrorKind::State,
            NotAdmin(_) | AsserterNotAllowed(_) | DisputerNotAllowed(_) | AssertionsBlocked => {
                ErrorKind::Authorization
            }
            Ledger(_) | InsufficientShares { .. } => ErrorKind::Resource,
            MarketNotFound(_) | AssertionNotFound(_) => ErrorKind::NotFound,
        }
    }
}

impl std::fmt::Display for MarketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use MarketError::*;
        match self {
            EmptyCaller => write!(f, "Caller account must not be empty"),
            EmptyOutcomeLabel => write!(f, "Outcome labels must not be empty"),
            IdenticalOutcomeLabels => write!(f, "Outcome labels must differ"),
            ReservedOutcomeLabel(label) => write!(f, "Outcome label {:?} is reserved", label),
            EmptyDescription => write!(f, "Market description must not be empty"),
            InvalidOutcome(msg) => write!(f, "Invalid outcome: {}", msg),
            InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            BelowMinimumLiquidity { minimum, provided } => write!(
                f,
                "Liquidity {} is below the minimum of {}",
                provided, minimum
            ),
            BelowMinimumBond { minimum, provided } => {
                write!(f, "Bond {} is below the minimum of {}", provided, minimum)
            }
            InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            ArithmeticOverflow => write!(f, "Arithmetic overflow"),
            MarketAlreadyResolved(id) => write!(f, "Market {} is already resolved", id),
            MarketNotResolved(id) => write!(f, "Market {} is not resolved yet", id),
            MarketAlreadyAsserted(id) => write!(f, "Market {} already has an active assertion", id),
            PoolAlreadyInitialized(id) => {
                write!(f, "Pool for market {} is already initialized", id)
            }
            PoolNotInitialized(id) => write!(f, "Pool for market {} is not initialized", id),
            AssertionExpired(id) => write!(f, "Assertion {} has expired", id),
            AssertionNotExpired(id) => write!(f, "Assertion {} has not expired yet", id),
            AssertionAlreadyDisputed(id) => write!(f, "Assertion {} is already disputed", id),
            AssertionAlreadySettled(id) => write!(f, "Assertion {} is already settled", id),
            VerdictNotFound(key) => write!(f, "No verdict recorded for dispute {}", key),
            VerdictAlreadyRecorded(key) => {
                write!(f, "Verdict already recorded for dispute {}", key)
            }
            AssertionNotDisputed(id) => write!(f, "Assertion {} is not disputed", id),
            InsufficientLiquidity(msg) => write!(f, "Insufficient liquidity: {}", msg),
            NotAdmin(caller) => write!(f, "Unauthorized: {} is not the admin", caller),
            AsserterNotAllowed(caller) => write!(f, "Unauthorized: {} may not assert", caller),
            DisputerNotAllowed(caller) => write!(f, "Unauthorized: {} may not dispute", caller),
            AssertionsBlocked => write!(f, "Assertions are currently blocked"),
            Ledger(err) => write!(f, "{}", err),
            InsufficientShares { share_id, account, available, requested } => write!(
                f,
                "Insufficient shares of {} for {}: have {}, need {}",
                share_id, account, available, requested
            ),
            MarketNotFound(id) => write!(f, "Market {} not found", id),
            AssertionNotFound(id) => write!(f, "Assertion {} not found", id),
        }
    }
}

impl std::error::Error for MarketError {}

impl From<LedgerError> for MarketError {
    fn from(err: LedgerError) -> Self {
        MarketError::Ledger(err)
    }
}

pub type MarketResult<T> = Result<T, MarketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(MarketError::EmptyDescription.kind(), ErrorKind::Validation);
        assert_eq!(MarketError::MarketAlreadyResolved(1).kind(), ErrorKind::State);
        assert_eq!(MarketError::AssertionsBlocked.kind(), ErrorKind::Authorization);
        assert_eq!(MarketError::MarketNotFound(3).kind(), ErrorKind::NotFound);

        let ledger = LedgerError::InsufficientBalance {
            account: "alice".into(),
            available: 5,
            requested: 10,
        };
        let err: MarketError = ledger.into();
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert_eq!(err.to_string(), "Insufficient balance for alice: have 5, need 10");
    }
}
