/// Optimistic Prediction Market
///
/// Two-outcome prediction markets resolved by bonded assertions, traded
/// against a reserve-ratio liquidity pool and settled in collateral.
/// Exports all modules for use as a library crate; the binary in main.rs
/// serves them over HTTP.

pub mod app_state;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod handlers;
pub mod ledger;
pub mod market_resolve;
pub mod models;
pub mod registry;
pub mod routes;
pub mod shares;

pub use app_state::{AppState, SharedState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigUpdate, MarketConfig, ServerConfig, WhitelistKind};
pub use engine::{
    AssertionSettlement, AssertionView, EngineSnapshot, EngineStats, LiquidityReceipt, MarketEngine,
    MarketRecord, PoolReceipt, RedemptionReceipt, SettlementReceipt, TradeReceipt,
};
pub use error::{ErrorKind, LedgerError, MarketError, MarketResult};
pub use events::{EventLog, EventRecord, MarketEvent};
pub use ledger::{CollateralLedger, LedgerStats, Transaction, TxType, BOND_ESCROW};
pub use market_resolve::{
    Assertion, AssertionPolicy, AssertionState, DisputeKey, EscalationResolver, InMemoryResolver,
    LiquidityPool, Market, NewMarket, OpenPolicy, Outcome, Prices, Resolution, SCALE, UNRESOLVABLE,
};
pub use routes::router;
pub use shares::{PositionInfo, ShareId, ShareKind, ShareLedger, SharesStats};
