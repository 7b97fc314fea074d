// Request and response bodies for the HTTP API
//
// Every mutating request names its acting account in `caller`. Responses
// are flat JSON objects with a `success` flag, matching the error body
// `{ "success": false, "error": ..., "kind": ... }`.

use crate::config::{ConfigUpdate, MarketConfig, WhitelistKind};
use crate::engine::AssertionView;
use crate::events::EventRecord;
use crate::market_resolve::{DisputeKey, LiquidityPool, Market, NewMarket, Outcome, Prices};
use crate::shares::{PositionInfo, ShareId};
use serde::{Deserialize, Serialize};

// ===== REQUESTS =====

#[derive(Debug, Deserialize)]
pub struct CallerRequest {
    pub caller: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateMarketRequest {
    pub caller: String,
    pub description: String,
    pub outcome_a_label: String,
    pub outcome_b_label: String,
    #[serde(default)]
    pub reward: u64,
    pub required_bond: u64,
}

impl From<CreateMarketRequest> for NewMarket {
    fn from(req: CreateMarketRequest) -> Self {
        NewMarket {
            description: req.description,
            outcome_a_label: req.outcome_a_label,
            outcome_b_label: req.outcome_b_label,
            reward: req.reward,
            required_bond: req.required_bond,
        }
    }
}

/// Collateral amount for `initialize_pool` and `deposit_liquidity`
#[derive(Debug, Deserialize)]
pub struct CollateralRequest {
    pub caller: String,
    pub amount: u64,
}

/// LP amount for `withdraw_liquidity` and `redeem_lp_for_outcome_tokens`
#[derive(Debug, Deserialize)]
pub struct LpAmountRequest {
    pub caller: String,
    pub lp_amount: u128,
}

#[derive(Debug, Deserialize)]
pub struct BuyRequest {
    pub caller: String,
    pub outcome: Outcome,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct SellRequest {
    pub caller: String,
    pub outcome: Outcome,
    pub shares: u128,
}

#[derive(Debug, Deserialize)]
pub struct AssertRequest {
    pub caller: String,
    pub claim: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferSharesRequest {
    pub caller: String,
    pub to: String,
    pub share_id: ShareId,
    pub amount: u128,
}

#[derive(Debug, Deserialize)]
pub struct MintRequest {
    pub caller: String,
    pub account: String,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct VerdictRequest {
    pub caller: String,
    pub assertion_id: u64,
    pub verdict: bool,
    #[serde(default)]
    pub allow_override: bool,
}

#[derive(Debug, Deserialize)]
pub struct ConfigRequest {
    pub caller: String,
    #[serde(flatten)]
    pub update: ConfigUpdate,
}

#[derive(Debug, Deserialize)]
pub struct WhitelistRequest {
    pub caller: String,
    pub kind: WhitelistKind,
    pub account: String,
    #[serde(default = "default_allowed")]
    pub allowed: bool,
}

fn default_allowed() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub since: u64,
}

// ===== RESPONSES =====

/// Success envelope: `{ "success": true, ...fields of T }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub result: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(result: T) -> Self {
        Self { success: true, result }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub markets: usize,
    pub assertions: usize,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct MarketsResponse {
    pub markets: Vec<Market>,
}

#[derive(Debug, Serialize)]
pub struct MarketResponse {
    pub market: Market,
}

#[derive(Debug, Serialize)]
pub struct PoolResponse {
    pub pool: LiquidityPool,
    pub prices: Prices,
}

#[derive(Debug, Serialize)]
pub struct AssertionResponse {
    pub assertion: AssertionView,
    pub dispute_key: DisputeKey,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub account: String,
    pub balance: u64,
    pub positions: Vec<PositionInfo>,
}

#[derive(Debug, Serialize)]
pub struct ShareBalanceResponse {
    pub share_id: ShareId,
    pub account: String,
    pub balance: u128,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub share_id: ShareId,
    pub from: String,
    pub to: String,
    pub amount: u128,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Serialize)]
pub struct MintResponse {
    pub account: String,
    pub balance: u64,
}

#[derive(Debug, Serialize)]
pub struct VerdictResponse {
    pub assertion_id: u64,
    pub dispute_key: DisputeKey,
    pub verdict: bool,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub config: MarketConfig,
}

#[derive(Debug, Serialize)]
pub struct WhitelistResponse {
    pub kind: WhitelistKind,
    pub account: String,
    pub allowed: bool,
}
