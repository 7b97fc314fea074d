// HTTP request handlers for the prediction market API
//
// Handlers are thin: parse the body, call the engine, wrap the result.
// Engine errors become `{ success: false, error, kind }` with a status
// derived from the error kind.

use crate::app_state::SharedState;
use crate::engine::{
    AssertionSettlement, LiquidityReceipt, PoolReceipt, RedemptionReceipt, SettlementReceipt,
    TradeReceipt,
};
use crate::error::{ErrorKind, MarketError, MarketResult};
use crate::market_resolve::{Assertion, Prices};
use crate::models::*;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

type ApiResult<T> = Result<Json<ApiResponse<T>>, MarketError>;

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    kind: ErrorKind,
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::State => StatusCode::CONFLICT,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::Resource => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
        };
        let body = ErrorBody { success: false, error: self.to_string(), kind: self.kind() };
        (status, Json(body)).into_response()
    }
}

fn ok<T: Serialize>(result: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(result)))
}

/// Reject blank caller ids before they reach the engine
fn caller(raw: &str) -> MarketResult<&str> {
    let caller = raw.trim();
    if caller.is_empty() {
        return Err(MarketError::EmptyCaller);
    }
    Ok(caller)
}

// ===== HEALTH =====

pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let stats = state.engine.stats();
    Json(HealthResponse {
        status: "ok",
        service: "optimistic-prediction-market",
        markets: stats.markets,
        assertions: stats.assertions,
        uptime_secs: state.engine.now().saturating_sub(state.started_at),
    })
}

// ===== MARKETS =====

pub async fn get_markets(State(state): State<SharedState>) -> ApiResult<MarketsResponse> {
    ok(MarketsResponse { markets: state.engine.markets() })
}

pub async fn get_market(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> ApiResult<MarketResponse> {
    ok(MarketResponse { market: state.engine.market(id)? })
}

pub async fn create_market(
    State(state): State<SharedState>,
    Json(payload): Json<CreateMarketRequest>,
) -> ApiResult<MarketResponse> {
    let owner = caller(&payload.caller)?.to_string();
    let market = state.engine.initialize_market(&owner, payload.into())?;
    ok(MarketResponse { market })
}

// ===== POOL =====

pub async fn get_pool(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> ApiResult<PoolResponse> {
    let pool = state.engine.pool(id)?;
    let prices = pool.prices()?;
    ok(PoolResponse { pool, prices })
}

pub async fn get_prices(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> ApiResult<Prices> {
    ok(state.engine.prices(id)?)
}

pub async fn initialize_pool(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<CollateralRequest>,
) -> ApiResult<PoolReceipt> {
    ok(state.engine.initialize_pool(caller(&payload.caller)?, id, payload.amount)?)
}

pub async fn deposit_liquidity(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<CollateralRequest>,
) -> ApiResult<LiquidityReceipt> {
    ok(state.engine.deposit_liquidity(caller(&payload.caller)?, id, payload.amount)?)
}

pub async fn withdraw_liquidity(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<LpAmountRequest>,
) -> ApiResult<LiquidityReceipt> {
    ok(state.engine.withdraw_liquidity(caller(&payload.caller)?, id, payload.lp_amount)?)
}

pub async fn redeem_lp(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<LpAmountRequest>,
) -> ApiResult<RedemptionReceipt> {
    ok(state.engine.redeem_lp_for_outcome_tokens(caller(&payload.caller)?, id, payload.lp_amount)?)
}

// ===== TRADING =====

pub async fn buy_outcome(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<BuyRequest>,
) -> ApiResult<TradeReceipt> {
    let buyer = caller(&payload.caller)?;
    ok(state.engine.buy_outcome_tokens(buyer, id, payload.outcome, payload.amount)?)
}

pub async fn sell_outcome(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<SellRequest>,
) -> ApiResult<TradeReceipt> {
    let seller = caller(&payload.caller)?;
    ok(state.engine.sell_outcome_tokens(seller, id, payload.outcome, payload.shares)?)
}

pub async fn settle_outcome_tokens(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<CallerRequest>,
) -> ApiResult<SettlementReceipt> {
    ok(state.engine.settle_outcome_tokens(caller(&payload.caller)?, id)?)
}

// ===== ASSERTIONS =====

pub async fn assert_outcome(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<AssertRequest>,
) -> ApiResult<Assertion> {
    ok(state.engine.assert_outcome(caller(&payload.caller)?, id, &payload.claim)?)
}

pub async fn get_assertion(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> ApiResult<AssertionResponse> {
    let assertion = state.engine.assertion(id)?;
    let dispute_key = state.engine.dispute_key(id)?;
    ok(AssertionResponse { assertion, dispute_key })
}

pub async fn dispute_assertion(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<CallerRequest>,
) -> ApiResult<Assertion> {
    ok(state.engine.dispute(caller(&payload.caller)?, id)?)
}

pub async fn settle_assertion(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<CallerRequest>,
) -> ApiResult<AssertionSettlement> {
    ok(state.engine.settle_assertion(caller(&payload.caller)?, id)?)
}

// ===== BALANCES =====

pub async fn get_balance(
    State(state): State<SharedState>,
    Path(account): Path<String>,
) -> ApiResult<BalanceResponse> {
    let balance = state.engine.collateral_balance(&account);
    let positions = state.engine.positions(&account);
    ok(BalanceResponse { account, balance, positions })
}

pub async fn get_share_balance(
    State(state): State<SharedState>,
    Path((share_id, account)): Path<(u64, String)>,
) -> ApiResult<ShareBalanceResponse> {
    let balance = state.engine.share_balance(share_id, &account);
    ok(ShareBalanceResponse { share_id, account, balance })
}

pub async fn transfer_shares(
    State(state): State<SharedState>,
    Json(payload): Json<TransferSharesRequest>,
) -> ApiResult<TransferResponse> {
    let from = caller(&payload.caller)?.to_string();
    state.engine.transfer_shares(&from, &payload.to, payload.share_id, payload.amount)?;
    ok(TransferResponse {
        share_id: payload.share_id,
        from,
        to: payload.to,
        amount: payload.amount,
    })
}

// ===== EVENTS =====

pub async fn get_events(
    State(state): State<SharedState>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<EventsResponse> {
    ok(EventsResponse { events: state.engine.events_since(query.since) })
}

// ===== ADMIN =====

pub async fn admin_mint(
    State(state): State<SharedState>,
    Json(payload): Json<MintRequest>,
) -> ApiResult<MintResponse> {
    let admin = caller(&payload.caller)?;
    let balance = state.engine.mint_collateral(admin, &payload.account, payload.amount)?;
    ok(MintResponse { account: payload.account, balance })
}

pub async fn record_verdict(
    State(state): State<SharedState>,
    Json(payload): Json<VerdictRequest>,
) -> ApiResult<VerdictResponse> {
    let dispute_key = state.engine.record_verdict(
        caller(&payload.caller)?,
        payload.assertion_id,
        payload.verdict,
        payload.allow_override,
    )?;
    ok(VerdictResponse {
        assertion_id: payload.assertion_id,
        dispute_key,
        verdict: payload.verdict,
    })
}

pub async fn get_config(State(state): State<SharedState>) -> ApiResult<ConfigResponse> {
    ok(ConfigResponse { config: state.engine.config() })
}

pub async fn update_config(
    State(state): State<SharedState>,
    Json(payload): Json<ConfigRequest>,
) -> ApiResult<ConfigResponse> {
    let config = state.engine.update_config(caller(&payload.caller)?, payload.update)?;
    ok(ConfigResponse { config })
}

pub async fn update_whitelist(
    State(state): State<SharedState>,
    Json(payload): Json<WhitelistRequest>,
) -> ApiResult<WhitelistResponse> {
    let admin = caller(&payload.caller)?;
    state.engine.set_whitelisted(admin, payload.kind, &payload.account, payload.allowed)?;
    ok(WhitelistResponse { kind: payload.kind, account: payload.account, allowed: payload.allowed })
}
