// Route table for the HTTP API

use crate::app_state::SharedState;
use crate::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

pub fn router(state: SharedState) -> Router {
    Router::new()
        // ===== HEALTH =====
        .route("/", get(health_check))
        .route("/health", get(health_check))
        // ===== MARKETS =====
        .route("/markets", get(get_markets).post(create_market))
        .route("/markets/:id", get(get_market))
        // ===== POOL & TRADING =====
        .route("/markets/:id/pool", get(get_pool).post(initialize_pool))
        .route("/markets/:id/prices", get(get_prices))
        .route("/markets/:id/liquidity/deposit", post(deposit_liquidity))
        .route("/markets/:id/liquidity/withdraw", post(withdraw_liquidity))
        .route("/markets/:id/liquidity/redeem", post(redeem_lp))
        .route("/markets/:id/buy", post(buy_outcome))
        .route("/markets/:id/sell", post(sell_outcome))
        .route("/markets/:id/settle", post(settle_outcome_tokens))
        // ===== ASSERTIONS =====
        .route("/markets/:id/assert", post(assert_outcome))
        .route("/assertions/:id", get(get_assertion))
        .route("/assertions/:id/dispute", post(dispute_assertion))
        .route("/assertions/:id/settle", post(settle_assertion))
        // ===== BALANCES =====
        .route("/balance/:account", get(get_balance))
        .route("/shares/transfer", post(transfer_shares))
        .route("/shares/:share_id/:account", get(get_share_balance))
        // ===== EVENTS =====
        .route("/events", get(get_events))
        // ===== ADMIN =====
        .route("/admin/mint", post(admin_mint))
        .route("/admin/verdicts", post(record_verdict))
        .route("/admin/config", get(get_config).post(update_config))
        .route("/admin/whitelist", post(update_whitelist))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}
