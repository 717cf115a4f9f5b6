//! Control Surface Routes
//!
//! Manual triggers and read-backs. Mutating endpoints await completion
//! before responding. No authentication: bind to a private interface.

use std::sync::Arc;

use alloy::primitives::Address;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::prelude::ToPrimitive;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::adapters::metrics::{HealthState, MetricsRegistry};
use crate::domain::{IntentId, PoolId};
use crate::ports::intent_store::IntentStore;
use crate::ports::ledger::Ledger;
use crate::usecases::{AccountIteration, GrindContext, IntentIndexer, PoolIterator};

use super::error::ApiError;

/// Everything the handlers need.
pub struct AppState<L: Ledger, S: IntentStore> {
    pub iterator: PoolIterator<L, S>,
    pub indexer: IntentIndexer<L, S>,
    pub store: Arc<S>,
    pub context: Arc<GrindContext>,
    pub health: Arc<HealthState>,
    pub metrics: Arc<MetricsRegistry>,
}

type Shared<L, S> = State<Arc<AppState<L, S>>>;

pub fn router<L: Ledger, S: IntentStore>(state: Arc<AppState<L, S>>) -> Router {
    Router::new()
        .route("/iterate/:account", post(iterate_account::<L, S>))
        .route("/iterate/poolId/:pool_id", post(iterate_pool::<L, S>))
        .route("/intents/index", post(index_intents::<L, S>))
        .route("/intents/reindex/:intent_id", post(reindex_intent::<L, S>))
        .route("/intents", get(list_intents::<L, S>))
        .route("/ethprice", get(eth_price::<L, S>))
        .route("/live", get(liveness))
        .route("/ready", get(readiness::<L, S>))
        .route("/metrics", get(metrics::<L, S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

async fn iterate_account<L: Ledger, S: IntentStore>(
    State(state): Shared<L, S>,
    Path(account): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let owner: Address = account
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid account address: {account}")))?;

    let price = state.context.price.current().await;
    match state
        .iterator
        .iterate_account(owner, price.usd, unix_now())
        .await?
    {
        AccountIteration::NoIntent => Err(ApiError::NotFound(format!(
            "No intent found for account {owner}"
        ))),
        AccountIteration::Expired { intent_id, expire } => Err(ApiError::BadRequest(format!(
            "Intent {intent_id} expired at {expire}"
        ))),
        AccountIteration::Completed {
            intent_id,
            attempted,
            submitted,
        } => Ok(Json(json!({
            "success": true,
            "message": format!("Iterated {attempted} pools of intent {intent_id}"),
            "txHashes": submitted,
        }))),
    }
}

async fn iterate_pool<L: Ledger, S: IntentStore>(
    State(state): Shared<L, S>,
    Path(pool_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let pool_id: PoolId = pool_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid pool id: {pool_id}")))?;

    let price = state.context.price.current().await;
    let tx_hash = state.iterator.iterate_pool(pool_id, price.usd).await?;

    Ok(Json(json!({ "success": true, "txHash": tx_hash })))
}

async fn index_intents<L: Ledger, S: IntentStore>(State(state): Shared<L, S>) -> Json<Value> {
    let count = state.indexer.index_all().await;
    Json(json!({
        "success": true,
        "isIndexed": count.is_some(),
        "count": count,
    }))
}

async fn reindex_intent<L: Ledger, S: IntentStore>(
    State(state): Shared<L, S>,
    Path(intent_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let intent_id: IntentId = intent_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid intent id: {intent_id}")))?;

    let reindexed = state.indexer.reindex(intent_id).await;
    Ok(Json(json!({ "success": true, "isReindexed": reindexed })))
}

async fn list_intents<L: Ledger, S: IntentStore>(
    State(state): Shared<L, S>,
) -> Result<Json<Value>, ApiError> {
    let intents = state.store.list().await?;
    Ok(Json(json!({ "intentsData": intents })))
}

async fn eth_price<L: Ledger, S: IntentStore>(State(state): Shared<L, S>) -> Json<Value> {
    let usd = state
        .context
        .price
        .latest()
        .await
        .and_then(|quote| quote.usd.to_f64());
    Json(json!({ "ethPrice": usd }))
}

/// Liveness probe: 200 while the process runs.
async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness probe: 200 only while accepting work and the RPC answers.
async fn readiness<L: Ledger, S: IntentStore>(State(state): Shared<L, S>) -> impl IntoResponse {
    if state.health.is_ready().await {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics<L: Ledger, S: IntentStore>(
    State(state): Shared<L, S>,
) -> Result<impl IntoResponse, ApiError> {
    let body = state.metrics.render()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
