// src/api.rs
//! HTTP surface: health, on-demand pulse, and RAG query endpoints.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::agent::PulseAgent;
use crate::report::SynthesizedReport;
use crate::store::PulseHit;

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<PulseAgent>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/pulse", get(pulse))
        .route("/query", get(query))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "message": "field-pulse agent is active", "status": "healthy" }))
}

fn default_days() -> i64 {
    1
}

#[derive(Deserialize)]
struct PulseParams {
    #[serde(default = "default_days")]
    days: i64,
}

async fn pulse(
    State(state): State<AppState>,
    Query(params): Query<PulseParams>,
) -> Json<SynthesizedReport> {
    Json(state.agent.pulse(params.days).await)
}

fn default_top_k() -> usize {
    5
}

#[derive(Deserialize)]
struct QueryParams {
    q: String,
    #[serde(default = "default_top_k")]
    top_k: usize,
}

#[derive(serde::Serialize)]
struct QueryResp {
    query: String,
    results: Vec<PulseHit>,
}

async fn query(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Json<QueryResp> {
    let results = match state.agent.query(&params.q, params.top_k).await {
        Ok(hits) => hits,
        Err(e) => {
            tracing::warn!(error = ?e, "store query failed");
            Vec::new()
        }
    };
    Json(QueryResp {
        query: params.q,
        results,
    })
}
