use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::ApiError;
use crate::pipeline::Engine;
use crate::ratelimit::RateLimitLedger;
use crate::segments::truncate_chars;
use crate::types::{AnalysisReport, AnalysisRequest};

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub ledger: Arc<RateLimitLedger>,
    pub rate_limit_max: usize,
}

impl AppState {
    pub fn new(engine: Engine, ledger: RateLimitLedger, rate_limit_max: usize) -> Self {
        Self { engine, ledger: Arc::new(ledger), rate_limit_max }
    }
}

fn caller_id(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let caller = caller_id(&req);
    if state.ledger.check(&caller) {
        next.run(req).await
    } else {
        tracing::warn!(caller = %caller, "rate limit exceeded");
        ApiError::RateLimited(state.rate_limit_max).into_response()
    }
}

pub async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalysisRequest>,
) -> Result<Json<AnalysisReport>, ApiError> {
    tracing::info!(input_type = ?req.input_type, data = truncate_chars(&req.data, 100), "analysis requested");
    let engine = state.engine.clone();
    // a panic anywhere in the pipeline surfaces as a 500 instead of a dropped connection
    let report = tokio::spawn(async move { engine.analyze(&req).await })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    tracing::info!(score = report.score, verdict = ?report.overall_verdict, "analysis finished");
    Ok(Json(report))
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "status": "Veritas API is running" }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "veritas-backend" }))
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .route("/", get(root))
        .route("/health", get(health))
        .route("/favicon.ico", get(favicon))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(state: AppState, addr: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr, "listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
