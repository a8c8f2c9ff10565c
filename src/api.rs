use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::automation::AutomationController;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<AutomationController>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/news", get(recent_news))
        .route("/automation/initialize", post(initialize))
        .route("/automation/status", get(status))
        .route("/automation/fetch", post(trigger_fetch))
        .route("/automation/summaries", post(trigger_summaries))
        .route("/automation/cleanup", post(cleanup))
        .route("/automation/health", get(system_health))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct NewsQuery {
    limit: Option<usize>,
}

const NEWS_LIMIT_DEFAULT: usize = 50;
const NEWS_LIMIT_MAX: usize = 200;

async fn recent_news(
    State(state): State<AppState>,
    Query(q): Query<NewsQuery>,
) -> Response {
    let limit = q.limit.unwrap_or(NEWS_LIMIT_DEFAULT).min(NEWS_LIMIT_MAX);
    match state.controller.recent_news(limit).await {
        Ok(articles) => Json(articles).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn initialize(State(state): State<AppState>) -> Response {
    Json(state.controller.initialize().await).into_response()
}

async fn status(State(state): State<AppState>) -> Response {
    match state.controller.status().await {
        Ok(s) => Json(s).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn trigger_fetch(State(state): State<AppState>) -> Response {
    Json(state.controller.trigger_manual_fetch().await).into_response()
}

async fn trigger_summaries(State(state): State<AppState>) -> Response {
    Json(state.controller.trigger_manual_summary_processing().await).into_response()
}

async fn cleanup(State(state): State<AppState>) -> Response {
    Json(state.controller.perform_cleanup().await).into_response()
}

async fn system_health(State(state): State<AppState>) -> Response {
    Json(state.controller.check_system_health().await).into_response()
}

fn internal_error(e: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": e.to_string() })),
    )
        .into_response()
}
