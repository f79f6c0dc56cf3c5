//! 健康检查 API
//!
//! 包含 /health, /status 端点

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::config::env::constants::VERSION;
use crate::state::AppState;

/// 健康检查响应
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
    started_at: String,
    proxy_container: String,
    managed_services: Vec<String>,
    discovery_enabled: bool,
    letsencrypt_production: bool,
}

/// 创建健康检查路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(health_check))
}

/// 健康检查 - 返回版本、启动时间和受管服务
///
/// GET /health, GET /status
/// 不包含任何流水线运行状态
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        service: "controllerd",
        version: VERSION,
        timestamp: chrono::Utc::now().to_rfc3339(),
        started_at: state.started_at.to_rfc3339(),
        proxy_container: state.config.proxy_container.clone(),
        managed_services: state.managed_services(),
        discovery_enabled: state.config.discovery_enabled(),
        letsencrypt_production: state.config.letsencrypt_production,
    })
}
