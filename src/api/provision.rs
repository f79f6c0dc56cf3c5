//! 域名就绪触发 API
//!
//! 包含 /domain-provisioned 端点

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use std::sync::Arc;
use tracing::info;

use crate::domain::ProvisioningEvent;
use crate::state::AppState;

/// 创建触发路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/domain-provisioned", post(domain_provisioned))
}

/// 域名 A 记录就绪，重配置并重启网关容器
///
/// POST /domain-provisioned?domain=<domain>&email=<email>
///
/// 立即返回 `OK`，流水线在后台执行，结果只写日志。
/// 参数按原样接受：重复时取第一个，缺失时为空
async fn domain_provisioned(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let event = ProvisioningEvent::from_query_pairs(params);
    info!(
        domain = %event.domain,
        email = %event.email,
        "Domain provisioned, scheduling restart pipeline"
    );

    // 不等待：调用方只得到受理确认
    drop(state.pipeline.spawn(event));

    "OK"
}
