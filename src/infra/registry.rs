//! 服务注册中心 HTTP Client
//!
//! 拉取当前运行中的附加服务及其端口。发现只是锦上添花：
//! 任何失败都降级为空结果，不影响静态服务的重启

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// 服务发现
#[async_trait]
pub trait ServiceDiscovery: Send + Sync {
    /// 运行中的服务 (name, port)，保持注册中心返回顺序
    async fn discover_running_services(&self) -> Vec<(String, u16)>;
}

/// 注册中心返回的服务描述（只取需要的字段）
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub id: String,
    #[serde(default)]
    pub default_port: i64,
    #[serde(default)]
    pub running: bool,
}

/// 发现失败原因，只用于日志
#[derive(Debug, Error)]
enum DiscoveryError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("invalid response body: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// 注册中心客户端
#[derive(Clone)]
pub struct RegistryClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl RegistryClient {
    /// 创建客户端
    ///
    /// # Arguments
    /// * `url` - 服务列表端点
    /// * `timeout` - 单次请求超时
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        // 默认客户端没有超时，由 fetch 外层的 tokio 超时兜底
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build registry client, using default client");
                Client::new()
            });

        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    async fn fetch_with_timeout(&self) -> Result<Vec<ServiceDescriptor>, DiscoveryError> {
        tokio::time::timeout(self.timeout, self.fetch())
            .await
            .map_err(|_| DiscoveryError::Timeout(self.timeout))?
    }

    async fn fetch(&self) -> Result<Vec<ServiceDescriptor>, DiscoveryError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(DiscoveryError::Transport)?;

        if response.status() != StatusCode::OK {
            return Err(DiscoveryError::Status(response.status()));
        }

        response
            .json::<Vec<ServiceDescriptor>>()
            .await
            .map_err(DiscoveryError::Decode)
    }
}

#[async_trait]
impl ServiceDiscovery for RegistryClient {
    async fn discover_running_services(&self) -> Vec<(String, u16)> {
        let descriptors = match self.fetch_with_timeout().await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                warn!(url = %self.url, error = %e, "Service discovery failed, continuing without discovered services");
                return Vec::new();
            }
        };

        let running = running_services(descriptors);
        info!(url = %self.url, count = running.len(), "Discovered running services");
        running
    }
}

/// 过滤出运行中的服务；端口非法的条目跳过
pub fn running_services(descriptors: Vec<ServiceDescriptor>) -> Vec<(String, u16)> {
    descriptors
        .into_iter()
        .filter(|d| d.running)
        .filter_map(|d| match u16::try_from(d.default_port) {
            Ok(port) if port != 0 => Some((d.id, port)),
            _ => {
                debug!(service = %d.id, port = d.default_port, "Skipping service with invalid port");
                None
            }
        })
        .collect()
}

/// 不做任何网络调用的发现实现（注册中心未部署时使用）
pub struct NoDiscovery;

#[async_trait]
impl ServiceDiscovery for NoDiscovery {
    async fn discover_running_services(&self) -> Vec<(String, u16)> {
        Vec::new()
    }
}
