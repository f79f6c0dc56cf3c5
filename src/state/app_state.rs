//! 应用状态

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::env::EnvConfig;
use crate::error::RuntimeError;
use crate::infra::{ContainerRuntime, DockerRuntime, NoDiscovery, RegistryClient, ServiceDiscovery};
use crate::services::pipeline::ProvisioningPipeline;

/// 应用状态
pub struct AppState {
    /// 环境配置
    pub config: EnvConfig,
    /// 重启流水线（各次运行之间不共享状态）
    pub pipeline: Arc<ProvisioningPipeline>,
    /// 服务启动时间
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// 使用指定的运行时与发现实现创建状态
    pub fn new(
        config: EnvConfig,
        runtime: Arc<dyn ContainerRuntime>,
        discovery: Arc<dyn ServiceDiscovery>,
    ) -> Self {
        let pipeline = Arc::new(ProvisioningPipeline::new(
            config.pipeline_config(),
            runtime,
            discovery,
        ));

        Self {
            config,
            pipeline,
            started_at: Utc::now(),
        }
    }

    /// 连接本地 Docker 并按配置选择服务发现
    ///
    /// Docker 暂不可达只记警告，触发时再报错
    pub async fn connect(config: EnvConfig) -> Result<Self, RuntimeError> {
        let runtime = DockerRuntime::connect()?;
        match runtime.ping().await {
            Ok(()) => tracing::info!("Connected to Docker daemon"),
            Err(e) => tracing::warn!(error = %e, "Docker daemon not reachable yet"),
        }

        let discovery: Arc<dyn ServiceDiscovery> = if config.discovery_enabled() {
            tracing::info!(
                registry = %config.registry.url,
                timeout_secs = config.registry.timeout.as_secs(),
                "Service discovery enabled"
            );
            Arc::new(RegistryClient::new(
                config.registry.url.clone(),
                config.registry.timeout,
            ))
        } else {
            tracing::info!(
                registry_service = %config.registry.service,
                "Registry service not managed, service discovery disabled"
            );
            Arc::new(NoDiscovery)
        };

        tracing::info!(
            port = config.port,
            services = ?config.services,
            primary = %config.primary_service,
            proxy = %config.proxy_container,
            letsencrypt_production = config.letsencrypt_production,
            settle_delay_secs = config.settle_delay.as_secs(),
            "Loaded configuration"
        );

        Ok(Self::new(config, Arc::new(runtime), discovery))
    }

    /// 受管的静态服务名
    pub fn managed_services(&self) -> Vec<String> {
        self.config.services.clone()
    }
}
