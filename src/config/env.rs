//! 环境变量配置加载

use std::env;
use std::time::Duration;
use tracing::warn;

use crate::domain::proxy::DEFAULT_ACME_STORAGE;
use crate::domain::{AcmeSettings, ManagedService};
use crate::services::pipeline::PipelineConfig;

use self::constants::*;

/// 环境配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// 服务监听端口
    pub port: u16,
    /// 静态受管服务（已去重，且包含 dnsd）
    pub services: Vec<String>,
    /// 挂在顶级域名上的主应用容器
    pub primary_service: String,
    /// 主应用后端端口
    pub primary_service_port: u16,
    /// 反向代理容器名
    pub proxy_container: String,
    /// 注册中心配置
    pub registry: RegistryConfig,
    /// 是否使用 Let's Encrypt 生产环境
    pub letsencrypt_production: bool,
    /// 证书存储路径
    pub acme_storage: String,
    /// 代理重启前的等待
    pub settle_delay: Duration,
    /// 删除失败后的等待
    pub removal_backoff: Duration,
}

/// 服务注册中心配置
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// 注册中心所在的服务名；只有它在受管服务中时才做发现
    pub service: String,
    /// 服务列表端点
    pub url: String,
    /// 请求超时
    pub timeout: Duration,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        let port = parse_or("PORT", DEFAULT_PORT);

        let services = parse_services(env::var("SERVICES").ok().as_deref());

        // 任意非空值即开启生产 CA
        let letsencrypt_production = env::var("LETSENCRYPT_PROD")
            .map(|v| !v.is_empty())
            .unwrap_or(false);
        if !letsencrypt_production {
            warn!("LETSENCRYPT_PROD not set, certificates will be issued by the staging CA");
        }

        let primary_service =
            env::var("PRIMARY_SERVICE").unwrap_or_else(|_| DEFAULT_PRIMARY_SERVICE.to_string());
        let primary_service_port = parse_or("PRIMARY_SERVICE_PORT", DEFAULT_PRIMARY_PORT);
        let proxy_container =
            env::var("PROXY_CONTAINER").unwrap_or_else(|_| DEFAULT_PROXY_CONTAINER.to_string());

        let registry = RegistryConfig::from_env();

        let acme_storage =
            env::var("ACME_STORAGE").unwrap_or_else(|_| DEFAULT_ACME_STORAGE.to_string());

        let settle_delay = Duration::from_secs(parse_or("SETTLE_DELAY_SECS", SETTLE_DELAY_SECS));
        let removal_backoff =
            Duration::from_secs(parse_or("REMOVE_BACKOFF_SECS", REMOVE_BACKOFF_SECS));

        Self {
            port,
            services,
            primary_service,
            primary_service_port,
            proxy_container,
            registry,
            letsencrypt_production,
            acme_storage,
            settle_delay,
            removal_backoff,
        }
    }

    /// 注册中心服务是否在受管服务中
    pub fn discovery_enabled(&self) -> bool {
        self.services.iter().any(|s| *s == self.registry.service)
    }

    /// 按角色构建静态服务列表
    pub fn static_services(&self) -> Vec<ManagedService> {
        self.services
            .iter()
            .map(|name| {
                if *name == self.primary_service {
                    ManagedService::primary(name.clone(), self.primary_service_port)
                } else {
                    ManagedService::subdomain(name.clone())
                }
            })
            .collect()
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            static_services: self.static_services(),
            proxy_container: self.proxy_container.clone(),
            acme: AcmeSettings {
                production: self.letsencrypt_production,
                storage: self.acme_storage.clone(),
            },
            settle_delay: self.settle_delay,
            removal_backoff: self.removal_backoff,
        }
    }
}

impl RegistryConfig {
    pub fn from_env() -> Self {
        let service =
            env::var("REGISTRY_SERVICE").unwrap_or_else(|_| DEFAULT_REGISTRY_SERVICE.to_string());
        let url = env::var("REGISTRY_URL").unwrap_or_else(|_| DEFAULT_REGISTRY_URL.to_string());
        let timeout = Duration::from_secs(parse_or("REGISTRY_TIMEOUT_SECS", REGISTRY_TIMEOUT_SECS));

        Self {
            service,
            url,
            timeout,
        }
    }
}

/// 解析逗号分隔的服务列表，去空白、去重，并确保包含 dnsd
fn parse_services(raw: Option<&str>) -> Vec<String> {
    let mut services: Vec<String> = Vec::new();
    let names = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .chain(std::iter::once(ALWAYS_MANAGED_SERVICE));

    for name in names {
        if !name.is_empty() && !services.iter().any(|s| s == name) {
            services.push(name.to_string());
        }
    }

    services
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 常量
pub mod constants {
    /// 默认监听端口
    pub const DEFAULT_PORT: u16 = 8080;

    /// 始终受管的服务（DNS 守护进程）
    pub const ALWAYS_MANAGED_SERVICE: &str = "dnsd";

    /// 默认主应用容器
    pub const DEFAULT_PRIMARY_SERVICE: &str = "premapp";

    /// 主应用后端端口
    pub const DEFAULT_PRIMARY_PORT: u16 = 8080;

    /// 默认反向代理容器
    pub const DEFAULT_PROXY_CONTAINER: &str = "traefik";

    /// 默认注册中心服务
    pub const DEFAULT_REGISTRY_SERVICE: &str = "premd";

    /// 默认注册中心服务列表端点
    pub const DEFAULT_REGISTRY_URL: &str = "http://premd:8000/v1/services/";

    /// 注册中心请求超时（秒）
    pub const REGISTRY_TIMEOUT_SECS: u64 = 5;

    /// 代理重启前等待（秒）
    pub const SETTLE_DELAY_SECS: u64 = 3;

    /// 删除失败后等待（秒）
    pub const REMOVE_BACKOFF_SECS: u64 = 5;

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
