//! 受管服务与流水线相关领域模型

use chrono::{DateTime, Utc};

/// 域名就绪事件
///
/// 每次触发创建一次，由一次流水线运行完整消费，不落盘
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningEvent {
    pub domain: String,
    pub email: String,
}

impl ProvisioningEvent {
    pub fn new(domain: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            email: email.into(),
        }
    }

    /// 从查询参数构建事件
    ///
    /// 重复参数取第一个值，缺失参数为空字符串，不做任何校验
    pub fn from_query_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut domain = None;
        let mut email = None;

        for (key, value) in pairs {
            match key.as_str() {
                "domain" if domain.is_none() => domain = Some(value),
                "email" if email.is_none() => email = Some(value),
                _ => {}
            }
        }

        Self::new(domain.unwrap_or_default(), email.unwrap_or_default())
    }
}

/// 静态服务在网关上的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRole {
    /// 主应用，挂在顶级域名上，后端端口固定
    Primary { port: u16 },
    /// 子域名路由 `<name>.<domain>`，端口由镜像自身暴露
    Subdomain,
}

/// 需要重启的受管容器
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedService {
    /// 配置中固定的服务
    Static { name: String, role: ServiceRole },
    /// 运行时从服务注册中心发现的服务
    Discovered { name: String, port: u16 },
}

impl ManagedService {
    pub fn primary(name: impl Into<String>, port: u16) -> Self {
        Self::Static {
            name: name.into(),
            role: ServiceRole::Primary { port },
        }
    }

    pub fn subdomain(name: impl Into<String>) -> Self {
        Self::Static {
            name: name.into(),
            role: ServiceRole::Subdomain,
        }
    }

    pub fn discovered(name: impl Into<String>, port: u16) -> Self {
        Self::Discovered {
            name: name.into(),
            port,
        }
    }

    /// 容器名（同时也是路由 key 的命名空间）
    pub fn name(&self) -> &str {
        match self {
            ManagedService::Static { name, .. } | ManagedService::Discovered { name, .. } => name,
        }
    }

    pub fn is_discovered(&self) -> bool {
        matches!(self, ManagedService::Discovered { .. })
    }
}

/// 合并静态服务与发现的服务
///
/// 静态服务在前并保持配置顺序；发现的服务按注册中心返回顺序追加，
/// 同名条目先到先得，与静态服务重名的也忽略
pub fn merge_services(
    static_services: &[ManagedService],
    discovered: impl IntoIterator<Item = (String, u16)>,
) -> Vec<ManagedService> {
    let mut services: Vec<ManagedService> = static_services.to_vec();

    for (name, port) in discovered {
        if services.iter().any(|s| s.name() == name) {
            tracing::debug!(service = %name, "Ignoring duplicate discovered service");
            continue;
        }
        services.push(ManagedService::discovered(name, port));
    }

    services
}

/// 流水线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Discovering,
    RestartingServices,
    Settling,
    RestartingProxy,
    Completed,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Discovering => "discovering",
            PipelineState::RestartingServices => "restarting_services",
            PipelineState::Settling => "settling",
            PipelineState::RestartingProxy => "restarting_proxy",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个容器的重启结果，仅用于日志
#[derive(Debug, Clone)]
pub struct RestartOutcome {
    pub name: String,
    pub success: bool,
    pub error: Option<String>,
    /// 删除失败但被容忍
    pub removal_tolerated: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl RestartOutcome {
    pub fn succeeded(name: &str, started_at: DateTime<Utc>, removal_tolerated: bool) -> Self {
        Self {
            name: name.to_string(),
            success: true,
            error: None,
            removal_tolerated,
            started_at,
            duration_ms: (Utc::now() - started_at).num_milliseconds(),
        }
    }

    pub fn failed(name: &str, started_at: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            error: Some(error.into()),
            removal_tolerated: false,
            started_at,
            duration_ms: (Utc::now() - started_at).num_milliseconds(),
        }
    }
}
