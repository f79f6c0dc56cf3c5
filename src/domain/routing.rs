//! 网关路由标签生成
//!
//! 反向代理按容器标签读取路由规则，这里生成每个受管服务的标签集合，
//! 并负责在合并前清理旧的路由标签

use std::collections::BTreeMap;

use super::service::{ManagedService, ServiceRole};

/// 标签集合（key 唯一，有序便于日志和比较）
pub type LabelSet = BTreeMap<String, String>;

/// 旧路由标签的识别子串
pub const PROXY_LABEL_MARKER: &str = "traefik";

/// 证书解析器名称，需与代理启动参数一致
pub const CERT_RESOLVER: &str = "myresolver";

/// HTTP 入口
pub const HTTP_ENTRYPOINT: &str = "web";

/// HTTPS 入口
pub const HTTPS_ENTRYPOINT: &str = "websecure";

/// HTTP -> HTTPS 跳转中间件
pub const REDIRECT_MIDDLEWARE: &str = "http-to-https";

/// 生成服务的路由标签
///
/// 不校验 `domain`，空字符串会生成规则存在但主机为空的标签
pub fn labels_for(service: &ManagedService, domain: &str) -> LabelSet {
    match service {
        ManagedService::Static {
            name,
            role: ServiceRole::Primary { port },
        } => router_pair(name, domain.to_string(), Some(*port)),
        ManagedService::Static {
            name,
            role: ServiceRole::Subdomain,
        } => router_pair(name, subdomain_host(name, domain), None),
        ManagedService::Discovered { name, port } => {
            router_pair(name, subdomain_host(name, domain), Some(*port))
        }
    }
}

/// 合并标签：先剔除已有的所有路由标签，再写入新标签
///
/// `new_labels` 为空时保留原有标签不动（代理自身重启不改标签）
pub fn merge_labels(existing: &LabelSet, new_labels: &LabelSet) -> LabelSet {
    if new_labels.is_empty() {
        return existing.clone();
    }

    let mut merged: LabelSet = existing
        .iter()
        .filter(|(key, _)| !key.contains(PROXY_LABEL_MARKER))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    merged.extend(new_labels.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

fn subdomain_host(name: &str, domain: &str) -> String {
    format!("{}.{}", name, domain)
}

/// HTTP/HTTPS 路由对 + 跳转中间件，可选负载均衡端口
fn router_pair(name: &str, host: String, port: Option<u16>) -> LabelSet {
    let rule = format!("PathPrefix(`/`) && Host(`{}`)", host);
    let http_router = format!("traefik.http.routers.{}-http", name);
    let https_router = format!("traefik.http.routers.{}-https", name);

    let mut labels = LabelSet::new();
    labels.insert("traefik.enable".to_string(), "true".to_string());

    labels.insert(format!("{}.rule", http_router), rule.clone());
    labels.insert(
        format!("{}.entrypoints", http_router),
        HTTP_ENTRYPOINT.to_string(),
    );
    labels.insert(
        format!("{}.middlewares", http_router),
        REDIRECT_MIDDLEWARE.to_string(),
    );

    labels.insert(format!("{}.rule", https_router), rule);
    labels.insert(
        format!("{}.entrypoints", https_router),
        HTTPS_ENTRYPOINT.to_string(),
    );
    labels.insert(
        format!("{}.tls.certresolver", https_router),
        CERT_RESOLVER.to_string(),
    );

    labels.insert(
        format!(
            "traefik.http.middlewares.{}.redirectscheme.scheme",
            REDIRECT_MIDDLEWARE
        ),
        "https".to_string(),
    );

    if let Some(port) = port {
        labels.insert(
            format!("traefik.http.services.{}.loadbalancer.server.port", name),
            port.to_string(),
        );
    }

    labels
}
