//! 反向代理启动参数（ACME / TLS）

use super::routing::{CERT_RESOLVER, HTTPS_ENTRYPOINT, HTTP_ENTRYPOINT};

/// Let's Encrypt 生产环境
pub const LETS_ENCRYPT_PRODUCTION: &str = "https://acme-v02.api.letsencrypt.org/directory";

/// Let's Encrypt 测试环境
pub const LETS_ENCRYPT_STAGING: &str = "https://acme-staging-v02.api.letsencrypt.org/directory";

/// 默认证书存储路径
pub const DEFAULT_ACME_STORAGE: &str = "/letsencrypt/acme.json";

/// ACME 证书解析器配置，构造后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcmeSettings {
    /// true 使用生产 CA，否则使用 staging
    pub production: bool,
    /// 证书存储路径（代理容器内）
    pub storage: String,
}

impl AcmeSettings {
    pub fn new(production: bool) -> Self {
        Self {
            production,
            storage: DEFAULT_ACME_STORAGE.to_string(),
        }
    }

    pub fn ca_server(&self) -> &'static str {
        if self.production {
            LETS_ENCRYPT_PRODUCTION
        } else {
            LETS_ENCRYPT_STAGING
        }
    }
}

impl Default for AcmeSettings {
    fn default() -> Self {
        Self::new(false)
    }
}

/// 生成追加到代理容器命令行的参数
pub fn proxy_command_args(acme: &AcmeSettings, email: &str) -> Vec<String> {
    let resolver = format!("--certificatesresolvers.{}.acme", CERT_RESOLVER);

    vec![
        "--providers.docker=true".to_string(),
        "--providers.docker.exposedbydefault=false".to_string(),
        "--accesslog=true".to_string(),
        "--ping".to_string(),
        format!("--entrypoints.{}.address=:80", HTTP_ENTRYPOINT),
        format!("{}.email={}", resolver, email),
        format!("{}.storage={}", resolver, acme.storage),
        format!("{}.tlschallenge=true", resolver),
        format!("{}.caserver={}", resolver, acme.ca_server()),
        format!("--entrypoints.{}.address=:443", HTTPS_ENTRYPOINT),
    ]
}
