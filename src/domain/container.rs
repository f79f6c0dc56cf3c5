//! 容器相关领域模型

use bollard::models::{ContainerConfig, EndpointSettings, HostConfig};
use std::collections::HashMap;

use super::routing::{merge_labels, LabelSet};

/// 容器配置快照
///
/// 变更前通过 inspect 获取，只在一次重启调用内存在，不缓存
#[derive(Debug, Clone, Default)]
pub struct ContainerSnapshot {
    pub name: String,
    /// 镜像、entrypoint/cmd、环境变量、标签等
    pub config: ContainerConfig,
    pub host_config: Option<HostConfig>,
    /// 网络名 -> 端点配置
    pub networks: HashMap<String, EndpointSettings>,
}

impl ContainerSnapshot {
    pub fn image(&self) -> Option<&str> {
        self.config.image.as_deref()
    }

    pub fn labels(&self) -> LabelSet {
        self.config
            .labels
            .as_ref()
            .map(|labels| labels.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    pub fn command(&self) -> Vec<String> {
        self.config.cmd.clone().unwrap_or_default()
    }

    /// 在快照基础上应用标签与命令增量
    ///
    /// 标签：剔除旧路由标签后合并新标签；命令：在原命令后追加，不替换
    pub fn with_delta(&self, new_labels: &LabelSet, extra_args: &[String]) -> ContainerSpec {
        let mut config = self.config.clone();

        if !new_labels.is_empty() {
            let merged = merge_labels(&self.labels(), new_labels);
            config.labels = Some(merged.into_iter().collect());
        }

        if !extra_args.is_empty() {
            let mut cmd = self.command();
            cmd.extend(extra_args.iter().cloned());
            config.cmd = Some(cmd);
        }

        ContainerSpec {
            config,
            host_config: self.host_config.clone(),
            networks: self.networks.clone(),
        }
    }
}

/// 重建容器所用的完整配置
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    pub config: ContainerConfig,
    pub host_config: Option<HostConfig>,
    pub networks: HashMap<String, EndpointSettings>,
}

impl ContainerSpec {
    pub fn labels(&self) -> LabelSet {
        self.config
            .labels
            .as_ref()
            .map(|labels| labels.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    pub fn command(&self) -> Vec<String> {
        self.config.cmd.clone().unwrap_or_default()
    }
}
