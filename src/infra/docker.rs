//! 容器运行时
//!
//! `ContainerRuntime` 抽象出重启流程需要的五个调用，
//! `DockerRuntime` 基于 Docker Engine API (bollard) 实现

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, NetworkingConfig,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::Docker;
use tracing::debug;

use crate::domain::{ContainerSnapshot, ContainerSpec};
use crate::error::{RuntimeError, RuntimeResult};

/// 容器运行时边界
///
/// 所有调用按容器名寻址
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// 获取容器当前配置
    async fn inspect(&self, name: &str) -> RuntimeResult<ContainerSnapshot>;

    /// 停止容器，`timeout_secs` 为 0 时直接 kill
    async fn stop(&self, name: &str, timeout_secs: i64) -> RuntimeResult<()>;

    async fn remove(&self, name: &str) -> RuntimeResult<()>;

    /// 以指定名称创建容器（配置、host 配置、网络端点）
    async fn create(&self, name: &str, spec: &ContainerSpec) -> RuntimeResult<()>;

    async fn start(&self, name: &str) -> RuntimeResult<()>;
}

/// Docker Engine 运行时
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// 使用本地默认方式连接（unix socket / `DOCKER_HOST`）
    pub fn connect() -> RuntimeResult<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Connect(e.to_string()))?;
        Ok(Self { docker })
    }

    /// 检查 Docker daemon 是否可达
    pub async fn ping(&self) -> RuntimeResult<()> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| RuntimeError::Connect(e.to_string()))
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn inspect(&self, name: &str) -> RuntimeResult<ContainerSnapshot> {
        let response = self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_docker_error(name, e))?;

        let networks = response
            .network_settings
            .and_then(|settings| settings.networks)
            .unwrap_or_default();

        debug!(
            container = %name,
            image = ?response.config.as_ref().and_then(|c| c.image.as_deref()),
            networks = networks.len(),
            "Inspected container"
        );

        Ok(ContainerSnapshot {
            name: name.to_string(),
            config: response.config.unwrap_or_default(),
            host_config: response.host_config,
            networks,
        })
    }

    async fn stop(&self, name: &str, timeout_secs: i64) -> RuntimeResult<()> {
        match self
            .docker
            .stop_container(name, Some(StopContainerOptions { t: timeout_secs }))
            .await
        {
            Ok(()) => Ok(()),
            // 304: 容器本来就没在运行
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 304, ..
            }) => {
                debug!(container = %name, "Container already stopped");
                Ok(())
            }
            Err(e) => Err(map_docker_error(name, e)),
        }
    }

    async fn remove(&self, name: &str) -> RuntimeResult<()> {
        self.docker
            .remove_container(name, None::<RemoveContainerOptions>)
            .await
            .map_err(|e| map_docker_error(name, e))
    }

    async fn create(&self, name: &str, spec: &ContainerSpec) -> RuntimeResult<()> {
        let mut config: Config<String> = spec.config.clone().into();
        config.host_config = spec.host_config.clone();
        config.networking_config = Some(NetworkingConfig {
            endpoints_config: spec.networks.clone(),
        });

        let options = CreateContainerOptions {
            name: name.to_string(),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| map_docker_error(name, e))?;

        for warning in &response.warnings {
            tracing::warn!(container = %name, %warning, "Docker warning on create");
        }

        Ok(())
    }

    async fn start(&self, name: &str) -> RuntimeResult<()> {
        self.docker
            .start_container(name, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| map_docker_error(name, e))
    }
}

/// 将 bollard 错误映射为运行时错误
fn map_docker_error(name: &str, err: bollard::errors::Error) -> RuntimeError {
    match err {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        } => RuntimeError::NotFound(name.to_string()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => RuntimeError::Server {
            status: status_code,
            message,
        },
        other => RuntimeError::Other(other.to_string()),
    }
}
