//! 统一错误处理
//!
//! 容器运行时错误、单容器重启错误与流水线错误的分层定义

use thiserror::Error;

/// 容器运行时调用错误
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Failed to connect to container runtime: {0}")]
    Connect(String),

    #[error("No such container: {0}")]
    NotFound(String),

    #[error("Container runtime returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Container runtime error: {0}")]
    Other(String),
}

/// 单个容器重启的致命错误
///
/// 删除失败不在此列，见 `services::mutator::RemovalOutcome`
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Failed to inspect container {container}: {source}")]
    Inspect {
        container: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Failed to stop container {container}: {source}")]
    Stop {
        container: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Failed to create container {container}: {source}")]
    Create {
        container: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Failed to start container {container}: {source}")]
    Start {
        container: String,
        #[source]
        source: RuntimeError,
    },
}

impl ContainerError {
    /// 出错的容器名
    pub fn container(&self) -> &str {
        match self {
            ContainerError::Inspect { container, .. }
            | ContainerError::Stop { container, .. }
            | ContainerError::Create { container, .. }
            | ContainerError::Start { container, .. } => container,
        }
    }

    /// 出错的步骤名，用于日志
    pub fn step(&self) -> &'static str {
        match self {
            ContainerError::Inspect { .. } => "inspect",
            ContainerError::Stop { .. } => "stop",
            ContainerError::Create { .. } => "create",
            ContainerError::Start { .. } => "start",
        }
    }
}

/// 流水线终止错误
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Service restart failed: {0}")]
    ServiceRestart(#[source] ContainerError),

    #[error("Proxy restart failed: {0}")]
    ProxyRestart(#[source] ContainerError),
}

impl PipelineError {
    pub fn container_error(&self) -> &ContainerError {
        match self {
            PipelineError::ServiceRestart(e) | PipelineError::ProxyRestart(e) => e,
        }
    }
}

/// 便捷类型别名
pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_error_accessors() {
        let err = ContainerError::Create {
            container: "authd".to_string(),
            source: RuntimeError::Other("conflict".to_string()),
        };
        assert_eq!(err.container(), "authd");
        assert_eq!(err.step(), "create");
        assert_eq!(
            err.to_string(),
            "Failed to create container authd: Container runtime error: conflict"
        );
    }

    #[test]
    fn test_pipeline_error_wraps_container_error() {
        let err = PipelineError::ProxyRestart(ContainerError::Start {
            container: "traefik".to_string(),
            source: RuntimeError::Server {
                status: 500,
                message: "port is already allocated".to_string(),
            },
        });
        assert_eq!(err.container_error().container(), "traefik");
        assert!(err.to_string().starts_with("Proxy restart failed"));
    }
}
