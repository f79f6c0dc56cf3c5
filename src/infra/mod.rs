//! 基础设施模块
//!
//! 封装外部依赖（容器运行时、服务注册中心）

pub mod docker;
pub mod registry;

pub use docker::{ContainerRuntime, DockerRuntime};
pub use registry::{NoDiscovery, RegistryClient, ServiceDiscovery};
