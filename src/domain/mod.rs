//! 领域模型模块
//!
//! 纯数据结构与纯函数，不依赖 axum/tokio

pub mod container;
pub mod proxy;
pub mod routing;
pub mod service;

// Re-exports for convenience
pub use container::{ContainerSnapshot, ContainerSpec};
pub use proxy::{proxy_command_args, AcmeSettings};
pub use routing::{labels_for, merge_labels, LabelSet};
pub use service::{
    merge_services, ManagedService, PipelineState, ProvisioningEvent, RestartOutcome, ServiceRole,
};
