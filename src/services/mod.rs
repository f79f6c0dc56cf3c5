//! 服务层模块
//!
//! 容器改写与重启流水线

pub mod mutator;
pub mod pipeline;

pub use mutator::{ContainerMutator, MutationReport, RemovalOutcome};
pub use pipeline::{PipelineConfig, PipelineReport, ProvisioningPipeline};
