//! 域名就绪后的重启流水线
//!
//! Idle → Discovering → RestartingServices → Settling → RestartingProxy → Completed | Failed
//!
//! 各步骤严格串行：所有服务容器重启完成后才重启代理，
//! 代理按容器标签读取路由，提前重启会加载旧路由

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    labels_for, merge_services, proxy_command_args, AcmeSettings, LabelSet, ManagedService,
    PipelineState, ProvisioningEvent, RestartOutcome,
};
use crate::error::PipelineError;
use crate::infra::{ContainerRuntime, ServiceDiscovery};

use super::mutator::ContainerMutator;

/// 流水线配置，构造后不再修改
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 静态服务（按配置顺序重启）
    pub static_services: Vec<ManagedService>,
    /// 反向代理容器名
    pub proxy_container: String,
    pub acme: AcmeSettings,
    /// 服务重启后、代理重启前的等待
    pub settle_delay: Duration,
    /// 删除失败后的等待
    pub removal_backoff: Duration,
}

/// 一次流水线运行的结果，仅用于日志
#[derive(Debug)]
pub struct PipelineReport {
    pub run_id: String,
    pub domain: String,
    pub state: PipelineState,
    pub outcomes: Vec<RestartOutcome>,
    pub error: Option<PipelineError>,
}

impl PipelineReport {
    fn new(domain: &str) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            domain: domain.to_string(),
            state: PipelineState::Idle,
            outcomes: Vec::new(),
            error: None,
        }
    }

    fn transition(&mut self, next: PipelineState) {
        info!(
            run_id = %self.run_id,
            domain = %self.domain,
            from = %self.state,
            to = %next,
            "Pipeline state changed"
        );
        self.state = next;
    }

    fn fail(mut self, err: PipelineError) -> Self {
        self.transition(PipelineState::Failed);
        self.error = Some(err);
        self
    }

    /// 是否走到了代理重启阶段之后
    pub fn succeeded(&self) -> bool {
        self.state == PipelineState::Completed
    }
}

/// 重启流水线
pub struct ProvisioningPipeline {
    config: PipelineConfig,
    discovery: Arc<dyn ServiceDiscovery>,
    mutator: ContainerMutator,
}

impl ProvisioningPipeline {
    pub fn new(
        config: PipelineConfig,
        runtime: Arc<dyn ContainerRuntime>,
        discovery: Arc<dyn ServiceDiscovery>,
    ) -> Self {
        let mutator = ContainerMutator::new(runtime, config.removal_backoff);
        Self {
            config,
            discovery,
            mutator,
        }
    }

    /// 在后台执行流水线（fire-and-forget）
    ///
    /// 调用方不需要等待；结果只写日志。返回的 handle 仅供测试等待
    pub fn spawn(self: &Arc<Self>, event: ProvisioningEvent) -> JoinHandle<PipelineReport> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let report = pipeline.run(event).await;
            log_report(&report);
            report
        })
    }

    /// 执行一次完整流水线
    pub async fn run(&self, event: ProvisioningEvent) -> PipelineReport {
        let mut report = PipelineReport::new(&event.domain);

        // 发现：失败已降级为空列表，这一步不会让流水线失败
        report.transition(PipelineState::Discovering);
        let discovered = self.discovery.discover_running_services().await;
        let services = merge_services(&self.config.static_services, discovered);

        report.transition(PipelineState::RestartingServices);
        for service in &services {
            let labels = labels_for(service, &event.domain);
            let started_at = Utc::now();

            match self
                .mutator
                .mutate_and_restart(service.name(), &labels, &[])
                .await
            {
                Ok(mutation) => {
                    info!(
                        run_id = %report.run_id,
                        container = %service.name(),
                        discovered = service.is_discovered(),
                        removal_tolerated = mutation.removal_tolerated(),
                        "Restarted service container"
                    );
                    report.outcomes.push(RestartOutcome::succeeded(
                        service.name(),
                        started_at,
                        mutation.removal_tolerated(),
                    ));
                }
                Err(e) => {
                    report
                        .outcomes
                        .push(RestartOutcome::failed(service.name(), started_at, e.to_string()));
                    return report.fail(PipelineError::ServiceRestart(e));
                }
            }
        }

        report.transition(PipelineState::Settling);
        tokio::time::sleep(self.config.settle_delay).await;

        report.transition(PipelineState::RestartingProxy);
        let proxy = self.config.proxy_container.as_str();
        let args = proxy_command_args(&self.config.acme, &event.email);
        let started_at = Utc::now();

        match self
            .mutator
            .mutate_and_restart(proxy, &LabelSet::new(), &args)
            .await
        {
            Ok(mutation) => {
                report.outcomes.push(RestartOutcome::succeeded(
                    proxy,
                    started_at,
                    mutation.removal_tolerated(),
                ));
            }
            Err(e) => {
                report
                    .outcomes
                    .push(RestartOutcome::failed(proxy, started_at, e.to_string()));
                return report.fail(PipelineError::ProxyRestart(e));
            }
        }

        report.transition(PipelineState::Completed);
        report
    }
}

/// 流水线结果只通过日志可见
fn log_report(report: &PipelineReport) {
    let restarted = report.outcomes.iter().filter(|o| o.success).count();
    let tolerated = report.outcomes.iter().filter(|o| o.removal_tolerated).count();

    if report.succeeded() {
        info!(
            run_id = %report.run_id,
            domain = %report.domain,
            restarted,
            tolerated_removals = tolerated,
            "Domain provisioning pipeline completed"
        );
    } else if let Some(e) = &report.error {
        let failed = e.container_error();
        error!(
            run_id = %report.run_id,
            domain = %report.domain,
            state = %report.state,
            container = %failed.container(),
            step = failed.step(),
            restarted,
            error = %e,
            "Domain provisioning pipeline failed"
        );
    }

    if tolerated > 0 {
        warn!(
            run_id = %report.run_id,
            containers = ?report
                .outcomes
                .iter()
                .filter(|o| o.removal_tolerated)
                .map(|o| o.name.as_str())
                .collect::<Vec<_>>(),
            "Some containers could not be removed before recreation"
        );
    }
}
