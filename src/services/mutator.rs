//! 容器重配置与重启
//!
//! inspect → 应用标签/命令增量 → stop → (尽力) remove → create → start，
//! 除增量外保留容器原有的全部配置

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::LabelSet;
use crate::error::ContainerError;
use crate::infra::ContainerRuntime;

/// 停止等待时间：有意的重配置重启，直接 kill
pub const STOP_TIMEOUT_SECS: i64 = 0;

/// 删除步骤结果
///
/// 部分容器由其 supervisor 以自动删除方式启动，此时可能已被删除或正在删除，
/// 删除失败不视为致命
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    Removed,
    /// 删除失败但继续，附带失败原因
    Tolerated(String),
}

/// 单次重启结果
#[derive(Debug, Clone)]
pub struct MutationReport {
    pub container: String,
    pub removal: RemovalOutcome,
}

impl MutationReport {
    pub fn removal_tolerated(&self) -> bool {
        matches!(self.removal, RemovalOutcome::Tolerated(_))
    }
}

/// 容器变更器（无状态）
#[derive(Clone)]
pub struct ContainerMutator {
    runtime: Arc<dyn ContainerRuntime>,
    /// 删除失败后的固定等待
    removal_backoff: Duration,
}

impl ContainerMutator {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, removal_backoff: Duration) -> Self {
        Self {
            runtime,
            removal_backoff,
        }
    }

    /// 以新标签和追加参数重建并启动容器
    ///
    /// inspect / stop / create / start 失败直接返回错误；
    /// remove 失败记录为 `RemovalOutcome::Tolerated` 并在等待后继续
    pub async fn mutate_and_restart(
        &self,
        container: &str,
        new_labels: &LabelSet,
        extra_args: &[String],
    ) -> Result<MutationReport, ContainerError> {
        let snapshot = self
            .runtime
            .inspect(container)
            .await
            .map_err(|source| ContainerError::Inspect {
                container: container.to_string(),
                source,
            })?;

        let spec = snapshot.with_delta(new_labels, extra_args);

        self.runtime
            .stop(container, STOP_TIMEOUT_SECS)
            .await
            .map_err(|source| ContainerError::Stop {
                container: container.to_string(),
                source,
            })?;

        let removal = match self.runtime.remove(container).await {
            Ok(()) => RemovalOutcome::Removed,
            Err(e) => {
                warn!(
                    container = %container,
                    error = %e,
                    backoff_secs = self.removal_backoff.as_secs(),
                    "Failed to remove container, continuing after backoff"
                );
                tokio::time::sleep(self.removal_backoff).await;
                RemovalOutcome::Tolerated(e.to_string())
            }
        };

        self.runtime
            .create(container, &spec)
            .await
            .map_err(|source| ContainerError::Create {
                container: container.to_string(),
                source,
            })?;

        self.runtime
            .start(container)
            .await
            .map_err(|source| ContainerError::Start {
                container: container.to_string(),
                source,
            })?;

        info!(
            container = %container,
            image = ?snapshot.image(),
            labels = new_labels.len(),
            extra_args = extra_args.len(),
            "Container recreated and started"
        );

        Ok(MutationReport {
            container: container.to_string(),
            removal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{labels_for, ManagedService};
    use crate::testing::{FakeRuntime, Op, RuntimeCall};

    fn mutator(runtime: &Arc<FakeRuntime>) -> ContainerMutator {
        ContainerMutator::new(runtime.clone(), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_full_cycle_in_order() {
        let runtime = Arc::new(FakeRuntime::with_containers(&["dnsd"]));
        let labels = labels_for(&ManagedService::subdomain("dnsd"), "example.com");

        let report = mutator(&runtime)
            .mutate_and_restart("dnsd", &labels, &[])
            .await
            .unwrap();

        assert_eq!(report.removal, RemovalOutcome::Removed);
        assert_eq!(
            runtime.calls(),
            vec![
                RuntimeCall::Inspect("dnsd".to_string()),
                RuntimeCall::Stop("dnsd".to_string(), 0),
                RuntimeCall::Remove("dnsd".to_string()),
                RuntimeCall::Create("dnsd".to_string()),
                RuntimeCall::Start("dnsd".to_string()),
            ]
        );

        let spec = runtime.created_spec("dnsd").unwrap();
        let created_labels = spec.labels();
        assert!(!created_labels.contains_key("traefik.http.routers.dnsd.rule"));
        assert_eq!(
            created_labels.get("com.docker.compose.service").map(String::as_str),
            Some("dnsd")
        );
        for (key, value) in &labels {
            assert_eq!(created_labels.get(key), Some(value));
        }
        // 未变更的配置原样保留
        assert_eq!(spec.command(), vec!["serve"]);
        assert_eq!(spec.config.env, Some(vec!["SERVICE_NAME=dnsd".to_string()]));
        assert_eq!(
            spec.host_config.and_then(|h| h.network_mode),
            Some("prem-gateway".to_string())
        );
    }

    #[tokio::test]
    async fn test_removal_failure_is_tolerated() {
        let runtime = Arc::new(FakeRuntime::with_containers(&["modelx"]));
        runtime.fail(Op::Remove, "modelx");

        let report = mutator(&runtime)
            .mutate_and_restart("modelx", &LabelSet::new(), &[])
            .await
            .unwrap();

        assert!(report.removal_tolerated());
        assert!(matches!(report.removal, RemovalOutcome::Tolerated(ref msg) if msg.contains("Remove")));
        assert!(runtime.position(&RuntimeCall::Create("modelx".to_string())).is_some());
        assert!(runtime.position(&RuntimeCall::Start("modelx".to_string())).is_some());
    }

    #[tokio::test]
    async fn test_inspect_failure_is_fatal() {
        let runtime = Arc::new(FakeRuntime::default());

        let err = mutator(&runtime)
            .mutate_and_restart("ghost", &LabelSet::new(), &[])
            .await
            .unwrap_err();

        assert!(matches!(err, ContainerError::Inspect { .. }));
        assert_eq!(runtime.calls(), vec![RuntimeCall::Inspect("ghost".to_string())]);
    }

    #[tokio::test]
    async fn test_stop_failure_is_fatal() {
        let runtime = Arc::new(FakeRuntime::with_containers(&["authd"]));
        runtime.fail(Op::Stop, "authd");

        let err = mutator(&runtime)
            .mutate_and_restart("authd", &LabelSet::new(), &[])
            .await
            .unwrap_err();

        assert!(matches!(err, ContainerError::Stop { .. }));
        assert_eq!(err.step(), "stop");
        assert_eq!(
            runtime.calls(),
            vec![
                RuntimeCall::Inspect("authd".to_string()),
                RuntimeCall::Stop("authd".to_string(), STOP_TIMEOUT_SECS),
            ]
        );
        assert!(runtime.created_spec("authd").is_none());
    }

    #[tokio::test]
    async fn test_create_failure_is_fatal() {
        let runtime = Arc::new(FakeRuntime::with_containers(&["authd"]));
        runtime.fail(Op::Create, "authd");

        let err = mutator(&runtime)
            .mutate_and_restart("authd", &LabelSet::new(), &[])
            .await
            .unwrap_err();

        assert!(matches!(err, ContainerError::Create { .. }));
        assert_eq!(err.container(), "authd");
        assert!(runtime.position(&RuntimeCall::Start("authd".to_string())).is_none());
    }

    #[tokio::test]
    async fn test_start_failure_is_fatal() {
        let runtime = Arc::new(FakeRuntime::with_containers(&["authd"]));
        runtime.fail(Op::Start, "authd");

        let err = mutator(&runtime)
            .mutate_and_restart("authd", &LabelSet::new(), &[])
            .await
            .unwrap_err();

        assert!(matches!(err, ContainerError::Start { .. }));
    }

    #[tokio::test]
    async fn test_extra_args_are_appended() {
        let runtime = Arc::new(FakeRuntime::with_containers(&["traefik"]));
        let args = vec!["--ping".to_string(), "--accesslog=true".to_string()];

        mutator(&runtime)
            .mutate_and_restart("traefik", &LabelSet::new(), &args)
            .await
            .unwrap();

        let spec = runtime.created_spec("traefik").unwrap();
        assert_eq!(spec.command(), vec!["serve", "--ping", "--accesslog=true"]);
        // 没有新标签时不清理原有路由标签
        assert!(spec.labels().contains_key("traefik.http.routers.traefik.rule"));
    }

    #[tokio::test]
    async fn test_repeated_mutation_has_no_stale_labels() {
        let runtime = Arc::new(FakeRuntime::with_containers(&["dnsd"]));
        let m = mutator(&runtime);

        let first = labels_for(&ManagedService::subdomain("dnsd"), "old.com");
        let second = labels_for(&ManagedService::subdomain("dnsd"), "new.com");
        m.mutate_and_restart("dnsd", &first, &[]).await.unwrap();
        m.mutate_and_restart("dnsd", &second, &[]).await.unwrap();

        let labels = runtime.created_spec("dnsd").unwrap().labels();
        assert!(!labels.values().any(|v| v.contains("old.com")));
        assert!(!labels.contains_key("traefik.http.routers.dnsd.rule"));
        assert_eq!(labels.len(), second.len() + 1);
    }
}
