//! 测试替身：内存容器运行时与固定结果的服务发现

use async_trait::async_trait;
use bollard::models::{ContainerConfig, HostConfig};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::env::constants::*;
use crate::config::{EnvConfig, RegistryConfig};
use crate::domain::proxy::DEFAULT_ACME_STORAGE;
use crate::domain::{ContainerSnapshot, ContainerSpec};
use crate::error::{RuntimeError, RuntimeResult};
use crate::infra::{ContainerRuntime, NoDiscovery, ServiceDiscovery};
use crate::state::AppState;

/// 运行时调用记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    Inspect(String),
    Stop(String, i64),
    Remove(String),
    Create(String),
    Start(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Inspect,
    Stop,
    Remove,
    Create,
    Start,
}

/// 内存容器运行时
#[derive(Default)]
pub struct FakeRuntime {
    containers: Mutex<HashMap<String, ContainerSnapshot>>,
    created: Mutex<HashMap<String, ContainerSpec>>,
    failures: Mutex<HashSet<(Op, String)>>,
    calls: Mutex<Vec<RuntimeCall>>,
}

impl FakeRuntime {
    /// 预置若干容器，每个都带一条旧的路由标签
    pub fn with_containers(names: &[&str]) -> Self {
        let runtime = Self::default();
        for name in names {
            runtime.add_container(snapshot_for(name));
        }
        runtime
    }

    pub fn add_container(&self, snapshot: ContainerSnapshot) {
        self.containers
            .lock()
            .unwrap()
            .insert(snapshot.name.clone(), snapshot);
    }

    /// 让某个容器的某一步失败
    pub fn fail(&self, op: Op, name: &str) {
        self.failures.lock().unwrap().insert((op, name.to_string()));
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn position(&self, call: &RuntimeCall) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }

    /// 最近一次以该名称创建的配置
    pub fn created_spec(&self, name: &str) -> Option<ContainerSpec> {
        self.created.lock().unwrap().get(name).cloned()
    }

    fn record(&self, call: RuntimeCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: Op, name: &str) -> RuntimeResult<()> {
        if self.failures.lock().unwrap().contains(&(op, name.to_string())) {
            return Err(RuntimeError::Other(format!("injected {:?} failure", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn inspect(&self, name: &str) -> RuntimeResult<ContainerSnapshot> {
        self.record(RuntimeCall::Inspect(name.to_string()));
        self.check(Op::Inspect, name)?;
        self.containers
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))
    }

    async fn stop(&self, name: &str, timeout_secs: i64) -> RuntimeResult<()> {
        self.record(RuntimeCall::Stop(name.to_string(), timeout_secs));
        self.check(Op::Stop, name)
    }

    async fn remove(&self, name: &str) -> RuntimeResult<()> {
        self.record(RuntimeCall::Remove(name.to_string()));
        self.check(Op::Remove, name)?;
        self.containers.lock().unwrap().remove(name);
        Ok(())
    }

    async fn create(&self, name: &str, spec: &ContainerSpec) -> RuntimeResult<()> {
        self.record(RuntimeCall::Create(name.to_string()));
        self.check(Op::Create, name)?;
        self.created
            .lock()
            .unwrap()
            .insert(name.to_string(), spec.clone());
        self.add_container(ContainerSnapshot {
            name: name.to_string(),
            config: spec.config.clone(),
            host_config: spec.host_config.clone(),
            networks: spec.networks.clone(),
        });
        Ok(())
    }

    async fn start(&self, name: &str) -> RuntimeResult<()> {
        self.record(RuntimeCall::Start(name.to_string()));
        self.check(Op::Start, name)
    }
}

/// 预置快照：镜像、命令、一条旧路由标签和一条普通标签
pub fn snapshot_for(name: &str) -> ContainerSnapshot {
    let labels: HashMap<String, String> = [
        (
            format!("traefik.http.routers.{}.rule", name),
            "Host(`stale.example.org`)".to_string(),
        ),
        ("com.docker.compose.service".to_string(), name.to_string()),
    ]
    .into_iter()
    .collect();

    ContainerSnapshot {
        name: name.to_string(),
        config: ContainerConfig {
            image: Some(format!("ghcr.io/premai-io/{}:latest", name)),
            cmd: Some(vec!["serve".to_string()]),
            env: Some(vec![format!("SERVICE_NAME={}", name)]),
            labels: Some(labels),
            ..Default::default()
        },
        host_config: Some(HostConfig {
            network_mode: Some("prem-gateway".to_string()),
            ..Default::default()
        }),
        networks: HashMap::new(),
    }
}

/// 返回固定列表的服务发现
pub struct StaticDiscovery(pub Vec<(String, u16)>);

#[async_trait]
impl ServiceDiscovery for StaticDiscovery {
    async fn discover_running_services(&self) -> Vec<(String, u16)> {
        self.0.clone()
    }
}

/// 测试配置：premapp + authd + dnsd，无等待
pub fn test_config() -> EnvConfig {
    EnvConfig {
        port: DEFAULT_PORT,
        services: vec!["premapp".to_string(), "authd".to_string(), "dnsd".to_string()],
        primary_service: DEFAULT_PRIMARY_SERVICE.to_string(),
        primary_service_port: DEFAULT_PRIMARY_PORT,
        proxy_container: DEFAULT_PROXY_CONTAINER.to_string(),
        registry: RegistryConfig {
            service: DEFAULT_REGISTRY_SERVICE.to_string(),
            url: DEFAULT_REGISTRY_URL.to_string(),
            timeout: Duration::from_secs(REGISTRY_TIMEOUT_SECS),
        },
        letsencrypt_production: false,
        acme_storage: DEFAULT_ACME_STORAGE.to_string(),
        settle_delay: Duration::ZERO,
        removal_backoff: Duration::ZERO,
    }
}

/// 基于内存运行时的应用状态
pub fn test_state(runtime: Arc<FakeRuntime>) -> Arc<AppState> {
    Arc::new(AppState::new(test_config(), runtime, Arc::new(NoDiscovery)))
}
