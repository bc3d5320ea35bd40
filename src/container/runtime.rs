use crate::Result;
use crate::config::RuntimeConfig;
use crate::container::TestContainer;
use crate::container::types::{ContainerState, DeploymentId, DeploymentStack};
use crate::error::RexamError;
use crate::listener::TestOutcome;
use crate::probe::manifest::is_plain_file_name;
use crate::probe::{Probe, ProbeInvoker, ProbeInvokerFactory, TestAddress};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

const DEPLOYMENTS_DIR: &str = "deployments";

struct InstalledProbe {
    name: String,
    file: PathBuf,
    invoker: Box<dyn ProbeInvoker>,
}

/// 基于工作目录的通用运行时容器
///
/// 启动时创建 `{work_dir}/{name}` 工作区并部署配置的模块；
/// 探针以文件形式部署，实际调用交给对应运行时的 `ProbeInvoker`。
pub struct RuntimeContainer {
    name: String,
    state: ContainerState,
    runtime: RuntimeConfig,
    factory: Arc<dyn ProbeInvokerFactory>,
    deployed: DeploymentStack,
    probe: Option<InstalledProbe>,
    workspace: Option<PathBuf>,
}

impl RuntimeContainer {
    pub fn new(
        name: impl Into<String>,
        runtime: RuntimeConfig,
        factory: Arc<dyn ProbeInvokerFactory>,
    ) -> Self {
        Self {
            name: name.into(),
            state: ContainerState::Stopped,
            runtime,
            factory,
            deployed: DeploymentStack::new(),
            probe: None,
            workspace: None,
        }
    }

    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    /// 当前部署的模块（不含探针）
    pub fn deployments(&self) -> &DeploymentStack {
        &self.deployed
    }

    pub fn workspace(&self) -> Option<&Path> {
        self.workspace.as_deref()
    }

    fn running_workspace(&self) -> Result<&Path> {
        match (&self.state, &self.workspace) {
            (ContainerState::Running, Some(workspace)) => Ok(workspace.as_path()),
            _ => Err(RexamError::Deployment(format!(
                "container {} is {}, not running",
                self.name, self.state
            ))),
        }
    }

    async fn prepare(&mut self) -> Result<()> {
        if !self.runtime.home.is_dir() {
            return Err(RexamError::ContainerStart(format!(
                "runtime home {} does not exist",
                self.runtime.home.display()
            )));
        }

        let workspace = self.runtime.work_dir.join(&self.name);
        fs::create_dir_all(workspace.join(DEPLOYMENTS_DIR))
            .await
            .map_err(|e| {
                RexamError::ContainerStart(format!(
                    "cannot create workspace {}: {}",
                    workspace.display(),
                    e
                ))
            })?;
        self.workspace = Some(workspace);
        Ok(())
    }

    async fn deploy_modules(&mut self) -> Result<()> {
        for (index, module) in self.runtime.modules.clone().iter().enumerate() {
            let bytes = fs::read(module).await.map_err(|e| {
                RexamError::ContainerStart(format!(
                    "problem deploying module {}: {}",
                    module.display(),
                    e
                ))
            })?;
            let name = module
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("module{}", index + 1));
            self.install(&name, &bytes)
                .await
                .map_err(|e| RexamError::ContainerStart(e.to_string()))?;
        }
        Ok(())
    }

    async fn write_deployment(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        if !is_plain_file_name(name) {
            return Err(RexamError::Deployment(format!(
                "deployment name '{}' is not a plain file name",
                name
            )));
        }
        let file = self.running_workspace()?.join(DEPLOYMENTS_DIR).join(name);
        fs::write(&file, bytes).await.map_err(|e| {
            RexamError::Deployment(format!("problem deploying {}: {}", name, e))
        })?;
        Ok(file)
    }

    async fn undeploy_all(&mut self) {
        if let Some(probe) = self.probe.take()
            && let Err(e) = fs::remove_file(&probe.file).await
        {
            warn!(container = %self.name, probe = %probe.name, "Failed to undeploy probe: {}", e);
        }

        let Some(workspace) = self.workspace.clone() else {
            self.deployed = DeploymentStack::new();
            return;
        };

        for name in self.deployed.drain_lifo() {
            let file = workspace.join(DEPLOYMENTS_DIR).join(&name);
            match fs::remove_file(&file).await {
                Ok(()) => debug!(container = %self.name, module = %name, "Undeployed"),
                Err(e) => warn!(container = %self.name, module = %name, "Failed to undeploy: {}", e),
            }
        }
    }
}

#[async_trait]
impl TestContainer for RuntimeContainer {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> ContainerState {
        self.state
    }

    fn installed_probe(&self) -> Option<&str> {
        self.probe.as_ref().map(|p| p.name.as_str())
    }

    async fn start(&mut self) -> Result<()> {
        if self.state != ContainerState::Stopped {
            // 上一次 stop 被放弃，内存中的部署记录已不可信
            warn!(container = %self.name, state = %self.state, "Discarding unfinished runtime before start");
            self.probe = None;
            self.deployed = DeploymentStack::new();
            self.state = ContainerState::Stopped;
        }

        info!(container = %self.name, runtime = %self.factory.kind(), "Starting container");
        self.state = ContainerState::Starting;

        if let Err(e) = self.prepare().await {
            self.state = ContainerState::Stopped;
            return Err(e);
        }

        // deploy_modules 需要 Running 状态才能写入部署目录
        self.state = ContainerState::Running;
        if let Err(e) = self.deploy_modules().await {
            self.stop().await;
            return Err(e);
        }

        debug!(container = %self.name, modules = self.deployed.len(), "Container running");
        Ok(())
    }

    async fn install(&mut self, name: &str, bytes: &[u8]) -> Result<DeploymentId> {
        if self.deployed.contains(name) {
            return Err(RexamError::Deployment(format!("{} is already deployed", name)));
        }
        self.write_deployment(name, bytes).await?;
        self.deployed.push(name);
        debug!(container = %self.name, module = %name, "Deployed");
        Ok(DeploymentId::new())
    }

    async fn install_probe(&mut self, probe: &Probe) -> Result<DeploymentId> {
        self.uninstall_probe().await?;

        let workspace = self.running_workspace()?.to_path_buf();
        let invoker = self.factory.create_invoker(probe, &self.runtime, &workspace)?;
        let file = self
            .write_deployment(&format!("{}.probe", probe.name()), probe.bytes())
            .await?;

        info!(container = %self.name, probe = %probe.name(), "Probe installed");
        self.probe = Some(InstalledProbe {
            name: probe.name().to_string(),
            file,
            invoker,
        });
        Ok(DeploymentId::new())
    }

    async fn uninstall_probe(&mut self) -> Result<()> {
        let Some(probe) = self.probe.take() else {
            return Ok(());
        };
        fs::remove_file(&probe.file).await.map_err(|e| {
            RexamError::Deployment(format!("problem undeploying {}: {}", probe.name, e))
        })?;
        debug!(container = %self.name, probe = %probe.name, "Probe uninstalled");
        Ok(())
    }

    async fn call(&mut self, address: &TestAddress) -> Result<TestOutcome> {
        if self.state != ContainerState::Running {
            return Err(RexamError::Invocation(format!(
                "container {} is {}, cannot call {}",
                self.name, self.state, address.description
            )));
        }
        let probe = self.probe.as_ref().ok_or_else(|| {
            RexamError::Invocation(format!("no probe installed in container {}", self.name))
        })?;
        probe.invoker.invoke(address).await
    }

    async fn stop(&mut self) {
        if self.state == ContainerState::Stopped && self.workspace.is_none() {
            return;
        }

        info!(container = %self.name, "Stopping container");
        self.state = ContainerState::Stopping;
        self.undeploy_all().await;

        if let Some(workspace) = self.workspace.take()
            && let Err(e) = fs::remove_dir_all(&workspace).await
        {
            warn!(container = %self.name, "Failed to remove workspace {}: {}", workspace.display(), e);
        }
        self.state = ContainerState::Stopped;
    }
}
