use crate::Result;
use crate::config::ReactorSection;
use crate::container::{ContainerState, TestContainer};
use crate::error::RexamError;
use crate::listener::TestListener;
use crate::probe::{Probe, ProbeBuilder, TestDescription};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// 容器启动/停止的超时设置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReactorOptions {
    pub start_timeout: Option<Duration>,
    pub stop_timeout: Option<Duration>,
}

impl From<&ReactorSection> for ReactorOptions {
    fn from(section: &ReactorSection) -> Self {
        Self {
            start_timeout: section.start_timeout(),
            stop_timeout: section.stop_timeout(),
        }
    }
}

/// 各策略共用的容器和探针
pub(crate) struct Stage {
    containers: Vec<Box<dyn TestContainer>>,
    probes: Vec<ProbeBuilder>,
    options: ReactorOptions,
    /// stop 超时被放弃的容器，视为已停止，下次激活时重新启动
    abandoned: HashSet<usize>,
}

impl Stage {
    pub(crate) fn new(
        containers: Vec<Box<dyn TestContainer>>,
        probes: Vec<ProbeBuilder>,
        options: ReactorOptions,
    ) -> Result<Self> {
        if containers.is_empty() {
            return Err(RexamError::Configuration(
                "reactor needs at least one container".to_string(),
            ));
        }
        if probes.is_empty() {
            return Err(RexamError::Configuration(
                "reactor needs at least one probe".to_string(),
            ));
        }
        Ok(Self {
            containers,
            probes,
            options,
            abandoned: HashSet::new(),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.containers.len()
    }

    /// 优先选择显式声明该测试的探针，其次是能服务任意测试的探针，最后退回第一个
    pub(crate) fn select_probe(&self, description: &TestDescription) -> Result<Arc<Probe>> {
        let built = self
            .probes
            .iter()
            .map(ProbeBuilder::build)
            .collect::<Result<Vec<_>>>()?;

        let chosen = built
            .iter()
            .find(|p| p.declares(description))
            .or_else(|| built.iter().find(|p| p.serves(description)))
            .or_else(|| built.first())
            .cloned();

        chosen.ok_or_else(|| RexamError::Configuration("reactor has no probes".to_string()))
    }

    /// 容器是否处于运行状态（被放弃的容器不算）
    fn is_running(&self, index: usize) -> bool {
        !self.abandoned.contains(&index) && self.containers[index].state() == ContainerState::Running
    }

    /// 确保容器运行并装好对应探针
    ///
    /// 已装有其他探针时先卸载。任何一步失败都先停止容器再返回错误。
    pub(crate) async fn activate(&mut self, index: usize, description: &TestDescription) -> Result<()> {
        let probe = self.select_probe(description)?;
        let start_timeout = self.options.start_timeout;

        let fresh = !self.is_running(index);
        if fresh {
            self.abandoned.remove(&index);
            let container = self.containers[index].as_mut();
            if let Err(e) = start_container(container, start_timeout).await {
                warn!(container = %container.name(), "Start failed: {}", e);
                self.deactivate(index).await;
                return Err(e);
            }
        }

        let container = self.containers[index].as_mut();
        let installed = if fresh {
            None
        } else {
            container.installed_probe().map(str::to_string)
        };
        if installed.as_deref() == Some(probe.name()) {
            return Ok(());
        }

        if let Some(previous) = installed
            && let Err(e) = container.uninstall_probe().await
        {
            warn!(container = %container.name(), probe = %previous, "Probe uninstall failed: {}", e);
            self.deactivate(index).await;
            return Err(e);
        }

        let container = self.containers[index].as_mut();
        if let Err(e) = container.install_probe(&probe).await {
            warn!(container = %container.name(), probe = %probe.name(), "Probe install failed: {}", e);
            self.deactivate(index).await;
            return Err(e);
        }

        Ok(())
    }

    pub(crate) async fn run(
        &mut self,
        index: usize,
        description: &TestDescription,
        listener: &dyn TestListener,
    ) -> Result<()> {
        let container = self.containers[index].as_mut();
        debug!(container = %container.name(), test = %description, "Running test");
        let result = container.run_test(description, listener).await;
        if let Err(e) = &result {
            warn!(container = %container.name(), test = %description, "Test invocation failed: {}", e);
        }
        result
    }

    /// 停止容器；超时的容器记为已放弃，不再重复停止
    pub(crate) async fn deactivate(&mut self, index: usize) {
        if self.abandoned.contains(&index) {
            return;
        }
        let stop_timeout = self.options.stop_timeout;
        if !stop_container(self.containers[index].as_mut(), stop_timeout).await {
            self.abandoned.insert(index);
        }
    }

    /// 停止所有仍在运行的容器
    pub(crate) async fn deactivate_all(&mut self) {
        for index in 0..self.containers.len() {
            if self.containers[index].state() != ContainerState::Stopped {
                self.deactivate(index).await;
            }
        }
    }
}

async fn start_container(container: &mut dyn TestContainer, limit: Option<Duration>) -> Result<()> {
    let Some(limit) = limit else {
        return container.start().await;
    };

    let result = tokio::time::timeout(limit, container.start()).await;
    match result {
        Ok(started) => started,
        Err(_) => Err(RexamError::Timeout {
            operation: format!("start {}", container.name()),
            seconds: limit.as_secs(),
        }),
    }
}

/// 返回 stop 是否在限时内完成
async fn stop_container(container: &mut dyn TestContainer, limit: Option<Duration>) -> bool {
    let Some(limit) = limit else {
        container.stop().await;
        return true;
    };

    if tokio::time::timeout(limit, container.stop()).await.is_err() {
        warn!(
            container = %container.name(),
            "Stop did not finish within {}s, abandoning",
            limit.as_secs()
        );
        return false;
    }
    true
}
