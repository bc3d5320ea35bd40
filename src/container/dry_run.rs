use crate::Result;
use crate::container::TestContainer;
use crate::container::types::{ContainerState, DeploymentId};
use crate::error::RexamError;
use crate::listener::TestOutcome;
use crate::probe::{Probe, TestAddress, TestDescription};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// 容器上发生的一次交互
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerEvent {
    Started,
    StartFailed,
    Installed(String),
    ProbeInstalled(String),
    InstallFailed(String),
    ProbeUninstalled(String),
    Called(TestDescription),
    Stopped,
}

impl fmt::Display for ContainerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "start"),
            Self::StartFailed => write!(f, "start (failed)"),
            Self::Installed(name) => write!(f, "install {}", name),
            Self::ProbeInstalled(name) => write!(f, "install probe {}", name),
            Self::InstallFailed(name) => write!(f, "install probe {} (failed)", name),
            Self::ProbeUninstalled(name) => write!(f, "uninstall probe {}", name),
            Self::Called(description) => write!(f, "run {}", description),
            Self::Stopped => write!(f, "stop"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub container: String,
    pub event: ContainerEvent,
}

/// 多个容器共享的交互记录
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, container: &str, event: ContainerEvent) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(JournalEntry {
                container: container.to_string(),
                event,
            });
        }
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// 某个容器上的事件，按发生顺序
    pub fn events_for(&self, container: &str) -> Vec<ContainerEvent> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.container == container)
            .map(|entry| entry.event)
            .collect()
    }

    pub fn count(&self, container: &str, event: &ContainerEvent) -> usize {
        self.events_for(container)
            .iter()
            .filter(|e| *e == event)
            .count()
    }
}

/// 不启动任何真实运行时的容器
///
/// 所有交互写入 `Journal`，调用默认返回 `Passed`。用于 `rexam plan`
/// 预览调度，也可以注入故障来模拟启动、部署或调用失败。
pub struct DryRunContainer {
    name: String,
    state: ContainerState,
    journal: Journal,
    probe: Option<String>,
    outcomes: HashMap<TestDescription, TestOutcome>,
    start_failure: Option<String>,
    install_failure: Option<String>,
    uninstall_failure: Option<String>,
    call_failure: Option<String>,
}

impl DryRunContainer {
    pub fn new(name: impl Into<String>, journal: Journal) -> Self {
        Self {
            name: name.into(),
            state: ContainerState::Stopped,
            journal,
            probe: None,
            outcomes: HashMap::new(),
            start_failure: None,
            install_failure: None,
            uninstall_failure: None,
            call_failure: None,
        }
    }

    /// 指定某个测试的结果
    pub fn with_outcome(mut self, description: TestDescription, outcome: TestOutcome) -> Self {
        self.outcomes.insert(description, outcome);
        self
    }

    pub fn failing_start(mut self, message: impl Into<String>) -> Self {
        self.start_failure = Some(message.into());
        self
    }

    pub fn failing_install(mut self, message: impl Into<String>) -> Self {
        self.install_failure = Some(message.into());
        self
    }

    pub fn failing_uninstall(mut self, message: impl Into<String>) -> Self {
        self.uninstall_failure = Some(message.into());
        self
    }

    pub fn failing_call(mut self, message: impl Into<String>) -> Self {
        self.call_failure = Some(message.into());
        self
    }
}

#[async_trait]
impl TestContainer for DryRunContainer {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> ContainerState {
        self.state
    }

    fn installed_probe(&self) -> Option<&str> {
        self.probe.as_deref()
    }

    async fn start(&mut self) -> Result<()> {
        if let Some(message) = &self.start_failure {
            self.journal.record(&self.name, ContainerEvent::StartFailed);
            return Err(RexamError::ContainerStart(message.clone()));
        }
        self.journal.record(&self.name, ContainerEvent::Started);
        self.state = ContainerState::Running;
        Ok(())
    }

    async fn install(&mut self, name: &str, _bytes: &[u8]) -> Result<DeploymentId> {
        self.journal
            .record(&self.name, ContainerEvent::Installed(name.to_string()));
        Ok(DeploymentId::new())
    }

    async fn install_probe(&mut self, probe: &Probe) -> Result<DeploymentId> {
        if self.state != ContainerState::Running {
            return Err(RexamError::Deployment(format!(
                "container {} is {}, not running",
                self.name, self.state
            )));
        }
        if let Some(message) = &self.install_failure {
            self.journal.record(
                &self.name,
                ContainerEvent::InstallFailed(probe.name().to_string()),
            );
            return Err(RexamError::Deployment(message.clone()));
        }
        self.journal.record(
            &self.name,
            ContainerEvent::ProbeInstalled(probe.name().to_string()),
        );
        self.probe = Some(probe.name().to_string());
        Ok(DeploymentId::new())
    }

    async fn uninstall_probe(&mut self) -> Result<()> {
        if self.probe.is_some()
            && let Some(message) = &self.uninstall_failure
        {
            return Err(RexamError::Deployment(message.clone()));
        }
        if let Some(name) = self.probe.take() {
            self.journal
                .record(&self.name, ContainerEvent::ProbeUninstalled(name));
        }
        Ok(())
    }

    async fn call(&mut self, address: &TestAddress) -> Result<TestOutcome> {
        self.journal.record(
            &self.name,
            ContainerEvent::Called(address.description.clone()),
        );
        if let Some(message) = &self.call_failure {
            return Err(RexamError::Invocation(message.clone()));
        }
        Ok(self
            .outcomes
            .get(&address.description)
            .cloned()
            .unwrap_or(TestOutcome::Passed))
    }

    async fn stop(&mut self) {
        self.journal.record(&self.name, ContainerEvent::Stopped);
        self.probe = None;
        self.state = ContainerState::Stopped;
    }
}
