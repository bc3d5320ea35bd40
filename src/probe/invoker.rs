use crate::Result;
use crate::config::RuntimeConfig;
use crate::error::RexamError;
use crate::listener::TestOutcome;
use crate::probe::manifest::SuiteManifest;
use crate::probe::types::{Probe, TestAddress, TestDescription};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::process::Command;

/// 在运行时内部定位并执行一个测试
///
/// 断言失败以 `Ok(TestOutcome::Failed)` 返回；只有调用链路本身
/// 出问题时才返回 `Err(RexamError::Invocation)`。
#[async_trait]
pub trait ProbeInvoker: Send + Sync {
    async fn invoke(&self, address: &TestAddress) -> Result<TestOutcome>;
}

/// 每种运行时一个实现，安装探针时由容器调用
pub trait ProbeInvokerFactory: Send + Sync {
    fn kind(&self) -> InvokerKind;

    fn create_invoker(
        &self,
        probe: &Probe,
        runtime: &RuntimeConfig,
        work_dir: &Path,
    ) -> Result<Box<dyn ProbeInvoker>>;
}

/// 支持的调用方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvokerKind {
    /// 进程内注册的 Rust 测试函数
    Native,
    /// 清单中的 shell 命令
    #[default]
    Process,
}

impl fmt::Display for InvokerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokerKind::Native => write!(f, "native"),
            InvokerKind::Process => write!(f, "process"),
        }
    }
}

impl FromStr for InvokerKind {
    type Err = RexamError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(InvokerKind::Native),
            "process" => Ok(InvokerKind::Process),
            other => Err(RexamError::Configuration(format!(
                "unknown runtime '{}', expected native or process",
                other
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// native
// ---------------------------------------------------------------------------

/// 进程内测试函数：`Err(message)` 表示断言失败
pub type TestFn = Arc<dyn Fn() -> std::result::Result<(), String> + Send + Sync>;

/// 进程内测试注册表
#[derive(Clone, Default)]
pub struct NativeInvokerFactory {
    registry: Arc<HashMap<TestDescription, TestFn>>,
}

impl NativeInvokerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, description: TestDescription, test: F) -> Self
    where
        F: Fn() -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.registry).insert(description, Arc::new(test));
        self
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

impl ProbeInvokerFactory for NativeInvokerFactory {
    fn kind(&self) -> InvokerKind {
        InvokerKind::Native
    }

    fn create_invoker(
        &self,
        probe: &Probe,
        _runtime: &RuntimeConfig,
        _work_dir: &Path,
    ) -> Result<Box<dyn ProbeInvoker>> {
        if let Some(missing) = probe
            .tests()
            .iter()
            .filter(|t| t.is_executable())
            .find(|t| !self.registry.contains_key(t))
        {
            return Err(RexamError::Deployment(format!(
                "probe {} declares {} but no native test is registered",
                probe.name(),
                missing
            )));
        }

        Ok(Box::new(NativeInvoker {
            registry: Arc::clone(&self.registry),
        }))
    }
}

struct NativeInvoker {
    registry: Arc<HashMap<TestDescription, TestFn>>,
}

#[async_trait]
impl ProbeInvoker for NativeInvoker {
    async fn invoke(&self, address: &TestAddress) -> Result<TestOutcome> {
        let test = self.registry.get(&address.description).cloned().ok_or_else(|| {
            RexamError::Invocation(format!("no native test registered for {}", address.description))
        })?;

        // 测试函数可能阻塞，放到阻塞线程池执行，避免卡住 reactor 的超时
        let joined =
            tokio::task::spawn_blocking(move || catch_unwind(AssertUnwindSafe(|| test()))).await;

        let outcome = match joined {
            Ok(Ok(Ok(()))) => TestOutcome::Passed,
            Ok(Ok(Err(message))) => TestOutcome::Failed(message),
            Ok(Err(panic)) => TestOutcome::Error(panic_message(panic.as_ref())),
            Err(e) => TestOutcome::Error(format!("native test did not complete: {}", e)),
        };
        Ok(outcome)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "test panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// process
// ---------------------------------------------------------------------------

/// 探针内容是 TOML 清单，每个测试对应一条 shell 命令
#[derive(Debug, Clone)]
pub struct ProcessInvokerFactory {
    shell: String,
}

impl ProcessInvokerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ProcessInvokerFactory {
    fn default() -> Self {
        Self::with_shell("sh")
    }
}

impl ProbeInvokerFactory for ProcessInvokerFactory {
    fn kind(&self) -> InvokerKind {
        InvokerKind::Process
    }

    fn create_invoker(
        &self,
        probe: &Probe,
        runtime: &RuntimeConfig,
        work_dir: &Path,
    ) -> Result<Box<dyn ProbeInvoker>> {
        let manifest = SuiteManifest::from_bytes(probe.bytes()).map_err(|e| {
            RexamError::Deployment(format!("probe {} is not a suite manifest: {}", probe.name(), e))
        })?;

        let commands = manifest
            .tests
            .into_iter()
            .filter_map(|entry| {
                let description = entry.description();
                entry.command.map(|command| (description, command))
            })
            .collect();

        Ok(Box::new(ProcessInvoker {
            shell: self.shell.clone(),
            commands,
            home: runtime.home.clone(),
            work_dir: work_dir.to_path_buf(),
            env: runtime.system_properties.clone().into_iter().collect(),
        }))
    }
}

struct ProcessInvoker {
    shell: String,
    commands: HashMap<TestDescription, String>,
    home: PathBuf,
    work_dir: PathBuf,
    env: HashMap<String, String>,
}

#[async_trait]
impl ProbeInvoker for ProcessInvoker {
    async fn invoke(&self, address: &TestAddress) -> Result<TestOutcome> {
        let description = &address.description;
        let command = self.commands.get(description).ok_or_else(|| {
            RexamError::Invocation(format!("no command declared for {}", description))
        })?;

        tracing::debug!(test = %description, command = %command, "Spawning test command");

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            // `sh -c` 把下一个参数当作 $0，参数从 $1 开始
            .arg(description.to_string())
            .args(&address.arguments)
            .current_dir(&self.home)
            .envs(&self.env)
            .env("REXAM_TEST_CLASS", &description.class_name)
            .env("REXAM_TEST_METHOD", description.method_name.as_deref().unwrap_or(""))
            .env("REXAM_WORK_DIR", &self.work_dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                RexamError::Invocation(format!("failed to spawn '{}' for {}: {}", command, description, e))
            })?;

        if output.status.success() {
            return Ok(TestOutcome::Passed);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let outcome = match output.status.code() {
            Some(code) if stderr.is_empty() => TestOutcome::Failed(format!("exit code {}", code)),
            Some(code) => TestOutcome::Failed(format!("exit code {}: {}", code, stderr)),
            None => TestOutcome::Error("terminated by signal".to_string()),
        };
        Ok(outcome)
    }
}
