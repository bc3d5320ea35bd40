pub mod dry_run;
pub mod factory;
pub mod runtime;
pub mod types;

pub use dry_run::{ContainerEvent, DryRunContainer, Journal, JournalEntry};
pub use factory::ContainerFactory;
pub use runtime::RuntimeContainer;
pub use types::{ContainerState, DeploymentId, DeploymentStack};

use crate::Result;
use crate::listener::{TestListener, TestOutcome, TestResult};
use crate::probe::{Probe, TestAddress, TestDescription};
use async_trait::async_trait;
use std::time::Instant;

/// 可控的运行时实例
///
/// reactor 只通过这个契约与运行时交互。
#[async_trait]
pub trait TestContainer: Send {
    fn name(&self) -> &str;

    fn state(&self) -> ContainerState;

    /// 当前已安装探针的名称
    fn installed_probe(&self) -> Option<&str>;

    /// 启动运行时。失败时返回 `ContainerStart`，且容器回到 `Stopped`。
    async fn start(&mut self) -> Result<()>;

    /// 部署一个具名模块，随 `stop` 按后进先出顺序卸载
    async fn install(&mut self, name: &str, bytes: &[u8]) -> Result<DeploymentId>;

    /// 安装探针。reactor 在切换探针前会先调用 `uninstall_probe`。
    async fn install_probe(&mut self, probe: &Probe) -> Result<DeploymentId>;

    /// 未安装探针时为空操作
    async fn uninstall_probe(&mut self) -> Result<()>;

    /// 远程执行一个测试。断言失败体现在返回的 outcome 中。
    async fn call(&mut self, address: &TestAddress) -> Result<TestOutcome>;

    /// 执行一个测试并把结果交给 listener
    ///
    /// 只有基础设施故障才返回错误，此时 listener 不会收到结果。
    async fn run_test(
        &mut self,
        description: &TestDescription,
        listener: &dyn TestListener,
    ) -> Result<()> {
        listener.test_started(description);
        let started = Instant::now();
        let outcome = self.call(&TestAddress::new(description.clone())).await?;
        let result = TestResult::new(description.clone(), outcome, started.elapsed())
            .on_container(self.name());
        listener.test_finished(&result);
        Ok(())
    }

    /// 释放 `start`/`install` 获得的所有资源
    ///
    /// 不返回错误；在启动失败或从未启动的容器上调用也必须安全。
    async fn stop(&mut self);
}
