//! 分阶段的测试 reactor
//!
//! reactor 决定用哪个容器执行哪个测试、何时启动/停止容器、何时安装探针。
//! 测试运行器按以下顺序驱动它：
//!
//! ```text
//! set_up → before_suite → (before_class → (before_test → run_test → after_test)* → after_class)*
//!        → after_suite → tear_down
//! ```
//!
//! 每个钩子默认是空操作，由具体策略覆盖需要的部分。所有方法都在
//! reactor 内部的互斥锁下执行，同一时刻最多只有一个 `run_test`。

mod confined;
mod per_class;
mod per_suite;
mod stage;
mod strategy;

pub use confined::AllConfinedReactor;
pub use per_class::PerClassReactor;
pub use per_suite::PerSuiteReactor;
pub use stage::ReactorOptions;
pub use strategy::ReactorStrategy;

use crate::Result;
use crate::container::TestContainer;
use crate::listener::TestListener;
use crate::probe::{ProbeBuilder, TestDescription};
use async_trait::async_trait;

#[async_trait]
pub trait StagedReactor: Send + Sync {
    fn strategy(&self) -> ReactorStrategy;

    async fn set_up(&self) {}

    async fn before_suite(&self) {}

    async fn before_class(&self) {}

    async fn before_test(&self) {}

    async fn after_test(&self) {}

    async fn after_class(&self) {}

    async fn after_suite(&self) {}

    async fn tear_down(&self) {}

    /// 执行一个测试
    ///
    /// 类级节点（没有方法名）直接返回，不接触任何容器。
    /// 基础设施故障在容器停止之后才向上返回；断言失败只通过 listener 上报。
    async fn run_test(
        &self,
        description: &TestDescription,
        listener: &dyn TestListener,
    ) -> Result<()>;
}

/// 按策略创建 reactor
pub fn create_reactor(
    strategy: ReactorStrategy,
    containers: Vec<Box<dyn TestContainer>>,
    probes: Vec<ProbeBuilder>,
    options: ReactorOptions,
) -> Result<Box<dyn StagedReactor>> {
    tracing::debug!(
        %strategy,
        containers = containers.len(),
        probes = probes.len(),
        "Creating reactor"
    );

    Ok(match strategy {
        ReactorStrategy::Confined => {
            Box::new(AllConfinedReactor::new(containers, probes, options)?)
        }
        ReactorStrategy::PerClass => Box::new(PerClassReactor::new(containers, probes, options)?),
        ReactorStrategy::PerSuite => Box::new(PerSuiteReactor::new(containers, probes, options)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerEvent, ContainerState, DeploymentId, DryRunContainer, Journal};
    use crate::error::RexamError;
    use crate::listener::{CollectingListener, TestOutcome};
    use crate::probe::{Probe, TestAddress};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// 启动永远不会完成的容器
    struct HangingContainer {
        inner: DryRunContainer,
    }

    #[async_trait]
    impl TestContainer for HangingContainer {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn state(&self) -> ContainerState {
            self.inner.state()
        }

        fn installed_probe(&self) -> Option<&str> {
            self.inner.installed_probe()
        }

        async fn start(&mut self) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn install(&mut self, name: &str, bytes: &[u8]) -> Result<DeploymentId> {
            self.inner.install(name, bytes).await
        }

        async fn install_probe(&mut self, probe: &Probe) -> Result<DeploymentId> {
            self.inner.install_probe(probe).await
        }

        async fn uninstall_probe(&mut self) -> Result<()> {
            self.inner.uninstall_probe().await
        }

        async fn call(&mut self, address: &TestAddress) -> Result<TestOutcome> {
            self.inner.call(address).await
        }

        async fn stop(&mut self) {
            self.inner.stop().await
        }
    }

    /// stop 永远不会完成的容器
    struct StuckStopContainer {
        inner: DryRunContainer,
        stop_attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TestContainer for StuckStopContainer {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn state(&self) -> ContainerState {
            self.inner.state()
        }

        fn installed_probe(&self) -> Option<&str> {
            self.inner.installed_probe()
        }

        async fn start(&mut self) -> Result<()> {
            self.inner.start().await
        }

        async fn install(&mut self, name: &str, bytes: &[u8]) -> Result<DeploymentId> {
            self.inner.install(name, bytes).await
        }

        async fn install_probe(&mut self, probe: &Probe) -> Result<DeploymentId> {
            self.inner.install_probe(probe).await
        }

        async fn uninstall_probe(&mut self) -> Result<()> {
            self.inner.uninstall_probe().await
        }

        async fn call(&mut self, address: &TestAddress) -> Result<TestOutcome> {
            self.inner.call(address).await
        }

        async fn stop(&mut self) {
            self.stop_attempts.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<()>().await
        }
    }

    #[tokio::test]
    async fn test_create_reactor_per_strategy() {
        for strategy in [
            ReactorStrategy::Confined,
            ReactorStrategy::PerClass,
            ReactorStrategy::PerSuite,
        ] {
            let journal = Journal::new();
            let reactor = create_reactor(
                strategy,
                vec![Box::new(DryRunContainer::new("c0", journal.clone()))],
                vec![ProbeBuilder::from_bytes("probe", Vec::new())],
                ReactorOptions::default(),
            )
            .unwrap();
            assert_eq!(reactor.strategy(), strategy);

            // 任何策略下成功的测试最终都恰好停止一次
            let listener = CollectingListener::new();
            reactor.before_suite().await;
            reactor.before_class().await;
            reactor
                .run_test(&TestDescription::new("C", "a"), &listener)
                .await
                .unwrap();
            reactor.after_class().await;
            reactor.after_suite().await;
            reactor.tear_down().await;

            assert_eq!(journal.count("c0", &ContainerEvent::Stopped), 1, "{}", strategy);
            assert_eq!(listener.results().len(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_timeout() {
        let journal = Journal::new();
        let container = HangingContainer {
            inner: DryRunContainer::new("slow", journal.clone()),
        };
        let reactor = create_reactor(
            ReactorStrategy::Confined,
            vec![Box::new(container)],
            vec![ProbeBuilder::from_bytes("probe", Vec::new())],
            ReactorOptions {
                start_timeout: Some(Duration::from_secs(5)),
                stop_timeout: None,
            },
        )
        .unwrap();

        let err = reactor
            .run_test(&TestDescription::new("C", "a"), &CollectingListener::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RexamError::Timeout { seconds: 5, .. }));
        assert_eq!(journal.events_for("slow"), vec![ContainerEvent::Stopped]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_timeout_treats_container_as_stopped() {
        let journal = Journal::new();
        let stop_attempts = Arc::new(AtomicUsize::new(0));
        let container = StuckStopContainer {
            inner: DryRunContainer::new("stuck", journal.clone()),
            stop_attempts: Arc::clone(&stop_attempts),
        };
        let reactor = create_reactor(
            ReactorStrategy::Confined,
            vec![Box::new(container)],
            vec![ProbeBuilder::from_bytes("probe", Vec::new())],
            ReactorOptions {
                start_timeout: None,
                stop_timeout: Some(Duration::from_secs(1)),
            },
        )
        .unwrap();
        let listener = CollectingListener::new();

        let a = TestDescription::new("C", "a");
        let b = TestDescription::new("C", "b");
        reactor.run_test(&a, &listener).await.unwrap();
        reactor.run_test(&b, &listener).await.unwrap();
        reactor.after_suite().await;
        reactor.tear_down().await;

        // 每个测试仍然得到一次全新的启动，放弃的 stop 不会重试
        assert_eq!(
            journal.events_for("stuck"),
            vec![
                ContainerEvent::Started,
                ContainerEvent::ProbeInstalled("probe".to_string()),
                ContainerEvent::Called(a),
                ContainerEvent::Started,
                ContainerEvent::ProbeInstalled("probe".to_string()),
                ContainerEvent::Called(b),
            ]
        );
        assert_eq!(stop_attempts.load(Ordering::SeqCst), 2);
        assert_eq!(listener.summary().passed, 2);
    }
}
