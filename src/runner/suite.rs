use crate::listener::{TestListener, TestOutcome, TestResult};
use crate::probe::TestDescription;
use crate::reactor::StagedReactor;
use crate::runner::plan::TestPlan;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// 没能得到结果而中止的测试
#[derive(Debug, Clone, PartialEq)]
pub struct Abort {
    pub description: TestDescription,
    pub message: String,
    /// 启动/部署/调用/超时故障；否则是配置问题（例如探针无法构建）
    pub infrastructure: bool,
}

/// 一次套件运行的统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuiteReport {
    /// 交给 reactor 的可执行测试数
    pub executed: usize,
    pub aborted: Vec<Abort>,
    pub duration: Duration,
}

impl SuiteReport {
    pub fn has_aborts(&self) -> bool {
        !self.aborted.is_empty()
    }
}

/// 按生命周期顺序驱动 reactor
pub struct SuiteRunner {
    reactor: Box<dyn StagedReactor>,
}

impl SuiteRunner {
    pub fn new(reactor: Box<dyn StagedReactor>) -> Self {
        Self { reactor }
    }

    pub fn reactor(&self) -> &dyn StagedReactor {
        self.reactor.as_ref()
    }

    /// 运行整个计划
    ///
    /// reactor 返回的基础设施错误会中止当前测试：记录为 `Error` 结果交给
    /// listener，然后继续下一个测试。后续的 after_* 钩子总会被调用。
    pub async fn run(&self, plan: &TestPlan, listener: &dyn TestListener) -> SuiteReport {
        let started = Instant::now();
        let mut report = SuiteReport::default();
        let reactor = self.reactor.as_ref();

        info!(
            strategy = %reactor.strategy(),
            classes = plan.classes.len(),
            tests = plan.executable_count(),
            "Suite started"
        );

        reactor.set_up().await;
        reactor.before_suite().await;

        for class in &plan.classes {
            reactor.before_class().await;
            for description in &class.tests {
                reactor.before_test().await;

                let test_started = Instant::now();
                if let Err(e) = reactor.run_test(description, listener).await {
                    let infrastructure = e.is_infrastructure();
                    if infrastructure {
                        error!(test = %description, "Test aborted: {}", e);
                    } else {
                        error!(test = %description, "Test could not be scheduled: {}", e);
                    }
                    listener.test_finished(&TestResult::new(
                        description.clone(),
                        TestOutcome::Error(e.to_string()),
                        test_started.elapsed(),
                    ));
                    report.aborted.push(Abort {
                        description: description.clone(),
                        message: e.to_string(),
                        infrastructure,
                    });
                }
                if description.is_executable() {
                    report.executed += 1;
                }

                reactor.after_test().await;
            }
            reactor.after_class().await;
        }

        reactor.after_suite().await;
        reactor.tear_down().await;

        report.duration = started.elapsed();
        info!(
            executed = report.executed,
            aborted = report.aborted.len(),
            "Suite finished in {:.3}s",
            report.duration.as_secs_f64()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerEvent, DryRunContainer, Journal, TestContainer};
    use crate::listener::CollectingListener;
    use crate::probe::ProbeBuilder;
    use crate::reactor::{ReactorOptions, ReactorStrategy, create_reactor};

    fn plan() -> TestPlan {
        TestPlan::from_descriptions(vec![
            TestDescription::class_marker("A"),
            TestDescription::new("A", "one"),
            TestDescription::new("A", "two"),
            TestDescription::new("B", "one"),
        ])
    }

    fn runner(strategy: ReactorStrategy, container: DryRunContainer) -> SuiteRunner {
        let containers: Vec<Box<dyn TestContainer>> = vec![Box::new(container)];
        let reactor = create_reactor(
            strategy,
            containers,
            vec![ProbeBuilder::from_bytes("probe", Vec::new())],
            ReactorOptions::default(),
        )
        .unwrap();
        SuiteRunner::new(reactor)
    }

    #[tokio::test]
    async fn test_runs_every_executable_test() {
        let journal = Journal::new();
        let runner = runner(
            ReactorStrategy::PerClass,
            DryRunContainer::new("c0", journal.clone()),
        );
        let listener = CollectingListener::new();

        let report = runner.run(&plan(), &listener).await;

        assert_eq!(report.executed, 3);
        assert!(!report.has_aborts());
        assert_eq!(listener.summary().passed, 3);
        assert_eq!(journal.count("c0", &ContainerEvent::Started), 2);
        assert_eq!(journal.count("c0", &ContainerEvent::Stopped), 2);
    }

    #[tokio::test]
    async fn test_infrastructure_failure_aborts_only_current_test() {
        let journal = Journal::new();
        let runner = runner(
            ReactorStrategy::Confined,
            DryRunContainer::new("c0", journal.clone()).failing_start("port in use"),
        );
        let listener = CollectingListener::new();

        let report = runner.run(&plan(), &listener).await;

        assert_eq!(report.executed, 3);
        assert_eq!(report.aborted.len(), 3);
        assert!(report.aborted[0].message.contains("port in use"));
        assert!(report.aborted.iter().all(|a| a.infrastructure));

        let summary = listener.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.errors, 3);
        assert_eq!(journal.count("c0", &ContainerEvent::ProbeInstalled("probe".into())), 0);
    }

    /// 每个测试都返回配置错误的 reactor
    struct MisconfiguredReactor;

    #[async_trait::async_trait]
    impl StagedReactor for MisconfiguredReactor {
        fn strategy(&self) -> ReactorStrategy {
            ReactorStrategy::Confined
        }

        async fn run_test(
            &self,
            _description: &TestDescription,
            _listener: &dyn TestListener,
        ) -> crate::Result<()> {
            Err(crate::RexamError::Configuration("probe cannot be built".to_string()))
        }
    }

    #[tokio::test]
    async fn test_configuration_error_is_not_infrastructure() {
        let runner = SuiteRunner::new(Box::new(MisconfiguredReactor));
        let listener = CollectingListener::new();

        let report = runner.run(&plan(), &listener).await;

        assert_eq!(report.aborted.len(), 4);
        assert!(report.aborted.iter().all(|a| !a.infrastructure));
        assert_eq!(listener.summary().errors, 4);
    }
}
