use crate::Result;
use crate::container::TestContainer;
use crate::listener::TestListener;
use crate::probe::{ProbeBuilder, TestDescription};
use crate::reactor::stage::{ReactorOptions, Stage};
use crate::reactor::{ReactorStrategy, StagedReactor};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// 每个测试都使用一个全新启动的容器
///
/// 总是使用第一个容器；其余容器不会被触碰。
pub struct AllConfinedReactor {
    stage: Mutex<Stage>,
}

impl AllConfinedReactor {
    pub fn new(
        containers: Vec<Box<dyn TestContainer>>,
        probes: Vec<ProbeBuilder>,
        options: ReactorOptions,
    ) -> Result<Self> {
        Ok(Self {
            stage: Mutex::new(Stage::new(containers, probes, options)?),
        })
    }
}

#[async_trait]
impl StagedReactor for AllConfinedReactor {
    fn strategy(&self) -> ReactorStrategy {
        ReactorStrategy::Confined
    }

    async fn after_suite(&self) {
        self.stage.lock().await.deactivate_all().await;
    }

    async fn tear_down(&self) {
        self.stage.lock().await.deactivate_all().await;
    }

    async fn run_test(
        &self,
        description: &TestDescription,
        listener: &dyn TestListener,
    ) -> Result<()> {
        if !description.is_executable() {
            return Ok(());
        }

        let mut stage = self.stage.lock().await;
        stage.activate(0, description).await?;
        let result = stage.run(0, description, listener).await;
        stage.deactivate(0).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerEvent, DryRunContainer, Journal};
    use crate::error::RexamError;
    use crate::listener::{CollectingListener, TestOutcome};

    fn containers(journal: &Journal) -> Vec<Box<dyn TestContainer>> {
        vec![
            Box::new(DryRunContainer::new("c0", journal.clone())),
            Box::new(DryRunContainer::new("c1", journal.clone())),
        ]
    }

    fn probe() -> ProbeBuilder {
        ProbeBuilder::from_bytes("probe", Vec::new()).with_tests([
            TestDescription::new("C", "a"),
            TestDescription::new("C", "b"),
        ])
    }

    #[tokio::test]
    async fn test_fresh_cycle_per_test() {
        let journal = Journal::new();
        let reactor =
            AllConfinedReactor::new(containers(&journal), vec![probe()], ReactorOptions::default())
                .unwrap();
        let listener = CollectingListener::new();

        let a = TestDescription::new("C", "a");
        let b = TestDescription::new("C", "b");
        reactor.run_test(&a, &listener).await.unwrap();
        reactor.run_test(&b, &listener).await.unwrap();

        let probe = "probe".to_string();
        assert_eq!(
            journal.events_for("c0"),
            vec![
                ContainerEvent::Started,
                ContainerEvent::ProbeInstalled(probe.clone()),
                ContainerEvent::Called(a),
                ContainerEvent::Stopped,
                ContainerEvent::Started,
                ContainerEvent::ProbeInstalled(probe),
                ContainerEvent::Called(b),
                ContainerEvent::Stopped,
            ]
        );
        assert!(journal.events_for("c1").is_empty());
        assert_eq!(listener.results().len(), 2);
    }

    #[tokio::test]
    async fn test_class_marker_is_skipped() {
        let journal = Journal::new();
        let reactor =
            AllConfinedReactor::new(containers(&journal), vec![probe()], ReactorOptions::default())
                .unwrap();
        let listener = CollectingListener::new();

        reactor
            .run_test(&TestDescription::class_marker("C"), &listener)
            .await
            .unwrap();

        assert!(journal.entries().is_empty());
        assert!(listener.results().is_empty());
    }

    #[tokio::test]
    async fn test_failed_assertion_is_reported_not_raised() {
        let journal = Journal::new();
        let a = TestDescription::new("C", "a");
        let container = DryRunContainer::new("c0", journal.clone())
            .with_outcome(a.clone(), TestOutcome::Failed("expected true".to_string()));
        let reactor = AllConfinedReactor::new(
            vec![Box::new(container)],
            vec![probe()],
            ReactorOptions::default(),
        )
        .unwrap();
        let listener = CollectingListener::new();

        reactor.run_test(&a, &listener).await.unwrap();

        let results = listener.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].outcome, TestOutcome::Failed("expected true".to_string()));
        assert_eq!(journal.count("c0", &ContainerEvent::Stopped), 1);
    }

    #[tokio::test]
    async fn test_start_failure_skips_install() {
        let journal = Journal::new();
        let container = DryRunContainer::new("c0", journal.clone()).failing_start("no runtime");
        let reactor = AllConfinedReactor::new(
            vec![Box::new(container)],
            vec![probe()],
            ReactorOptions::default(),
        )
        .unwrap();
        let listener = CollectingListener::new();

        let err = reactor
            .run_test(&TestDescription::new("C", "a"), &listener)
            .await
            .unwrap_err();

        assert!(matches!(err, RexamError::ContainerStart(_)));
        assert_eq!(
            journal.events_for("c0"),
            vec![ContainerEvent::StartFailed, ContainerEvent::Stopped]
        );
        assert!(listener.results().is_empty());
    }

    #[tokio::test]
    async fn test_install_failure_stops_container() {
        let journal = Journal::new();
        let container = DryRunContainer::new("c0", journal.clone()).failing_install("bad archive");
        let reactor = AllConfinedReactor::new(
            vec![Box::new(container)],
            vec![probe()],
            ReactorOptions::default(),
        )
        .unwrap();
        let listener = CollectingListener::new();

        let err = reactor
            .run_test(&TestDescription::new("C", "a"), &listener)
            .await
            .unwrap_err();

        assert!(matches!(err, RexamError::Deployment(_)));
        assert_eq!(
            journal.events_for("c0"),
            vec![
                ContainerEvent::Started,
                ContainerEvent::InstallFailed("probe".to_string()),
                ContainerEvent::Stopped,
            ]
        );
    }

    #[tokio::test]
    async fn test_invocation_failure_stops_container() {
        let journal = Journal::new();
        let container = DryRunContainer::new("c0", journal.clone()).failing_call("connection reset");
        let reactor = AllConfinedReactor::new(
            vec![Box::new(container)],
            vec![probe()],
            ReactorOptions::default(),
        )
        .unwrap();
        let listener = CollectingListener::new();

        let err = reactor
            .run_test(&TestDescription::new("C", "a"), &listener)
            .await
            .unwrap_err();

        assert!(matches!(err, RexamError::Invocation(_)));
        assert_eq!(journal.count("c0", &ContainerEvent::Stopped), 1);
        assert!(listener.results().is_empty());
    }

    #[test]
    fn test_requires_containers_and_probes() {
        let journal = Journal::new();
        assert!(matches!(
            AllConfinedReactor::new(Vec::new(), vec![probe()], ReactorOptions::default()),
            Err(RexamError::Configuration(_))
        ));
        assert!(matches!(
            AllConfinedReactor::new(containers(&journal), Vec::new(), ReactorOptions::default()),
            Err(RexamError::Configuration(_))
        ));
    }
}
