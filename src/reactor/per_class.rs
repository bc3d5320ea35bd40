use crate::Result;
use crate::container::TestContainer;
use crate::listener::TestListener;
use crate::probe::{ProbeBuilder, TestDescription};
use crate::reactor::stage::{ReactorOptions, Stage};
use crate::reactor::{ReactorStrategy, StagedReactor};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

struct PerClassState {
    stage: Stage,
    /// 类名 → 容器下标，按类首次出现的顺序轮转分配
    assignments: HashMap<String, usize>,
    next: usize,
    /// 当前处于激活状态的类及其容器
    active: Option<(String, usize)>,
}

impl PerClassState {
    fn assign(&mut self, class_name: &str) -> usize {
        if let Some(index) = self.assignments.get(class_name) {
            return *index;
        }
        let index = self.next % self.stage.len();
        self.next += 1;
        self.assignments.insert(class_name.to_string(), index);
        debug!(class = %class_name, container = index, "Class assigned");
        index
    }
}

/// 同一个测试类的测试共享一次容器激活，`after_class` 时停止
pub struct PerClassReactor {
    state: Mutex<PerClassState>,
}

impl PerClassReactor {
    pub fn new(
        containers: Vec<Box<dyn TestContainer>>,
        probes: Vec<ProbeBuilder>,
        options: ReactorOptions,
    ) -> Result<Self> {
        Ok(Self {
            state: Mutex::new(PerClassState {
                stage: Stage::new(containers, probes, options)?,
                assignments: HashMap::new(),
                next: 0,
                active: None,
            }),
        })
    }
}

#[async_trait]
impl StagedReactor for PerClassReactor {
    fn strategy(&self) -> ReactorStrategy {
        ReactorStrategy::PerClass
    }

    async fn after_class(&self) {
        let mut state = self.state.lock().await;
        if let Some((_, index)) = state.active.take() {
            state.stage.deactivate(index).await;
        }
    }

    async fn after_suite(&self) {
        let mut state = self.state.lock().await;
        state.active = None;
        state.stage.deactivate_all().await;
    }

    async fn tear_down(&self) {
        let mut state = self.state.lock().await;
        state.active = None;
        state.stage.deactivate_all().await;
    }

    async fn run_test(
        &self,
        description: &TestDescription,
        listener: &dyn TestListener,
    ) -> Result<()> {
        if !description.is_executable() {
            return Ok(());
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let class_name = &description.class_name;

        // 调用方没有在类之间调用 after_class 时，先收起上一个类的容器
        if let Some((active_class, index)) = state.active.take()
            && active_class != *class_name
        {
            state.stage.deactivate(index).await;
        }

        let index = state.assign(class_name);
        state.stage.activate(index, description).await?;
        state.active = Some((class_name.clone(), index));

        let result = state.stage.run(index, description, listener).await;
        if result.is_err() {
            state.active = None;
            state.stage.deactivate(index).await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerEvent, DryRunContainer, Journal};
    use crate::error::RexamError;
    use crate::listener::CollectingListener;

    fn reactor(journal: &Journal, count: usize) -> PerClassReactor {
        let containers = (0..count)
            .map(|i| {
                Box::new(DryRunContainer::new(format!("c{}", i), journal.clone()))
                    as Box<dyn TestContainer>
            })
            .collect();
        PerClassReactor::new(
            containers,
            vec![ProbeBuilder::from_bytes("probe", Vec::new())],
            ReactorOptions::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_one_activation_per_class() {
        let journal = Journal::new();
        let reactor = reactor(&journal, 2);
        let listener = CollectingListener::new();

        for class in ["A", "B", "C"] {
            reactor.before_class().await;
            for method in ["x", "y"] {
                reactor
                    .run_test(&TestDescription::new(class, method), &listener)
                    .await
                    .unwrap();
            }
            reactor.after_class().await;
        }
        reactor.after_suite().await;

        // A 和 C 在 c0，B 在 c1
        assert_eq!(journal.count("c0", &ContainerEvent::Started), 2);
        assert_eq!(journal.count("c0", &ContainerEvent::Stopped), 2);
        assert_eq!(journal.count("c1", &ContainerEvent::Started), 1);
        assert_eq!(journal.count("c1", &ContainerEvent::Stopped), 1);
        assert_eq!(
            journal.events_for("c1"),
            vec![
                ContainerEvent::Started,
                ContainerEvent::ProbeInstalled("probe".to_string()),
                ContainerEvent::Called(TestDescription::new("B", "x")),
                ContainerEvent::Called(TestDescription::new("B", "y")),
                ContainerEvent::Stopped,
            ]
        );
        assert_eq!(listener.results().len(), 6);
    }

    #[tokio::test]
    async fn test_class_switch_without_after_class() {
        let journal = Journal::new();
        let reactor = reactor(&journal, 1);
        let listener = CollectingListener::new();

        reactor
            .run_test(&TestDescription::new("A", "x"), &listener)
            .await
            .unwrap();
        reactor
            .run_test(&TestDescription::new("B", "x"), &listener)
            .await
            .unwrap();
        reactor.after_suite().await;

        assert_eq!(journal.count("c0", &ContainerEvent::Started), 2);
        assert_eq!(journal.count("c0", &ContainerEvent::Stopped), 2);
    }

    #[tokio::test]
    async fn test_invocation_failure_ends_activation() {
        let journal = Journal::new();
        let container = DryRunContainer::new("c0", journal.clone()).failing_call("lost connection");
        let reactor = PerClassReactor::new(
            vec![Box::new(container)],
            vec![ProbeBuilder::from_bytes("probe", Vec::new())],
            ReactorOptions::default(),
        )
        .unwrap();
        let listener = CollectingListener::new();

        let err = reactor
            .run_test(&TestDescription::new("A", "x"), &listener)
            .await
            .unwrap_err();
        assert!(matches!(err, RexamError::Invocation(_)));
        assert_eq!(journal.count("c0", &ContainerEvent::Stopped), 1);

        // 容器已停止，after_class 不会再次停止
        reactor.after_class().await;
        assert_eq!(journal.count("c0", &ContainerEvent::Stopped), 1);
    }
}
