use crate::Result;
use crate::container::TestContainer;
use crate::listener::TestListener;
use crate::probe::{ProbeBuilder, TestDescription};
use crate::reactor::stage::{ReactorOptions, Stage};
use crate::reactor::{ReactorStrategy, StagedReactor};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// 整个套件只激活第一个容器一次，`after_suite` 时停止
pub struct PerSuiteReactor {
    stage: Mutex<Stage>,
}

impl PerSuiteReactor {
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
impl StagedReactor for PerSuiteReactor {
    fn strategy(&self) -> ReactorStrategy {
        ReactorStrategy::PerSuite
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
        if result.is_err() {
            stage.deactivate(0).await;
        }
        result
    }
}
