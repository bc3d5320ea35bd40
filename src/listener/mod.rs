pub mod reporter;
pub mod types;

pub use reporter::{ConsoleReporter, ReportingListener};
pub use types::{TestOutcome, TestResult, TestSummary};

use crate::probe::TestDescription;
use std::sync::Mutex;

/// 测试结果监听器
///
/// 每个被调用的可执行测试恰好收到一次 `test_finished`。
pub trait TestListener: Send + Sync {
    fn test_started(&self, _description: &TestDescription) {}

    fn test_finished(&self, result: &TestResult);
}

/// 在内存中收集所有结果
#[derive(Debug, Default)]
pub struct CollectingListener {
    results: Mutex<Vec<TestResult>>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<TestResult> {
        self.results
            .lock()
            .map(|results| results.clone())
            .unwrap_or_default()
    }

    pub fn summary(&self) -> TestSummary {
        TestSummary::from_results(&self.results())
    }
}

impl TestListener for CollectingListener {
    fn test_finished(&self, result: &TestResult) {
        if let Ok(mut results) = self.results.lock() {
            results.push(result.clone());
        }
    }
}
