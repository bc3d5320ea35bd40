use crate::probe::TestDescription;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 单个测试的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "cause", rename_all = "snake_case")]
pub enum TestOutcome {
    Passed,
    /// 断言失败
    Failed(String),
    /// 测试内部的意外错误，或运行器记录的基础设施故障
    Error(String),
}

impl TestOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }

    pub fn cause(&self) -> Option<&str> {
        match self {
            TestOutcome::Passed => None,
            TestOutcome::Failed(cause) | TestOutcome::Error(cause) => Some(cause),
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestOutcome::Passed => write!(f, "passed"),
            TestOutcome::Failed(_) => write!(f, "failed"),
            TestOutcome::Error(_) => write!(f, "error"),
        }
    }
}

/// 通过 Listener 上报的测试结果
#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    pub description: TestDescription,

    pub outcome: TestOutcome,

    /// 执行耗时
    pub duration: Duration,

    /// 执行该测试的容器名称
    pub container: Option<String>,
}

impl TestResult {
    pub fn new(description: TestDescription, outcome: TestOutcome, duration: Duration) -> Self {
        Self {
            description,
            outcome,
            duration,
            container: None,
        }
    }

    pub fn on_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }
}

/// 测试摘要
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub total_duration: Duration,
}

impl TestSummary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let passed = results.iter().filter(|r| r.outcome.is_passed()).count();
        let failed = results
            .iter()
            .filter(|r| matches!(r.outcome, TestOutcome::Failed(_)))
            .count();

        Self {
            total: results.len(),
            passed,
            failed,
            errors: results.len() - passed - failed,
            total_duration: results.iter().map(|r| r.duration).sum(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}
