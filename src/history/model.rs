use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::history::serialization;
use crate::listener::TestSummary;
use crate::reactor::ReactorStrategy;

/// 一次套件运行的历史记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// 唯一 ID (UUID)
    pub id: String,

    /// 运行开始时间
    pub timestamp: DateTime<Utc>,

    /// 探针名称
    pub probe: String,

    pub strategy: ReactorStrategy,

    /// 使用的容器数量
    pub containers: usize,

    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,

    #[serde(with = "serialization::duration_ms")]
    pub duration: Duration,

    /// 未通过的测试及原因
    #[serde(default)]
    pub failures: Vec<FailureRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureRecord {
    pub test: String,
    pub cause: String,
}

impl RunRecord {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }

    pub fn apply_summary(&mut self, summary: &TestSummary) {
        self.total = summary.total;
        self.passed = summary.passed;
        self.failed = summary.failed;
        self.errors = summary.errors;
    }
}
