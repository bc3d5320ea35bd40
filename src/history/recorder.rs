use crate::history::model::{FailureRecord, RunRecord};
use crate::history::storage::HistoryStorage;
use crate::listener::{TestResult, TestSummary};
use crate::reactor::ReactorStrategy;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

/// 根据测试结果构建历史记录
pub fn build_record(
    probe: &str,
    strategy: ReactorStrategy,
    containers: usize,
    started_at: DateTime<Utc>,
    duration: Duration,
    results: &[TestResult],
) -> RunRecord {
    let mut record = RunRecord {
        id: Uuid::new_v4().to_string(),
        timestamp: started_at,
        probe: probe.to_string(),
        strategy,
        containers,
        total: 0,
        passed: 0,
        failed: 0,
        errors: 0,
        duration,
        failures: results
            .iter()
            .filter_map(|r| {
                r.outcome.cause().map(|cause| FailureRecord {
                    test: r.description.to_string(),
                    cause: cause.to_string(),
                })
            })
            .collect(),
    };
    record.apply_summary(&TestSummary::from_results(results));
    record
}

/// 记录运行历史
///
/// 这是一个 Best-effort 操作，如果写入失败会打印警告，但不会返回错误。
pub fn record_run(storage: &HistoryStorage, record: &RunRecord) {
    if let Err(e) = storage.append(record) {
        warn!("Failed to save run history: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::TestOutcome;
    use crate::probe::TestDescription;

    #[test]
    fn test_build_record_collects_failures() {
        let results = vec![
            TestResult::new(
                TestDescription::new("C", "a"),
                TestOutcome::Passed,
                Duration::from_millis(5),
            ),
            TestResult::new(
                TestDescription::new("C", "b"),
                TestOutcome::Failed("boom".to_string()),
                Duration::from_millis(5),
            ),
        ];

        let record = build_record(
            "smoke",
            ReactorStrategy::PerClass,
            2,
            Utc::now(),
            Duration::from_millis(42),
            &results,
        );

        assert_eq!(record.total, 2);
        assert_eq!(record.passed, 1);
        assert_eq!(record.failed, 1);
        assert!(!record.is_success());
        assert_eq!(
            record.failures,
            vec![FailureRecord {
                test: "C#b".to_string(),
                cause: "boom".to_string(),
            }]
        );
    }
}
