use chrono::Utc;
use rexam::history::model::RunRecord;
use rexam::history::storage::HistoryStorage;
use rexam::reactor::ReactorStrategy;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn create_dummy_record(id: String) -> RunRecord {
    RunRecord {
        id,
        timestamp: Utc::now(),
        probe: "smoke".to_string(),
        strategy: ReactorStrategy::PerSuite,
        containers: 1,
        total: 3,
        passed: 3,
        failed: 0,
        errors: 0,
        duration: Duration::from_millis(100),
        failures: Vec::new(),
    }
}

#[test]
fn test_concurrent_writes() {
    let temp_dir = TempDir::new().unwrap();
    let history_file = temp_dir.path().join("history.jsonl");
    let history_path = Arc::new(history_file.clone());

    let mut handles = vec![];
    let thread_count = 10;
    let records_per_thread = 50;

    for i in 0..thread_count {
        let path = history_path.clone();
        handles.push(thread::spawn(move || {
            // 每个线程独立的 storage，模拟多个进程
            let storage = HistoryStorage::new_with_path((*path).clone());
            for j in 0..records_per_thread {
                storage
                    .append(&create_dummy_record(format!("{}-{}", i, j)))
                    .unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let storage = HistoryStorage::new_with_path(history_file);
    let records = storage.list().unwrap();
    assert_eq!(
        records.len(),
        thread_count * records_per_thread,
        "Total records count mismatch"
    );
}
