use super::model::RunRecord;
use crate::Result;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const HISTORY_DIR: &str = ".rexam";
const HISTORY_FILE: &str = "history.jsonl";
// 超过该大小时在读取时压缩
const COMPACTION_THRESHOLD_BYTES: u64 = 5 * 1024 * 1024;
const MAX_RECORDS: usize = 2_000;

/// 运行历史，JSON Lines 格式
pub struct HistoryStorage {
    file_path: PathBuf,
    threshold_bytes: u64,
    max_records: usize,
}

impl Default for HistoryStorage {
    fn default() -> Self {
        let dir = std::env::var("REXAM_HISTORY_DIR").unwrap_or_else(|_| HISTORY_DIR.to_string());
        Self::new_with_path(Path::new(&dir).join(HISTORY_FILE))
    }
}

impl HistoryStorage {
    /// 项目本地的历史文件，可用 REXAM_HISTORY_DIR 覆盖目录
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_path(path: PathBuf) -> Self {
        Self {
            file_path: path,
            threshold_bytes: COMPACTION_THRESHOLD_BYTES,
            max_records: MAX_RECORDS,
        }
    }

    /// 文件超过 `threshold_bytes` 时只保留最近 `max_records` 条
    pub fn with_compaction(mut self, threshold_bytes: u64, max_records: usize) -> Self {
        self.threshold_bytes = threshold_bytes;
        self.max_records = max_records;
        self
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// 追加一条记录
    ///
    /// 写入期间持有 `fs2` 排他锁，多个进程并发追加不会交错。
    pub fn append(&self, record: &RunRecord) -> Result<()> {
        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(record)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        file.lock_exclusive()?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// 所有记录，从旧到新
    pub fn list(&self) -> Result<Vec<RunRecord>> {
        if !self.file_path.exists() {
            return Ok(Vec::new());
        }
        self.compact_if_needed()?;

        let file = File::open(&self.file_path)?;
        file.lock_shared()?;
        Ok(read_records(&file))
    }

    /// 最近 n 条记录，从旧到新
    pub fn tail(&self, n: usize) -> Result<Vec<RunRecord>> {
        let records = self.list()?;
        let skip = records.len().saturating_sub(n);
        Ok(records.into_iter().skip(skip).collect())
    }

    fn compact_if_needed(&self) -> Result<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.file_path)?;
        if file.metadata()?.len() < self.threshold_bytes {
            return Ok(());
        }

        file.lock_exclusive()?;
        // 加锁后再检查一次，其他进程可能刚压缩过
        if file.metadata()?.len() < self.threshold_bytes {
            return Ok(());
        }

        let records = read_records(&file);
        if records.len() <= self.max_records {
            return Ok(());
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        let mut writer = BufWriter::new(file);
        for record in &records[records.len() - self.max_records..] {
            writeln!(writer, "{}", serde_json::to_string(record)?)?;
        }
        writer.flush()?;
        tracing::debug!(kept = self.max_records, "History compacted");
        Ok(())
    }
}

/// 跳过空行和无法解析的行
fn read_records(file: &File) -> Vec<RunRecord> {
    BufReader::new(file)
        .lines()
        .map_while(|line| line.ok())
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(&line).ok())
        .collect()
}
