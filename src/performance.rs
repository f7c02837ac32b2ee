use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 性能数据记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// 开始时间 (Unix 时间戳，毫秒)
    pub start_time: u64,
    /// 结束时间 (Unix 时间戳，毫秒)
    pub end_time: u64,
    /// 阶段分组，例如 "load"、"render"、"save"
    pub channel_group: String,
    /// 组内标识，例如 "panel_1"
    pub channel_index: String,
    /// 附加信息（文件名、标注等）
    pub msg: String,
    /// 实际耗时（毫秒，单调时钟）
    pub elapsed_ms: f64,
}

/// 性能数据存储
/// 按时间顺序保存一次绘图运行中各阶段的耗时
pub struct PerformanceStore {
    records: RwLock<Vec<PerformanceRecord>>,
}

impl PerformanceStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// 添加性能记录
    pub fn add_record(&self, record: PerformanceRecord) {
        self.records.write().push(record);
    }

    /// 执行 `f` 并记录其耗时，无论结果成功与否都会留下记录
    pub fn measure<T>(
        &self,
        channel_group: &str,
        channel_index: &str,
        msg: &str,
        f: impl FnOnce() -> T,
    ) -> T {
        let start_time = get_unix_timestamp_ms();
        let started = Instant::now();
        let result = f();
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.add_record(PerformanceRecord {
            start_time,
            end_time: get_unix_timestamp_ms(),
            channel_group: channel_group.to_string(),
            channel_index: channel_index.to_string(),
            msg: msg.to_string(),
            elapsed_ms,
        });
        result
    }

    /// 获取全部性能记录
    pub fn get_records(&self) -> Vec<PerformanceRecord> {
        self.records.read().clone()
    }

    /// 某个分组的总耗时（毫秒）
    pub fn total_ms(&self, channel_group: &str) -> f64 {
        self.records
            .read()
            .iter()
            .filter(|r| r.channel_group == channel_group)
            .map(|r| r.elapsed_ms)
            .sum()
    }

    /// 以 JSON 格式写出全部记录
    pub fn write_report(&self, path: &Path) -> Result<()> {
        let report = serde_json::json!({
            "records": self.get_records(),
        });
        std::fs::write(path, serde_json::to_vec_pretty(&report)?)?;
        Ok(())
    }
}

impl Default for PerformanceStore {
    fn default() -> Self {
        Self::new()
    }
}

/// 获取 Unix 时间戳（毫秒）
pub fn get_unix_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
