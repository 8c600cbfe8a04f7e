// ==========================================
// 仓库作业调度系统 - 作业时长估算
// ==========================================
// 职责: 分配引擎比较候选资源时使用的时长估算接口
// 约束: 纯函数, 无副作用, 同一输入结果稳定
// 说明: 学习型模型不在本 crate 内, 可通过实现 DurationEstimator 接入
// ==========================================

use crate::domain::resource::Resource;
use crate::domain::types::ResourceType;
use crate::engine::error::{EngineError, EngineResult};
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

// ==========================================
// TimeContext - 估算时间上下文
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeContext {
    pub hour: u32,        // 0-23
    pub day_of_week: u32, // 周一 = 0
    pub is_afternoon: bool, // hour >= 13
}

impl TimeContext {
    pub fn from_datetime(ts: NaiveDateTime) -> Self {
        let hour = ts.hour();
        Self {
            hour,
            day_of_week: ts.weekday().num_days_from_monday(),
            is_afternoon: hour >= 13,
        }
    }
}

// ==========================================
// DurationEstimator - 时长估算接口
// ==========================================
pub trait DurationEstimator: Send + Sync {
    /// 预计作业时长（分钟）
    fn estimate(&self, resource_code: &str, ctx: &TimeContext) -> f64;
}

// ==========================================
// HeuristicEstimator - 启发式估算
// ==========================================
// 时长 = 类型基线 + 资源偏移 + 午后加时
pub struct HeuristicEstimator {
    resource_types: HashMap<String, ResourceType>,
    default_baseline: f64,
    afternoon_penalty: f64,
}

impl HeuristicEstimator {
    /// 基于资源目录构建（未登记的资源使用默认基线）
    pub fn from_resources(resources: &[Resource]) -> Self {
        Self {
            resource_types: resources
                .iter()
                .map(|r| (r.resource_code.clone(), r.resource_type))
                .collect(),
            default_baseline: 15.0,
            afternoon_penalty: 2.5,
        }
    }

    fn type_baseline(resource_type: ResourceType) -> f64 {
        match resource_type {
            ResourceType::RT01 => 12.0,
            ResourceType::RT02 => 8.0,
            ResourceType::RT03 => 10.0,
        }
    }

    /// 资源编码数字后缀决定的固定偏移（0.0 ~ 2.1 分钟）
    fn resource_offset(resource_code: &str) -> f64 {
        let digits: String = resource_code
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        let seq = digits.parse::<u64>().unwrap_or(0);
        (seq % 8) as f64 * 0.3
    }
}

impl DurationEstimator for HeuristicEstimator {
    fn estimate(&self, resource_code: &str, ctx: &TimeContext) -> f64 {
        let baseline = self
            .resource_types
            .get(resource_code)
            .map(|t| Self::type_baseline(*t))
            .unwrap_or(self.default_baseline);

        let afternoon = if ctx.is_afternoon {
            self.afternoon_penalty
        } else {
            0.0
        };

        baseline + Self::resource_offset(resource_code) + afternoon
    }
}

// ==========================================
// TableEstimator - 查表估算
// ==========================================
// 查找顺序: (资源, 小时) -> (资源, 任意小时) -> 默认值
#[derive(Debug, Clone, Default)]
pub struct TableEstimator {
    hourly: HashMap<(String, u32), f64>,
    flat: HashMap<String, f64>,
    default_minutes: f64,
}

impl TableEstimator {
    pub fn new(default_minutes: f64) -> Self {
        Self {
            hourly: HashMap::new(),
            flat: HashMap::new(),
            default_minutes,
        }
    }

    /// 设置资源全时段时长
    pub fn with_entry(mut self, resource_code: &str, minutes: f64) -> Self {
        self.flat.insert(resource_code.to_string(), minutes);
        self
    }

    /// 设置资源指定小时的时长
    pub fn with_hourly_entry(mut self, resource_code: &str, hour: u32, minutes: f64) -> Self {
        self.hourly.insert((resource_code.to_string(), hour), minutes);
        self
    }

    /// 从 CSV 读取估算表
    ///
    /// 表头: resource_code,hour,minutes（hour 为空表示全时段）
    ///
    /// # 错误
    /// - InvalidInput: CSV 格式错误 / 字段非法
    pub fn from_csv_reader<R: Read>(reader: R, default_minutes: f64) -> EngineResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut table = Self::new(default_minutes);
        for (row_idx, result) in reader.records().enumerate() {
            let record = result.map_err(|e| EngineError::InvalidInput(e.to_string()))?;
            let row_number = row_idx + 2; // 跳过表头

            let resource_code = record
                .get(0)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    EngineError::InvalidInput(format!("第{}行: 缺少 resource_code", row_number))
                })?;

            let minutes = record
                .get(2)
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|m| m.is_finite() && *m >= 0.0)
                .ok_or_else(|| {
                    EngineError::InvalidInput(format!("第{}行: minutes 非法", row_number))
                })?;

            match record.get(1).filter(|s| !s.is_empty()) {
                Some(raw_hour) => {
                    let hour = raw_hour
                        .parse::<u32>()
                        .ok()
                        .filter(|h| *h < 24)
                        .ok_or_else(|| {
                            EngineError::InvalidInput(format!(
                                "第{}行: hour 非法: {}",
                                row_number, raw_hour
                            ))
                        })?;
                    table.hourly.insert((resource_code.to_string(), hour), minutes);
                }
                None => {
                    table.flat.insert(resource_code.to_string(), minutes);
                }
            }
        }

        Ok(table)
    }

    /// 从 CSV 文件读取估算表
    pub fn from_csv_path<P: AsRef<Path>>(path: P, default_minutes: f64) -> EngineResult<Self> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| {
            EngineError::InvalidInput(format!("无法打开 {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_csv_reader(file, default_minutes)
    }
}

impl DurationEstimator for TableEstimator {
    fn estimate(&self, resource_code: &str, ctx: &TimeContext) -> f64 {
        self.hourly
            .get(&(resource_code.to_string(), ctx.hour))
            .or_else(|| self.flat.get(resource_code))
            .copied()
            .unwrap_or(self.default_minutes)
    }
}
