use chrono::NaiveDateTime;
use serde::Serialize;

/// 单个任务的分配结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub task_id: i64,
    pub task_no: String,
    pub order_no: String,
    pub resource_code: String,
    pub estimated_minutes: f64,
    pub score: f64,
}

// ==========================================
// AllocationReport - 分配轮次报告
// ==========================================
// 资源争用与无可用资源不是错误, 只在这里计数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationReport {
    pub evaluated_at: NaiveDateTime,
    /// 本轮参与排序的 OPEN 任务数
    pub considered: usize,
    pub allocated: Vec<Assignment>,
    /// 无同类型 Available 资源而跳过
    pub skipped_no_resource: usize,
    /// 提交时资源或任务已被并发轮次抢占
    pub contention: usize,
}

impl AllocationReport {
    pub fn new(evaluated_at: NaiveDateTime) -> Self {
        Self {
            evaluated_at,
            considered: 0,
            allocated: Vec::new(),
            skipped_no_resource: 0,
            contention: 0,
        }
    }

    pub fn allocated_count(&self) -> usize {
        self.allocated.len()
    }

    /// 本轮后仍为 OPEN 的任务数
    pub fn remaining_open(&self) -> usize {
        self.considered.saturating_sub(self.allocated.len())
    }

    pub fn is_noop(&self) -> bool {
        self.allocated.is_empty()
    }
}
