// ==========================================
// 仓库作业调度系统 - 引擎层错误类型
// ==========================================
// 约束: 所有错误都是单次调用的终态结果, 不可致命
// 说明: 资源争用 / 无可用资源不是错误, 体现在分配报告计数中
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 引用的任务 / 订单 / 储位 / 资源不存在（无任何修改）
    #[error("对象不存在: {entity} {id}")]
    NotFound { entity: String, id: String },

    /// 状态不满足前置条件（如确认未分配的任务），无任何修改
    #[error("状态不允许该操作: {entity} {id} 期望 {expected}, 实际 {actual}")]
    InvalidState {
        entity: String,
        id: String,
        expected: String,
        actual: String,
    },

    /// 确认时储位库存不足；任务、资源、订单状态保持不变
    #[error("库存不足: 储位 {bin_code} 需要 {requested}, 现有 {available}")]
    InsufficientInventory {
        bin_code: String,
        requested: i64,
        available: i64,
    },

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EngineError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// 是否可在补货后重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::InsufficientInventory { .. })
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
