// ==========================================
// 仓库作业调度系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，把引擎/仓储错误转换为用户可读的错误消息
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须包含显式原因
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效的状态转换: {0}")]
    InvalidState(String),

    /// 缺货：任务保持 ALLOCATED，补货后可重试
    #[error("库存不足: 储位 {bin_code} 需要 {requested}, 现有 {available}, 请补货后重试")]
    InsufficientInventory {
        bin_code: String,
        requested: i64,
        available: i64,
    },

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("检查约束违反: {}", msg))
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            EngineError::InvalidState {
                entity,
                id,
                expected,
                actual,
            } => ApiError::InvalidState(format!(
                "{}(id={}) 期望状态 {}, 实际状态 {}",
                entity, id, expected, actual
            )),
            EngineError::InsufficientInventory {
                bin_code,
                requested,
                available,
            } => ApiError::InsufficientInventory {
                bin_code,
                requested,
                available,
            },
            EngineError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            EngineError::Repository(err) => err.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_conversion() {
        let err: ApiError = EngineError::InsufficientInventory {
            bin_code: "B1".to_string(),
            requested: 1200,
            available: 1000,
        }
        .into();
        assert!(matches!(err, ApiError::InsufficientInventory { requested: 1200, .. }));
        assert!(err.to_string().contains("B1"));

        let err: ApiError = EngineError::not_found("Task", 9).into();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err: ApiError = EngineError::Repository(RepositoryError::LockError("x".into())).into();
        assert!(matches!(err, ApiError::DatabaseConnectionError(_)));
    }
}
