// ==========================================
// 仓库作业调度系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: *_tx 关联函数只接收 &Connection / &Transaction,
//       供引擎在单个事务内组合多个仓储的写入
// ==========================================

pub mod action_log_repo;
pub mod bin_repo;
pub mod error;
pub mod order_repo;
pub mod product_repo;
pub mod resource_repo;
pub mod task_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use bin_repo::StorageBinRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use order_repo::OrderRepository;
pub use product_repo::ProductRepository;
pub use resource_repo::ResourceRepository;
pub use task_repo::TaskRepository;

/// 列值无法映射为领域枚举时的行映射错误
pub(crate) fn invalid_column(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into())
}
