// ==========================================
// 仓库作业调度系统 - 应用层
// ==========================================
// 职责: 组装数据库、仓储、引擎与API
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, DB_PATH_ENV, DURATION_TABLE_ENV};
