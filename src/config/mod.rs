// ==========================================
// 仓库作业调度系统 - 配置层
// ==========================================
// 职责: 打分权重、补货量等运行参数
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, ScoringConfig, DEFAULT_RESTOCK_AMOUNT};
