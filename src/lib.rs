// ==========================================
// 仓库作业调度系统 - 核心库
// ==========================================
// 职责: 订单拆分、任务分配、履约确认与库存维护
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 参考数据初始化
pub mod seed;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    OrderStatus, PriorityClass, ResourceStatus, ResourceType, StorageClass, TaskStatus,
};

// 领域实体
pub use domain::{ActionLog, ActionType, Order, OrderLine, Product, Resource, StorageBin, WarehouseTask};

// 引擎
pub use engine::{
    AllocationEngine, BinInventoryManager, DisplayRanker, FulfillmentEngine, OrderIntake,
    PriorityScorer, ResourcePoolManager,
};

// API
pub use api::WarehouseApi;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "仓库作业调度系统";
