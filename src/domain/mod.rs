// ==========================================
// 仓库作业调度系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod inventory;
pub mod order;
pub mod resource;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use inventory::{Product, StorageBin};
pub use order::{task_defaults, Order, OrderLine, WarehouseTask};
pub use resource::Resource;
pub use types::{
    OrderStatus, PriorityClass, ResourceStatus, ResourceType, StorageClass, TaskStatus,
};
