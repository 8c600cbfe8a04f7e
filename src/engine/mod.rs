// ==========================================
// 仓库作业调度系统 - 引擎层
// ==========================================
// 职责: 实现分配与履约规则, 不拼 SQL
// 红线: Engine 不拼 SQL, 多实体变更一律走 WarehouseRepositories::in_transaction
// ==========================================

pub mod allocation;
pub mod error;
pub mod estimator;
pub mod fulfillment;
pub mod intake;
pub mod inventory;
pub mod lifecycle;
pub mod priority;
pub mod repositories;
pub mod resource_pool;

// 重导出核心引擎
pub use allocation::{AllocationEngine, AllocationReport, Assignment, ScoredTask};
pub use error::{EngineError, EngineResult};
pub use estimator::{DurationEstimator, HeuristicEstimator, TableEstimator, TimeContext};
pub use fulfillment::{ConfirmationOutcome, FulfillmentEngine};
pub use intake::{generate_demo_lines, CreatedOrder, OrderIntake};
pub use inventory::{BinInventoryManager, DeductOutcome, RestockOutcome};
pub use lifecycle::derive_order_status;
pub use priority::{DisplayRanker, OrderRank, PriorityScorer};
pub use repositories::WarehouseRepositories;
pub use resource_pool::{CommitOutcome, ResourcePoolManager};
