// ==========================================
// 仓库作业调度系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合引擎所需的所有 Repository, 并提供跨仓储事务入口
// 红线: 事务闭包内只能调用 *_tx 关联函数 (连接锁不可重入)
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::repository::{
    ActionLogRepository, OrderRepository, ProductRepository, RepositoryError, ResourceRepository,
    StorageBinRepository, TaskRepository,
};

/// 仓库引擎仓储集合
///
/// 所有仓储共享同一个连接；多实体变更通过 [`in_transaction`] 在
/// `BEGIN IMMEDIATE` 事务中提交，单实体原子步骤由条件 UPDATE 保证。
///
/// # 包含的仓储
/// - `order_repo`: 订单
/// - `task_repo`: 任务
/// - `resource_repo`: 作业资源
/// - `bin_repo`: 储位库存
/// - `product_repo`: 产品主数据
/// - `action_log_repo`: 操作日志
///
/// [`in_transaction`]: WarehouseRepositories::in_transaction
#[derive(Clone)]
pub struct WarehouseRepositories {
    conn: Arc<Mutex<Connection>>,
    pub order_repo: Arc<OrderRepository>,
    pub task_repo: Arc<TaskRepository>,
    pub resource_repo: Arc<ResourceRepository>,
    pub bin_repo: Arc<StorageBinRepository>,
    pub product_repo: Arc<ProductRepository>,
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl WarehouseRepositories {
    /// 基于共享连接创建全部仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            order_repo: Arc::new(OrderRepository::new(conn.clone())),
            task_repo: Arc::new(TaskRepository::new(conn.clone())),
            resource_repo: Arc::new(ResourceRepository::new(conn.clone())),
            bin_repo: Arc::new(StorageBinRepository::new(conn.clone())),
            product_repo: Arc::new(ProductRepository::new(conn.clone())),
            action_log_repo: Arc::new(ActionLogRepository::new(conn.clone())),
            conn,
        }
    }

    /// 共享连接（供 ConfigManager 等复用）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    /// 在 IMMEDIATE 事务中执行闭包
    ///
    /// 闭包返回 Ok 时提交；返回 Err 时事务随 drop 回滚，不留下任何部分写入。
    ///
    /// # 参数
    /// - `f`: 事务体，只能调用各仓储的 `*_tx` 关联函数
    pub fn in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let value = f(&tx)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(value)
    }
}
