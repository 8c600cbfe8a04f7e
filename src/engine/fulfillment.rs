// ==========================================
// 仓库作业调度系统 - 履约确认引擎
// ==========================================
// 职责: 任务确认 = 扣减库存 + 任务 CONFIRMED + 释放资源 + 订单级联
// 红线: 全部步骤在同一 IMMEDIATE 事务内, 要么全部生效要么全部不生效
// 红线: 缺货时任务保持 ALLOCATED, 资源保持 Busy, 订单不变
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::types::{OrderStatus, TaskStatus};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::inventory::{BinInventoryManager, DeductOutcome};
use crate::engine::lifecycle::validate_task_transition;
use crate::engine::repositories::WarehouseRepositories;
use crate::engine::resource_pool::ResourcePoolManager;
use crate::repository::{ActionLogRepository, OrderRepository, TaskRepository};
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};

/// 确认结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmationOutcome {
    pub task_id: i64,
    pub task_no: String,
    pub order_no: String,
    pub resource_code: String,
    pub bin_code: String,
    pub quantity: i64,
    /// 扣减后储位余量
    pub remaining_qty: i64,
    pub order_status: OrderStatus,
    pub confirmed_at: NaiveDateTime,
}

// ==========================================
// FulfillmentEngine - 履约确认引擎
// ==========================================
pub struct FulfillmentEngine {
    repos: WarehouseRepositories,
}

impl FulfillmentEngine {
    pub fn new(repos: WarehouseRepositories) -> Self {
        Self { repos }
    }

    /// 确认任务
    ///
    /// # 参数
    /// - `task_id`: 任务 id
    /// - `now`: 确认时间
    ///
    /// # 错误
    /// - NotFound: 任务或源储位不存在
    /// - InvalidState: 任务不处于 ALLOCATED
    /// - InsufficientInventory: 源储位库存不足（可补货后重试）
    #[instrument(skip(self))]
    pub fn confirm(&self, task_id: i64, now: NaiveDateTime) -> EngineResult<ConfirmationOutcome> {
        let result = self
            .repos
            .in_transaction(|tx| Self::confirm_in_tx(tx, task_id, now));

        match result {
            Ok(outcome) => {
                info!(
                    task_no = %outcome.task_no,
                    resource_code = %outcome.resource_code,
                    bin_code = %outcome.bin_code,
                    remaining_qty = outcome.remaining_qty,
                    order_status = %outcome.order_status,
                    "任务已确认"
                );
                Ok(outcome)
            }
            Err(EngineError::InsufficientInventory {
                bin_code,
                requested,
                available,
            }) => {
                warn!(task_id, bin_code = %bin_code, requested, available, "确认失败: 储位缺货");
                self.record_stock_out(task_id, &bin_code, requested, available, now);
                Err(EngineError::InsufficientInventory {
                    bin_code,
                    requested,
                    available,
                })
            }
            Err(err) => Err(err),
        }
    }

    fn confirm_in_tx(
        tx: &rusqlite::Transaction,
        task_id: i64,
        now: NaiveDateTime,
    ) -> EngineResult<ConfirmationOutcome> {
        let task = TaskRepository::find_by_id_tx(tx, task_id)?
            .ok_or_else(|| EngineError::not_found("Task", task_id))?;
        validate_task_transition(task_id, task.status, TaskStatus::Confirmed)?;

        let resource_code = task.allocated_resource.clone().ok_or_else(|| {
            EngineError::InvalidState {
                entity: "Task".to_string(),
                id: task_id.to_string(),
                expected: "ALLOCATED 且持有资源".to_string(),
                actual: "ALLOCATED 无资源".to_string(),
            }
        })?;

        // ===== 1. 原子扣减 =====
        let remaining_qty =
            match BinInventoryManager::check_and_deduct_tx(tx, &task.source_bin, task.source_qty)? {
                DeductOutcome::Deducted { remaining } => remaining,
                DeductOutcome::InsufficientStock { available } => {
                    return Err(EngineError::InsufficientInventory {
                        bin_code: task.source_bin.clone(),
                        requested: task.source_qty,
                        available,
                    });
                }
            };

        // ===== 2. 任务确认（结算数量 = 需求数量） =====
        if !TaskRepository::mark_confirmed_tx(tx, task_id, &resource_code, &now, task.source_qty)? {
            return Err(EngineError::InvalidState {
                entity: "Task".to_string(),
                id: task_id.to_string(),
                expected: TaskStatus::Allocated.to_db_str().to_string(),
                actual: "已被并发确认".to_string(),
            });
        }

        // ===== 3. 释放资源 =====
        ResourcePoolManager::release_tx(tx, &resource_code)?;

        // ===== 4. 订单级联（基于事务内快照，可重复执行） =====
        OrderRepository::confirm_if_all_tasks_confirmed_tx(tx, &task.order_no)?;
        let order_status = OrderRepository::find_by_no_tx(tx, &task.order_no)?
            .map(|o| o.status)
            .ok_or_else(|| EngineError::not_found("Order", &task.order_no))?;

        let log = ActionLog::new(ActionType::Confirm, &resource_code, now)
            .with_order(&task.order_no)
            .with_task(task_id)
            .with_resource(&resource_code)
            .with_bin(&task.source_bin)
            .with_payload(json!({
                "task_no": task.task_no,
                "quantity": task.source_qty,
                "remaining_qty": remaining_qty,
                "order_status": order_status.to_db_str(),
            }));
        ActionLogRepository::insert_tx(tx, &log)?;

        Ok(ConfirmationOutcome {
            task_id,
            task_no: task.task_no,
            order_no: task.order_no,
            resource_code,
            bin_code: task.source_bin,
            quantity: task.source_qty,
            remaining_qty,
            order_status,
            confirmed_at: now,
        })
    }

    /// 缺货审计（确认事务已回滚，单独写入；失败只告警）
    fn record_stock_out(
        &self,
        task_id: i64,
        bin_code: &str,
        requested: i64,
        available: i64,
        now: NaiveDateTime,
    ) {
        let log = ActionLog::new(ActionType::StockOut, "FULFILLMENT", now)
            .with_task(task_id)
            .with_bin(bin_code)
            .with_payload(json!({
                "requested": requested,
                "available": available,
            }))
            .with_detail("库存不足, 任务保持 ALLOCATED, 请补货后重试");

        if let Err(e) = self.repos.action_log_repo.insert(&log) {
            warn!(task_id, error = %e, "缺货日志写入失败");
        }
    }
}
