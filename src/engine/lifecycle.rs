// ==========================================
// 仓库作业调度系统 - 订单/任务状态机
// ==========================================
// 任务: OPEN --allocate--> ALLOCATED --confirm--> CONFIRMED
// 订单: 由子任务状态推导, 单调推进
// 红线: 不存在取消, 不存在回退, CONFIRMED 为终态
// ==========================================

use crate::domain::types::{OrderStatus, TaskStatus};
use crate::engine::error::{EngineError, EngineResult};

/// 任务状态转换是否合法
pub fn can_transition(from: TaskStatus, to: TaskStatus) -> bool {
    matches!(
        (from, to),
        (TaskStatus::Open, TaskStatus::Allocated) | (TaskStatus::Allocated, TaskStatus::Confirmed)
    )
}

/// 校验任务状态转换
///
/// # 错误
/// - InvalidState: 非法转换（expected 为目标状态的唯一合法前驱）
pub fn validate_task_transition(task_id: i64, from: TaskStatus, to: TaskStatus) -> EngineResult<()> {
    if can_transition(from, to) {
        return Ok(());
    }

    let expected = match to {
        TaskStatus::Allocated => TaskStatus::Open.to_db_str(),
        TaskStatus::Confirmed => TaskStatus::Allocated.to_db_str(),
        TaskStatus::Open => "(不可回到 OPEN)",
    };
    Err(EngineError::InvalidState {
        entity: "Task".to_string(),
        id: task_id.to_string(),
        expected: expected.to_string(),
        actual: from.to_db_str().to_string(),
    })
}

/// 由子任务状态推导订单状态
///
/// - 无任务或全部 OPEN: OPEN
/// - 全部 CONFIRMED（且至少一个任务）: CONFIRMED
/// - 其他: ALLOCATED
pub fn derive_order_status(task_statuses: &[TaskStatus]) -> OrderStatus {
    if task_statuses.is_empty() {
        return OrderStatus::Open;
    }
    if task_statuses.iter().all(|s| *s == TaskStatus::Confirmed) {
        return OrderStatus::Confirmed;
    }
    if task_statuses.iter().any(|s| *s != TaskStatus::Open) {
        return OrderStatus::Allocated;
    }
    OrderStatus::Open
}
