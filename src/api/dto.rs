// ==========================================
// 仓库作业调度系统 - API 读模型
// ==========================================
// 职责: 面向操作台 / 报表的只读视图结构
// 序列化: 字段名即输出 JSON 键名
// ==========================================

use crate::domain::types::{OrderStatus, PriorityClass, ResourceStatus, ResourceType, TaskStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 订单列表项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummaryDto {
    pub order_no: String,
    pub priority: PriorityClass,
    pub total_items: i64,
    pub completed_items: i64,
    pub raised_time: NaiveDateTime,
    /// 由子任务推导的状态（与持久化状态一致时即为持久化状态）
    pub status: OrderStatus,
}

/// 任务列表项（附展示排名）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskViewDto {
    pub task_id: i64,
    pub task_no: String,
    pub order_no: String,
    pub product: String,
    pub qty: i64,
    pub status: TaskStatus,
    pub allocated_resource: Option<String>,
    pub source_bin: String,
    pub dest_bin: String,
    pub base_priority: Option<PriorityClass>,
    pub current_rank: Option<usize>,
}

/// 驾驶舱统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardDto {
    pub open_tasks: i64,
    pub assigned_tasks: i64,
    pub completed_tasks: i64,
    pub completed_orders: i64,
    pub total_resources: i64,
    pub busy_resources: i64,
    /// Busy 占比（百分比，保留两位小数）
    pub resource_utilization_percent: f64,
}

/// 资源当前作业
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentTaskDto {
    pub task_id: i64,
    pub task_no: String,
    pub product: String,
    pub source_bin: String,
    pub dest_bin: String,
}

/// 资源状态列表项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatusDto {
    pub resource_code: String,
    pub resource_type: ResourceType,
    pub resource_name: String,
    pub status: ResourceStatus,
    pub current_task: Option<CurrentTaskDto>,
}

/// 资源作业历史项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskHistoryDto {
    pub task_id: i64,
    pub task_no: String,
    pub product: String,
    pub qty: i64,
    pub status: TaskStatus,
    pub confirmed_at: Option<NaiveDateTime>,
}

/// 资源详情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDetailDto {
    pub resource_code: String,
    pub resource_type: ResourceType,
    pub resource_name: String,
    pub status: ResourceStatus,
    pub total_completed: usize,
    pub current_task: Option<CurrentTaskDto>,
    /// 新任务在前
    pub history: Vec<TaskHistoryDto>,
}

/// 百分比保留两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
