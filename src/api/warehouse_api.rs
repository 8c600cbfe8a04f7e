// ==========================================
// 仓库作业调度系统 - 仓库作业 API
// ==========================================
// 职责: 进程内业务接口 (建单 / 分配 / 确认 / 补货 / 读模型)
// 架构: API 层 -> Engine 层 -> Repository 层
// 说明: 不提供网络传输, 由 CLI 或宿主程序直接调用
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::info;

use crate::api::dto::{
    round2, CurrentTaskDto, DashboardDto, OrderSummaryDto, ResourceDetailDto, ResourceStatusDto,
    TaskHistoryDto, TaskViewDto,
};
use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::action_log::ActionLog;
use crate::domain::inventory::StorageBin;
use crate::domain::order::{OrderLine, WarehouseTask};
use crate::domain::types::{OrderStatus, PriorityClass, TaskStatus};
use crate::engine::{
    derive_order_status, AllocationEngine, AllocationReport, BinInventoryManager,
    ConfirmationOutcome, CreatedOrder, DisplayRanker, DurationEstimator, FulfillmentEngine,
    OrderIntake, PriorityScorer, RestockOutcome, WarehouseRepositories,
};

/// 补货操作人
const OPERATOR_ACTOR: &str = "OPERATOR";

// ==========================================
// WarehouseApi - 仓库作业 API
// ==========================================
pub struct WarehouseApi {
    repos: WarehouseRepositories,
    config_manager: Arc<ConfigManager>,
    estimator: Arc<dyn DurationEstimator>,
    intake: OrderIntake,
    fulfillment: FulfillmentEngine,
    inventory: BinInventoryManager,
}

impl WarehouseApi {
    /// 创建新的WarehouseApi实例
    ///
    /// # 参数
    /// - repos: 仓储集合
    /// - config_manager: 配置管理器（打分权重 / 补货量）
    /// - estimator: 作业时长估算器
    pub fn new(
        repos: WarehouseRepositories,
        config_manager: Arc<ConfigManager>,
        estimator: Arc<dyn DurationEstimator>,
    ) -> Self {
        Self {
            intake: OrderIntake::new(repos.clone()),
            fulfillment: FulfillmentEngine::new(repos.clone()),
            inventory: BinInventoryManager::new(repos.clone()),
            repos,
            config_manager,
            estimator,
        }
    }

    fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn parse_priority(priority: &str) -> ApiResult<PriorityClass> {
        let parsed = PriorityClass::from_str(priority);
        if !parsed.is_known() {
            return Err(ApiError::InvalidInput(format!(
                "优先级必须为 P1..P5, 实际: {}",
                priority
            )));
        }
        Ok(parsed)
    }

    // ==========================================
    // 写操作
    // ==========================================

    /// 创建订单（指定订单行）
    pub fn create_order(&self, priority: &str, lines: &[OrderLine]) -> ApiResult<CreatedOrder> {
        self.create_order_at(priority, lines, Self::now())
    }

    /// 创建订单（指定时间）
    pub fn create_order_at(
        &self,
        priority: &str,
        lines: &[OrderLine],
        now: NaiveDateTime,
    ) -> ApiResult<CreatedOrder> {
        let priority = Self::parse_priority(priority)?;
        Ok(self.intake.create_order(priority, lines, now)?)
    }

    /// 创建演示订单（随机拆分 1-9 个任务）
    pub fn create_demo_order(&self, priority: &str) -> ApiResult<CreatedOrder> {
        let priority = Self::parse_priority(priority)?;
        let mut rng = rand::rng();
        Ok(self
            .intake
            .create_demo_order(priority, &mut rng, Self::now())?)
    }

    /// 执行一次分配轮次
    pub fn allocate_tasks(&self) -> ApiResult<AllocationReport> {
        self.allocate_tasks_at(Self::now())
    }

    /// 执行一次分配轮次（指定评估时间）
    ///
    /// 每次调用重新读取打分配置，配置变更在下一轮生效
    pub fn allocate_tasks_at(&self, now: NaiveDateTime) -> ApiResult<AllocationReport> {
        let scoring = self.config_manager.get_scoring_config()?;
        let engine = AllocationEngine::new(
            self.repos.clone(),
            PriorityScorer::new(scoring),
            self.estimator.clone(),
        );
        Ok(engine.run_sweep(now)?)
    }

    /// 确认任务
    pub fn confirm_task(&self, task_id: i64) -> ApiResult<ConfirmationOutcome> {
        self.confirm_task_at(task_id, Self::now())
    }

    /// 确认任务（指定时间）
    pub fn confirm_task_at(&self, task_id: i64, now: NaiveDateTime) -> ApiResult<ConfirmationOutcome> {
        Ok(self.fulfillment.confirm(task_id, now)?)
    }

    /// 按配置的默认补货量补货
    pub fn refill_bin(&self, bin_code: &str) -> ApiResult<RestockOutcome> {
        let amount = self.config_manager.get_restock_amount()?;
        self.restock_bin(bin_code, amount)
    }

    /// 按指定数量补货（按容量截断）
    pub fn restock_bin(&self, bin_code: &str, amount: i64) -> ApiResult<RestockOutcome> {
        let outcome = self
            .inventory
            .restock(bin_code, amount, OPERATOR_ACTOR, Self::now())?;
        info!(bin_code, after_qty = outcome.after_qty, "补货请求完成");
        Ok(outcome)
    }

    // ==========================================
    // 读模型
    // ==========================================

    /// 订单列表（含完成进度与推导状态）
    pub fn list_orders(&self) -> ApiResult<Vec<OrderSummaryDto>> {
        let orders = self.repos.order_repo.list_all()?;
        let tasks_by_order = group_by_order(self.repos.task_repo.list_all()?);

        Ok(orders
            .into_iter()
            .map(|order| {
                let statuses: Vec<TaskStatus> = tasks_by_order
                    .get(&order.order_no)
                    .map(|tasks| tasks.iter().map(|t| t.status).collect())
                    .unwrap_or_default();
                let completed = statuses
                    .iter()
                    .filter(|s| **s == TaskStatus::Confirmed)
                    .count() as i64;

                OrderSummaryDto {
                    total_items: statuses.len() as i64,
                    completed_items: completed,
                    raised_time: order.created_at,
                    status: derive_order_status(&statuses),
                    priority: order.priority,
                    order_no: order.order_no,
                }
            })
            .collect())
    }

    /// 已完成订单
    pub fn list_completed_orders(&self) -> ApiResult<Vec<OrderSummaryDto>> {
        let orders = self.repos.order_repo.list_by_status(OrderStatus::Confirmed)?;
        let totals: HashMap<String, i64> = self
            .repos
            .task_repo
            .count_by_order_and_status(TaskStatus::Confirmed)?
            .into_iter()
            .collect();

        Ok(orders
            .into_iter()
            .map(|order| {
                let total = totals.get(&order.order_no).copied().unwrap_or(0);
                OrderSummaryDto {
                    total_items: total,
                    completed_items: total,
                    raised_time: order.created_at,
                    status: order.status,
                    priority: order.priority,
                    order_no: order.order_no,
                }
            })
            .collect())
    }

    /// 任务列表（附订单展示排名）
    pub fn list_tasks(&self) -> ApiResult<Vec<TaskViewDto>> {
        let scoring = self.config_manager.get_scoring_config()?;
        let orders = self.repos.order_repo.list_all()?;
        let tasks = self.repos.task_repo.list_all()?;

        let mut open_counts: HashMap<String, i64> = HashMap::new();
        for task in tasks.iter().filter(|t| t.status == TaskStatus::Open) {
            *open_counts.entry(task.order_no.clone()).or_insert(0) += 1;
        }

        let ranks: HashMap<String, (usize, PriorityClass)> = DisplayRanker::new(scoring)
            .rank(&orders, &open_counts)
            .into_iter()
            .map(|r| (r.order_no, (r.rank, r.priority)))
            .collect();

        Ok(tasks
            .into_iter()
            .map(|task| {
                let rank = ranks.get(&task.order_no).copied();
                TaskViewDto {
                    task_id: task.id,
                    task_no: task.task_no,
                    product: task.product_name,
                    qty: task.source_qty,
                    status: task.status,
                    allocated_resource: task.allocated_resource,
                    source_bin: task.source_bin,
                    dest_bin: task.dest_bin,
                    base_priority: rank.map(|(_, p)| p),
                    current_rank: rank.map(|(r, _)| r),
                    order_no: task.order_no,
                }
            })
            .collect())
    }

    /// 驾驶舱统计
    pub fn get_dashboard(&self) -> ApiResult<DashboardDto> {
        let task_repo = &self.repos.task_repo;
        let (total_resources, busy_resources) = self.repos.resource_repo.count_total_and_busy()?;

        let utilization = if total_resources > 0 {
            round2(busy_resources as f64 / total_resources as f64 * 100.0)
        } else {
            0.0
        };

        Ok(DashboardDto {
            open_tasks: task_repo.count_by_status(TaskStatus::Open)?,
            assigned_tasks: task_repo.count_by_status(TaskStatus::Allocated)?,
            completed_tasks: task_repo.count_by_status(TaskStatus::Confirmed)?,
            completed_orders: self.repos.order_repo.count_by_status(OrderStatus::Confirmed)?,
            total_resources,
            busy_resources,
            resource_utilization_percent: utilization,
        })
    }

    /// 储位列表
    pub fn list_bins(&self) -> ApiResult<Vec<StorageBin>> {
        Ok(self.repos.bin_repo.list_all()?)
    }

    /// 资源状态（附当前作业）
    pub fn list_resource_status(&self) -> ApiResult<Vec<ResourceStatusDto>> {
        let resources = self.repos.resource_repo.list_all()?;
        let current: HashMap<String, WarehouseTask> = self
            .repos
            .task_repo
            .list_by_status(TaskStatus::Allocated)?
            .into_iter()
            .filter_map(|t| t.allocated_resource.clone().map(|code| (code, t)))
            .collect();

        Ok(resources
            .into_iter()
            .map(|r| ResourceStatusDto {
                current_task: current.get(&r.resource_code).map(to_current_task),
                resource_code: r.resource_code,
                resource_type: r.resource_type,
                resource_name: r.resource_name,
                status: r.status,
            })
            .collect())
    }

    /// 资源详情（完成数 + 当前作业 + 历史，新任务在前）
    pub fn get_resource_detail(&self, resource_code: &str) -> ApiResult<ResourceDetailDto> {
        let resource = self
            .repos
            .resource_repo
            .find_by_code(resource_code)?
            .ok_or_else(|| ApiError::NotFound(format!("资源{}不存在", resource_code)))?;

        let history = self.repos.task_repo.list_by_resource(resource_code)?;
        let total_completed = history
            .iter()
            .filter(|t| t.status == TaskStatus::Confirmed)
            .count();
        let current_task = self
            .repos
            .task_repo
            .find_allocated_by_resource(resource_code)?
            .as_ref()
            .map(to_current_task);

        Ok(ResourceDetailDto {
            resource_code: resource.resource_code,
            resource_type: resource.resource_type,
            resource_name: resource.resource_name,
            status: resource.status,
            total_completed,
            current_task,
            history: history
                .into_iter()
                .map(|t| TaskHistoryDto {
                    task_id: t.id,
                    task_no: t.task_no,
                    product: t.product_name,
                    qty: t.source_qty,
                    status: t.status,
                    confirmed_at: t.confirmed_at,
                })
                .collect(),
        })
    }

    /// 最近的操作日志
    pub fn list_recent_actions(&self, limit: i64) -> ApiResult<Vec<ActionLog>> {
        if limit <= 0 {
            return Err(ApiError::InvalidInput("limit 必须为正数".to_string()));
        }
        Ok(self.repos.action_log_repo.find_recent(limit)?)
    }
}

fn group_by_order(tasks: Vec<WarehouseTask>) -> HashMap<String, Vec<WarehouseTask>> {
    let mut grouped: HashMap<String, Vec<WarehouseTask>> = HashMap::new();
    for task in tasks {
        grouped.entry(task.order_no.clone()).or_default().push(task);
    }
    grouped
}

fn to_current_task(task: &WarehouseTask) -> CurrentTaskDto {
    CurrentTaskDto {
        task_id: task.id,
        task_no: task.task_no.clone(),
        product: task.product_name.clone(),
        source_bin: task.source_bin.clone(),
        dest_bin: task.dest_bin.clone(),
    }
}
