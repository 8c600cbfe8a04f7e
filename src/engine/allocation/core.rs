use super::report::{AllocationReport, Assignment};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::order::{Order, WarehouseTask};
use crate::domain::resource::Resource;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::estimator::{DurationEstimator, TimeContext};
use crate::engine::priority::PriorityScorer;
use crate::engine::repositories::WarehouseRepositories;
use crate::engine::resource_pool::{CommitOutcome, ResourcePoolManager};
use crate::repository::{ActionLogRepository, OrderRepository, RepositoryError, TaskRepository};
use chrono::NaiveDateTime;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// 分配日志的操作人
const ALLOCATOR_ACTOR: &str = "ALLOCATOR";

/// 已打分的 OPEN 任务
#[derive(Debug, Clone)]
pub struct ScoredTask {
    pub task: WarehouseTask,
    pub order: Order,
    pub score: f64,
}

/// 提交事务的中止原因（均导致整笔回滚）
enum CommitAbort {
    ResourceTaken,
    TaskTaken,
    Failed(EngineError),
}

impl From<RepositoryError> for CommitAbort {
    fn from(err: RepositoryError) -> Self {
        CommitAbort::Failed(err.into())
    }
}

impl From<EngineError> for CommitAbort {
    fn from(err: EngineError) -> Self {
        CommitAbort::Failed(err)
    }
}

// ==========================================
// AllocationEngine - 任务分配引擎
// ==========================================
// 贪心单遍: 按有效分从高到低逐个任务选取估算时长最短的资源, 不回溯
pub struct AllocationEngine {
    repos: WarehouseRepositories,
    pool: ResourcePoolManager,
    scorer: PriorityScorer,
    estimator: Arc<dyn DurationEstimator>,
}

impl AllocationEngine {
    pub fn new(
        repos: WarehouseRepositories,
        scorer: PriorityScorer,
        estimator: Arc<dyn DurationEstimator>,
    ) -> Self {
        Self {
            pool: ResourcePoolManager::new(repos.resource_repo.clone()),
            repos,
            scorer,
            estimator,
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 执行一次分配轮次
    ///
    /// 无 OPEN 任务或无可用资源时为空操作，总是成功。
    ///
    /// # 参数
    /// - `now`: 评估时间（打分老化与估算时间上下文）
    ///
    /// # 返回
    /// 本轮分配报告
    #[instrument(skip(self))]
    pub fn run_sweep(&self, now: NaiveDateTime) -> EngineResult<AllocationReport> {
        let mut report = AllocationReport::new(now);

        let open_tasks = self.repos.task_repo.list_open_with_orders()?;
        let ranked = self.rank_open_tasks(open_tasks, now);
        report.considered = ranked.len();

        info!(open_tasks = report.considered, "分配轮次开始");

        let ctx = TimeContext::from_datetime(now);
        for scored in ranked {
            let required_type = scored.task.storage_class.required_resource_type();

            // 快照读取，随即释放连接
            let candidates = self.pool.acquire(required_type)?;
            let Some((resource, minutes)) = self.select_best(&candidates, &ctx) else {
                debug!(
                    task_no = %scored.task.task_no,
                    resource_type = %required_type,
                    "无可用同类型资源, 任务保持 OPEN"
                );
                report.skipped_no_resource += 1;
                continue;
            };

            match self.commit_assignment(&scored, &resource, minutes, now) {
                Ok(()) => {
                    debug!(
                        task_no = %scored.task.task_no,
                        resource_code = %resource.resource_code,
                        estimated_minutes = minutes,
                        "任务已分配"
                    );
                    report.allocated.push(Assignment {
                        task_id: scored.task.id,
                        task_no: scored.task.task_no.clone(),
                        order_no: scored.order.order_no.clone(),
                        resource_code: resource.resource_code.clone(),
                        estimated_minutes: minutes,
                        score: scored.score,
                    });
                }
                Err(CommitAbort::ResourceTaken) => {
                    debug!(
                        task_no = %scored.task.task_no,
                        resource_code = %resource.resource_code,
                        "资源已被并发轮次占用, 留待下一轮"
                    );
                    report.contention += 1;
                }
                Err(CommitAbort::TaskTaken) => {
                    debug!(task_no = %scored.task.task_no, "任务已被并发轮次分配");
                    report.contention += 1;
                }
                Err(CommitAbort::Failed(err)) => return Err(err),
            }
        }

        info!(
            allocated = report.allocated_count(),
            skipped_no_resource = report.skipped_no_resource,
            contention = report.contention,
            "分配轮次结束"
        );
        Ok(report)
    }

    /// 按有效分降序排列 OPEN 任务
    ///
    /// 同分时按订单序号、任务序号升序（到达顺序），排序稳定
    pub fn rank_open_tasks(
        &self,
        open_tasks: Vec<(WarehouseTask, Order)>,
        now: NaiveDateTime,
    ) -> Vec<ScoredTask> {
        let mut scored: Vec<ScoredTask> = open_tasks
            .into_iter()
            .map(|(task, order)| {
                let score = self
                    .scorer
                    .effective_score(order.priority, order.created_at, now);
                ScoredTask { task, order, score }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.order.id.cmp(&b.order.id))
                .then_with(|| a.task.id.cmp(&b.task.id))
        });
        scored
    }

    /// 选取估算时长最短的候选（同值取先出现者）
    fn select_best(&self, candidates: &[Resource], ctx: &TimeContext) -> Option<(Resource, f64)> {
        candidates
            .iter()
            .map(|r| (r, self.estimator.estimate(&r.resource_code, ctx)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(r, minutes)| (r.clone(), minutes))
    }

    /// 原子提交: 资源 Busy + 任务 ALLOCATED + 订单推进 + 操作日志
    fn commit_assignment(
        &self,
        scored: &ScoredTask,
        resource: &Resource,
        minutes: f64,
        now: NaiveDateTime,
    ) -> Result<(), CommitAbort> {
        let task = &scored.task;
        self.repos.in_transaction(|tx| {
            if ResourcePoolManager::commit_tx(tx, &resource.resource_code)?
                == CommitOutcome::Conflict
            {
                return Err(CommitAbort::ResourceTaken);
            }

            if !TaskRepository::mark_allocated_tx(tx, task.id, &resource.resource_code)? {
                return Err(CommitAbort::TaskTaken);
            }

            // 只推进 OPEN 订单, 不会回退 CONFIRMED
            OrderRepository::advance_to_allocated_tx(tx, &task.order_no)?;

            let log = ActionLog::new(ActionType::Allocate, ALLOCATOR_ACTOR, now)
                .with_order(&task.order_no)
                .with_task(task.id)
                .with_resource(&resource.resource_code)
                .with_bin(&task.source_bin)
                .with_payload(json!({
                    "task_no": task.task_no,
                    "score": scored.score,
                    "estimated_minutes": minutes,
                }));
            ActionLogRepository::insert_tx(tx, &log)?;
            Ok(())
        })
    }
}
