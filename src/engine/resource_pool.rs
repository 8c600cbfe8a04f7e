// ==========================================
// 仓库作业调度系统 - 资源池管理
// ==========================================
// 职责: 候选资源快照 / 原子占用 / 释放
// 红线: 占用 (Available -> Busy) 为单条条件更新, 失败即冲突, 不重试
// 说明: 快照查询与占用是两个独立步骤, 两者之间不持有任何锁
// ==========================================

use crate::domain::resource::Resource;
use crate::domain::types::ResourceType;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::ResourceRepository;
use rusqlite::Transaction;
use std::sync::Arc;
use tracing::debug;

/// 占用结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// 本次占用成功
    Committed,
    /// 资源已被占用（并发分配竞争失败）
    Conflict,
}

// ==========================================
// ResourcePoolManager
// ==========================================
pub struct ResourcePoolManager {
    resource_repo: Arc<ResourceRepository>,
}

impl ResourcePoolManager {
    pub fn new(resource_repo: Arc<ResourceRepository>) -> Self {
        Self { resource_repo }
    }

    /// 指定类型当前 Available 的候选资源（快照，不预留）
    pub fn acquire(&self, resource_type: ResourceType) -> EngineResult<Vec<Resource>> {
        Ok(self.resource_repo.list_available_by_type(resource_type)?)
    }

    /// 原子占用: Available -> Busy
    pub fn commit(&self, resource_code: &str) -> EngineResult<CommitOutcome> {
        let flipped = self.resource_repo.try_mark_busy(resource_code)?;
        Ok(Self::outcome(resource_code, flipped))
    }

    /// 同上（事务内，与任务/订单状态推进一起提交）
    pub fn commit_tx(tx: &Transaction, resource_code: &str) -> EngineResult<CommitOutcome> {
        let flipped = ResourceRepository::try_mark_busy_tx(tx, resource_code)?;
        Ok(Self::outcome(resource_code, flipped))
    }

    fn outcome(resource_code: &str, flipped: bool) -> CommitOutcome {
        if flipped {
            CommitOutcome::Committed
        } else {
            debug!(resource_code, "资源已不处于 Available, 占用冲突");
            CommitOutcome::Conflict
        }
    }

    /// 释放: -> Available（无条件，已空闲时幂等）
    ///
    /// # 错误
    /// - NotFound: 资源不存在
    pub fn release(&self, resource_code: &str) -> EngineResult<()> {
        if !self.resource_repo.mark_available(resource_code)? {
            return Err(EngineError::not_found("Resource", resource_code));
        }
        Ok(())
    }

    /// 同上（事务内）
    pub fn release_tx(tx: &Transaction, resource_code: &str) -> EngineResult<()> {
        if !ResourceRepository::mark_available_tx(tx, resource_code)? {
            return Err(EngineError::not_found("Resource", resource_code));
        }
        Ok(())
    }
}
