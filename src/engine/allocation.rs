// ==========================================
// 仓库作业调度系统 - 任务分配引擎
// ==========================================
// 职责: 对全部 OPEN 任务做一次完整的分配轮次 (sweep)
// 流程: 打分排序 -> 候选快照 -> 时长估算选优 -> 原子提交
// 红线: 估算期间不持有任何锁; 提交冲突不重试, 留待下一轮
// ==========================================

mod core;
mod report;


pub use core::{AllocationEngine, ScoredTask};
pub use report::{AllocationReport, Assignment};
