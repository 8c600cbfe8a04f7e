// ==========================================
// 仓库作业调度系统 - 作业资源领域模型
// ==========================================
// 红线: 资源 Busy 当且仅当恰有一个 ALLOCATED 任务引用它
// 资源池为静态集合, 运行期不增不减
// ==========================================

use crate::domain::types::{ResourceStatus, ResourceType};
use serde::{Deserialize, Serialize};

// ==========================================
// Resource - 作业资源 (设备 + 操作员)
// ==========================================
// 对齐: resources 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub resource_code: String,
    pub resource_type: ResourceType,
    pub resource_name: String,
    pub status: ResourceStatus,
}
