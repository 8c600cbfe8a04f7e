// ==========================================
// 仓库作业调度系统 - 领域类型定义
// ==========================================
// 职责: 优先级、状态机状态、存储类型与资源类型
// 序列化格式: 与数据库存储字符串一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单优先级 (Priority Class)
// ==========================================
// 顺序: P1 最高, P5 最低
// Unknown: 外部写入的非法值, 打分时取最低基础权重, 不报错
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriorityClass {
    P1,
    P2,
    P3,
    P4,
    P5,
    Unknown,
}

impl PriorityClass {
    /// 从字符串解析优先级（未知值映射为 Unknown）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "P1" => PriorityClass::P1,
            "P2" => PriorityClass::P2,
            "P3" => PriorityClass::P3,
            "P4" => PriorityClass::P4,
            "P5" => PriorityClass::P5,
            _ => PriorityClass::Unknown,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PriorityClass::P1 => "P1",
            PriorityClass::P2 => "P2",
            PriorityClass::P3 => "P3",
            PriorityClass::P4 => "P4",
            PriorityClass::P5 => "P5",
            PriorityClass::Unknown => "UNKNOWN",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != PriorityClass::Unknown
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// OPEN -> ALLOCATED -> CONFIRMED, 单调推进
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,      // 尚无任务分配
    Allocated, // 至少一个任务已分配, 且未全部确认
    Confirmed, // 全部任务已确认
}

impl OrderStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "OPEN" => Some(OrderStatus::Open),
            "ALLOCATED" => Some(OrderStatus::Allocated),
            "CONFIRMED" => Some(OrderStatus::Confirmed),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "OPEN",
            OrderStatus::Allocated => "ALLOCATED",
            OrderStatus::Confirmed => "CONFIRMED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 任务状态 (Task Status)
// ==========================================
// OPEN --allocate--> ALLOCATED --confirm--> CONFIRMED
// 不存在取消, 不存在回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Open,
    Allocated,
    Confirmed,
}

impl TaskStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "OPEN" => Some(TaskStatus::Open),
            "ALLOCATED" => Some(TaskStatus::Allocated),
            "CONFIRMED" => Some(TaskStatus::Confirmed),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "OPEN",
            TaskStatus::Allocated => "ALLOCATED",
            TaskStatus::Confirmed => "CONFIRMED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 资源状态 (Resource Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceStatus {
    Available,
    Busy,
}

impl ResourceStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "Available" => Some(ResourceStatus::Available),
            "Busy" => Some(ResourceStatus::Busy),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ResourceStatus::Available => "Available",
            ResourceStatus::Busy => "Busy",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 资源类型 (Resource Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    RT01, // 前移式叉车
    RT02, // 快速搬运车
    RT03, // 托盘搬运车
}

impl ResourceType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "RT01" => Some(ResourceType::RT01),
            "RT02" => Some(ResourceType::RT02),
            "RT03" => Some(ResourceType::RT03),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ResourceType::RT01 => "RT01",
            ResourceType::RT02 => "RT02",
            ResourceType::RT03 => "RT03",
        }
    }

    /// 资源类型展示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceType::RT01 => "Reach Truck",
            ResourceType::RT02 => "Fast Mover",
            ResourceType::RT03 => "Pallet Jack",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 存储类型 (Storage Class)
// ==========================================
// 红线: 存储类型唯一决定可执行的资源类型 (固定映射)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    ST01,
    ST02,
    ST03,
}

impl StorageClass {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ST01" => Some(StorageClass::ST01),
            "ST02" => Some(StorageClass::ST02),
            "ST03" => Some(StorageClass::ST03),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            StorageClass::ST01 => "ST01",
            StorageClass::ST02 => "ST02",
            StorageClass::ST03 => "ST03",
        }
    }

    /// 兼容的资源类型
    pub fn required_resource_type(&self) -> ResourceType {
        match self {
            StorageClass::ST01 => ResourceType::RT01,
            StorageClass::ST02 => ResourceType::RT02,
            StorageClass::ST03 => ResourceType::RT03,
        }
    }

    /// 目标库位（发货暂存区 GIZN）
    pub fn destination_bin(&self) -> &'static str {
        match self {
            StorageClass::ST01 => "GIZN-001",
            StorageClass::ST02 => "GIZN-002",
            StorageClass::ST03 => "GIZN-003",
        }
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
