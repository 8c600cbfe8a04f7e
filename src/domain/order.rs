// ==========================================
// 仓库作业调度系统 - 订单与任务领域模型
// ==========================================
// 红线: 订单独占其任务 (按 order_no 一对多)
// 红线: 任务对资源/库位只持有编码引用, 不持有所有权
// ==========================================

use crate::domain::types::{OrderStatus, PriorityClass, StorageClass, TaskStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Order - 客户订单
// ==========================================
// 对齐: orders 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,                  // 自增序号 (展示排名的最终 tie-break)
    pub order_no: String,         // 订单号 ORD + 序号
    pub priority: PriorityClass,  // 优先级
    pub created_at: NaiveDateTime, // 创建时间 (等待时长起点)
    pub status: OrderStatus,      // 订单状态
}

// ==========================================
// WarehouseTask - 拣货任务
// ==========================================
// 对齐: tasks 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseTask {
    // ===== 标识 =====
    pub id: i64,
    pub task_no: String,  // TSK + 全局序号
    pub order_no: String, // 所属订单

    // ===== 产品与数量 =====
    pub product_name: String,
    pub product_code: String,
    pub storage_class: StorageClass,
    pub source_qty: i64,

    pub created_at: NaiveDateTime,
    pub status: TaskStatus,

    // ===== 作业属性 (固定取值) =====
    pub warehouse_process_type: String,
    pub activity: String,
    pub batch: String,
    pub created_by: String,
    pub stock_type: String,
    pub owner_wh: String,
    pub uom: String,
    pub pallet_hu: String, // 托盘/搬运单元号

    // ===== 分配阶段 =====
    pub allocated_resource: Option<String>,

    // ===== 确认阶段 =====
    pub confirmed_by: Option<String>,
    pub confirmed_at: Option<NaiveDateTime>,
    pub destination_qty: Option<i64>, // 结算数量
    pub source_bin: String,
    pub dest_storage_type: String,
    pub dest_bin: String,
}

/// 任务默认作业属性
pub mod task_defaults {
    pub const WAREHOUSE_PROCESS_TYPE: &str = "YR10";
    pub const ACTIVITY: &str = "PICK";
    pub const BATCH: &str = "BAT123";
    pub const CREATED_BY: &str = "SUPERVISOR 1";
    pub const STOCK_TYPE: &str = "SL";
    pub const OWNER_WH: &str = "1001";
    pub const UOM: &str = "EA";
    pub const DEST_STORAGE_TYPE: &str = "GIZN";
}

// ==========================================
// OrderLine - 订单行 (拆分为任务前的输入)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_code: String,
    pub quantity: i64,
}

impl OrderLine {
    pub fn new(product_code: impl Into<String>, quantity: i64) -> Self {
        Self {
            product_code: product_code.into(),
            quantity,
        }
    }
}
