// ==========================================
// 仓库作业调度系统 - 库存领域模型
// ==========================================
// 红线: 0 <= current_qty <= capacity
// ==========================================

use crate::domain::types::StorageClass;
use serde::{Deserialize, Serialize};

// ==========================================
// StorageBin - 储位
// ==========================================
// 对齐: storage_bins 表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageBin {
    pub bin_code: String,
    pub capacity: i64,
    pub current_qty: i64,
}

impl StorageBin {
    /// 是否可满足扣减
    pub fn can_deduct(&self, quantity: i64) -> bool {
        quantity >= 0 && self.current_qty >= quantity
    }

    /// 补货后的数量（按容量截断）
    pub fn restocked_qty(&self, amount: i64) -> i64 {
        self.capacity.min(self.current_qty.saturating_add(amount))
    }
}

// ==========================================
// Product - 产品主数据 (只读参考数据)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub product_name: String,
    pub product_code: String,
    pub storage_class: StorageClass,
    pub source_bin: String,
}
