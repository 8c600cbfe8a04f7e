// ==========================================
// 仓库作业调度系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录
// 用途: 审计追踪 (分配 / 确认 / 缺货 / 补货 / 建单)
// 对齐: action_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: String,          // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,
    pub actor: String,                // 操作人 / 触发方

    pub order_no: Option<String>,
    pub task_id: Option<i64>,
    pub resource_code: Option<String>,
    pub bin_code: Option<String>,

    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub detail: Option<String>,
}

impl ActionLog {
    /// 以新 action_id 创建日志
    pub fn new(action_type: ActionType, actor: &str, action_ts: NaiveDateTime) -> Self {
        Self {
            action_id: Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            action_ts,
            actor: actor.to_string(),
            order_no: None,
            task_id: None,
            resource_code: None,
            bin_code: None,
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_order(mut self, order_no: &str) -> Self {
        self.order_no = Some(order_no.to_string());
        self
    }

    pub fn with_task(mut self, task_id: i64) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn with_resource(mut self, resource_code: &str) -> Self {
        self.resource_code = Some(resource_code.to_string());
        self
    }

    pub fn with_bin(mut self, bin_code: &str) -> Self {
        self.bin_code = Some(bin_code.to_string());
        self
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateOrder,   // 建单拆分
    Allocate,      // 任务分配
    Confirm,       // 任务确认
    StockOut,      // 确认时缺货
    Restock,       // 储位补货
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateOrder => "CreateOrder",
            ActionType::Allocate => "Allocate",
            ActionType::Confirm => "Confirm",
            ActionType::StockOut => "StockOut",
            ActionType::Restock => "Restock",
        }
    }
}
