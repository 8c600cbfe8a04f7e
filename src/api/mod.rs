// ==========================================
// 仓库作业调度系统 - API 层
// ==========================================
// 职责: 提供进程内业务 API 接口, 供 CLI / 宿主程序调用
// ==========================================

pub mod dto;
pub mod error;
pub mod warehouse_api;

// 重导出核心类型
pub use dto::{
    CurrentTaskDto, DashboardDto, OrderSummaryDto, ResourceDetailDto, ResourceStatusDto,
    TaskHistoryDto, TaskViewDto,
};
pub use error::{ApiError, ApiResult};
pub use warehouse_api::WarehouseApi;
