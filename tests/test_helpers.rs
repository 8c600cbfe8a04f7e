// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、仓储/引擎组装等功能
// ==========================================
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

use warehouse_alloc::db::{init_schema, open_sqlite_connection};
use warehouse_alloc::domain::inventory::StorageBin;
use warehouse_alloc::domain::types::{ResourceStatus, TaskStatus};
use warehouse_alloc::engine::{
    AllocationEngine, PriorityScorer, TableEstimator, WarehouseRepositories,
};
use warehouse_alloc::repository::{RepositoryError, StorageBinRepository};
use warehouse_alloc::seed::seed_catalog;

/// 创建临时测试数据库并初始化 schema 与参考数据
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_string_lossy().to_string();

    let mut conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;
    seed_catalog(&mut conn)?;

    Ok((temp_file, db_path))
}

/// 基于数据库文件打开独立连接的仓储集合
pub fn open_repos(db_path: &str) -> WarehouseRepositories {
    let conn = open_sqlite_connection(db_path).unwrap();
    WarehouseRepositories::new(Arc::new(Mutex::new(conn)))
}

/// 固定时长表的分配引擎（所有资源 10 分钟，可按资源覆盖）
pub fn allocation_engine(repos: &WarehouseRepositories, overrides: &[(&str, f64)]) -> AllocationEngine {
    let mut estimator = TableEstimator::new(10.0);
    for (code, minutes) in overrides {
        estimator = estimator.with_entry(code, *minutes);
    }
    AllocationEngine::new(repos.clone(), PriorityScorer::default(), Arc::new(estimator))
}

/// 测试基准时间（周一上午）
pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

/// 插入自定义储位
pub fn insert_bin(repos: &WarehouseRepositories, bin_code: &str, capacity: i64, current_qty: i64) {
    let bin = StorageBin {
        bin_code: bin_code.to_string(),
        capacity,
        current_qty,
    };
    repos
        .in_transaction::<_, RepositoryError, _>(|tx| StorageBinRepository::insert_tx(tx, &bin))
        .unwrap();
}

/// 将指定类型资源全部占用，仅保留 keep
pub fn occupy_all_except(repos: &WarehouseRepositories, codes: std::ops::RangeInclusive<u32>, keep: &str) {
    for n in codes {
        let code = format!("RSG{:02}", n);
        if code != keep {
            assert!(repos.resource_repo.try_mark_busy(&code).unwrap());
        }
    }
}

/// 校验: 资源 Busy 当且仅当恰有一个 ALLOCATED 任务引用它
pub fn assert_busy_iff_allocated(repos: &WarehouseRepositories) {
    let allocated = repos.task_repo.list_by_status(TaskStatus::Allocated).unwrap();
    for resource in repos.resource_repo.list_all().unwrap() {
        let holders = allocated
            .iter()
            .filter(|t| t.allocated_resource.as_deref() == Some(resource.resource_code.as_str()))
            .count();
        match resource.status {
            ResourceStatus::Busy => assert_eq!(
                holders, 1,
                "Busy 资源 {} 应恰有一个 ALLOCATED 任务",
                resource.resource_code
            ),
            ResourceStatus::Available => assert_eq!(
                holders, 0,
                "Available 资源 {} 不应有 ALLOCATED 任务",
                resource.resource_code
            ),
        }
    }
}
