// ==========================================
// 仓库作业调度系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::WarehouseApi;
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::{DurationEstimator, HeuristicEstimator, TableEstimator, WarehouseRepositories};
use crate::seed::{seed_catalog, SeedSummary};

/// 作业时长表路径（CSV: resource_code,hour,minutes）
pub const DURATION_TABLE_ENV: &str = "WAREHOUSE_ALLOC_DURATION_TABLE";

/// 数据库路径覆盖
pub const DB_PATH_ENV: &str = "WAREHOUSE_ALLOC_DB";

/// 时长表缺项时的默认分钟数
const TABLE_DEFAULT_MINUTES: f64 = 15.0;

/// 应用状态
///
/// 包含API实例和共享资源，由 CLI 或宿主程序持有
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 仓储集合
    pub repos: WarehouseRepositories,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 仓库作业API
    pub warehouse_api: Arc<WarehouseApi>,

    /// 本次启动写入的参考数据行数
    pub seed_summary: SeedSummary,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并幂等建表
    /// 2. 初始化参考数据（资源 / 产品 / 储位）
    /// 3. 创建Repository、估算器与API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let mut conn =
            open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;

        let seed_summary =
            seed_catalog(&mut conn).map_err(|e| format!("参考数据初始化失败: {}", e))?;
        if seed_summary != SeedSummary::default() {
            tracing::info!(
                resources = seed_summary.resources,
                products = seed_summary.products,
                bins = seed_summary.bins,
                "参考数据已初始化"
            );
        }

        let conn = Arc::new(Mutex::new(conn));
        let repos = WarehouseRepositories::new(conn.clone());

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let estimator = build_estimator(&repos)?;

        let warehouse_api = Arc::new(WarehouseApi::new(
            repos.clone(),
            config_manager.clone(),
            estimator,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            repos,
            config_manager,
            warehouse_api,
            seed_summary,
        })
    }
}

/// 选择作业时长估算器
///
/// 设置了时长表环境变量时加载 CSV 表，否则按资源池构建启发式估算器
fn build_estimator(repos: &WarehouseRepositories) -> Result<Arc<dyn DurationEstimator>, String> {
    if let Ok(path) = std::env::var(DURATION_TABLE_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            let table = TableEstimator::from_csv_path(trimmed, TABLE_DEFAULT_MINUTES)
                .map_err(|e| format!("无法加载作业时长表 {}: {}", trimmed, e))?;
            tracing::info!("使用作业时长表: {}", trimmed);
            return Ok(Arc::new(table));
        }
    }

    let resources = repos
        .resource_repo
        .list_all()
        .map_err(|e| format!("无法读取资源池: {}", e))?;
    Ok(Arc::new(HeuristicEstimator::from_resources(&resources)))
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./warehouse_alloc.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("warehouse-alloc");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("warehouse_alloc.db");
        }
    }

    path.to_string_lossy().to_string()
}
