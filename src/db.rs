// ==========================================
// 仓库作业调度系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 幂等建表 (init_schema)
// ==========================================

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 时间戳存储格式
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 幂等建表
///
/// 说明：
/// - storage_bins 的 CHECK 约束是库存红线的最后一道防线
/// - 所有表均 IF NOT EXISTS，可在每次启动时调用
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_no TEXT NOT NULL UNIQUE,
            priority TEXT NOT NULL,
            created_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'OPEN'
        );

        CREATE TABLE IF NOT EXISTS resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            resource_code TEXT NOT NULL UNIQUE,
            resource_type TEXT NOT NULL,
            resource_name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Available'
        );

        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_name TEXT NOT NULL,
            product_code TEXT NOT NULL UNIQUE,
            storage_type TEXT NOT NULL,
            source_bin TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS storage_bins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bin_code TEXT NOT NULL UNIQUE,
            capacity INTEGER NOT NULL DEFAULT 1000,
            current_qty INTEGER NOT NULL DEFAULT 1000,
            CHECK (current_qty >= 0 AND current_qty <= capacity)
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            task_no TEXT NOT NULL UNIQUE,
            order_no TEXT NOT NULL REFERENCES orders(order_no),
            product_name TEXT NOT NULL,
            product_code TEXT NOT NULL,
            storage_type TEXT NOT NULL,
            source_qty INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'OPEN',
            warehouse_process_type TEXT NOT NULL,
            activity TEXT NOT NULL,
            batch TEXT NOT NULL,
            created_by TEXT NOT NULL,
            stock_type TEXT NOT NULL,
            owner_wh TEXT NOT NULL,
            uom TEXT NOT NULL,
            pallet_hu TEXT NOT NULL,
            allocated_resource TEXT,
            confirmed_by TEXT,
            confirmed_at TEXT,
            destination_qty INTEGER,
            source_bin TEXT NOT NULL,
            dest_storage_type TEXT NOT NULL,
            dest_bin TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
        CREATE INDEX IF NOT EXISTS idx_tasks_order_no ON tasks(order_no);
        CREATE INDEX IF NOT EXISTS idx_tasks_allocated_resource ON tasks(allocated_resource);

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            action_type TEXT NOT NULL,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            order_no TEXT,
            task_id INTEGER,
            resource_code TEXT,
            bin_code TEXT,
            payload_json TEXT,
            detail TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_action_log_ts ON action_log(action_ts);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 时间戳格式化（存储用）
pub fn format_datetime(ts: &NaiveDateTime) -> String {
    ts.format(DATETIME_FMT).to_string()
}

/// 时间戳解析（读取用），失败时转为 rusqlite 类型转换错误
pub fn parse_datetime(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FMT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
