// ==========================================
// 仓库作业调度系统 - 储位库存数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 扣减必须是单条原子 check-and-subtract, 禁止先读后写
// ==========================================

use crate::domain::inventory::StorageBin;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

// ==========================================
// StorageBinRepository - 储位仓储
// ==========================================
pub struct StorageBinRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StorageBinRepository {
    /// 从共享连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> rusqlite::Result<StorageBin> {
        Ok(StorageBin {
            bin_code: row.get(0)?,
            capacity: row.get(1)?,
            current_qty: row.get(2)?,
        })
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按编码查询储位
    pub fn find_by_code(&self, bin_code: &str) -> RepositoryResult<Option<StorageBin>> {
        let conn = self.get_conn()?;
        Self::find_by_code_tx(&conn, bin_code)
    }

    /// 按编码查询储位（事务内）
    pub fn find_by_code_tx(conn: &Connection, bin_code: &str) -> RepositoryResult<Option<StorageBin>> {
        let bin = conn
            .query_row(
                "SELECT bin_code, capacity, current_qty FROM storage_bins WHERE bin_code = ?1",
                params![bin_code],
                Self::map_row,
            )
            .optional()?;
        Ok(bin)
    }

    /// 查询全部储位
    pub fn list_all(&self) -> RepositoryResult<Vec<StorageBin>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT bin_code, capacity, current_qty FROM storage_bins ORDER BY id")?;
        let bins = stmt
            .query_map([], Self::map_row)?
            .collect::<rusqlite::Result<Vec<StorageBin>>>()?;
        Ok(bins)
    }

    // ==========================================
    // 写入操作（事务内）
    // ==========================================

    /// 条件扣减: current_qty >= quantity 时扣减（事务内）
    ///
    /// # 返回
    /// - true: 已扣减
    /// - false: 储位不存在或库存不足（未做任何修改）
    pub fn try_deduct_tx(tx: &Transaction, bin_code: &str, quantity: i64) -> RepositoryResult<bool> {
        let rows = tx.execute(
            r#"
            UPDATE storage_bins SET current_qty = current_qty - ?2
            WHERE bin_code = ?1 AND current_qty >= ?2
            "#,
            params![bin_code, quantity],
        )?;
        Ok(rows == 1)
    }

    /// 补货: current_qty = MIN(capacity, current_qty + amount)（事务内）
    ///
    /// # 返回
    /// - true: 储位存在并已更新
    /// - false: 储位不存在
    pub fn restock_clamped_tx(tx: &Transaction, bin_code: &str, amount: i64) -> RepositoryResult<bool> {
        let rows = tx.execute(
            "UPDATE storage_bins SET current_qty = MIN(capacity, current_qty + ?2) WHERE bin_code = ?1",
            params![bin_code, amount],
        )?;
        Ok(rows == 1)
    }

    /// 插入储位（目录初始化用）
    pub fn insert_tx(tx: &Transaction, bin: &StorageBin) -> RepositoryResult<()> {
        tx.execute(
            "INSERT INTO storage_bins (bin_code, capacity, current_qty) VALUES (?1, ?2, ?3)",
            params![bin.bin_code, bin.capacity, bin.current_qty],
        )?;
        Ok(())
    }

    /// 储位表行数
    pub fn count_tx(conn: &Connection) -> RepositoryResult<i64> {
        let count = conn.query_row("SELECT COUNT(*) FROM storage_bins", [], |row| row.get(0))?;
        Ok(count)
    }
}
