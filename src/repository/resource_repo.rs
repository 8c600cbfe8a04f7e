// ==========================================
// 仓库作业调度系统 - 作业资源数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: Available -> Busy 必须是单条原子 check-and-set
// ==========================================

use crate::domain::resource::Resource;
use crate::domain::types::{ResourceStatus, ResourceType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::invalid_column;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

const RESOURCE_COLUMNS: &str = "resource_code, resource_type, resource_name, status";

// ==========================================
// ResourceRepository - 资源仓储
// ==========================================
pub struct ResourceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ResourceRepository {
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

    fn map_row(row: &Row) -> rusqlite::Result<Resource> {
        let type_raw: String = row.get(1)?;
        let status_raw: String = row.get(3)?;
        Ok(Resource {
            resource_code: row.get(0)?,
            resource_type: ResourceType::from_str(&type_raw)
                .ok_or_else(|| invalid_column(1, format!("未知资源类型: {}", type_raw)))?,
            resource_name: row.get(2)?,
            status: ResourceStatus::from_str(&status_raw)
                .ok_or_else(|| invalid_column(3, format!("未知资源状态: {}", status_raw)))?,
        })
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按编码查询资源
    pub fn find_by_code(&self, resource_code: &str) -> RepositoryResult<Option<Resource>> {
        let conn = self.get_conn()?;
        Self::find_by_code_tx(&conn, resource_code)
    }

    /// 按编码查询资源（事务内）
    pub fn find_by_code_tx(conn: &Connection, resource_code: &str) -> RepositoryResult<Option<Resource>> {
        let sql = format!(
            "SELECT {} FROM resources WHERE resource_code = ?1",
            RESOURCE_COLUMNS
        );
        let resource = conn
            .query_row(&sql, params![resource_code], Self::map_row)
            .optional()?;
        Ok(resource)
    }

    /// 查询全部资源
    pub fn list_all(&self) -> RepositoryResult<Vec<Resource>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM resources ORDER BY id", RESOURCE_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let resources = stmt
            .query_map([], Self::map_row)?
            .collect::<rusqlite::Result<Vec<Resource>>>()?;
        Ok(resources)
    }

    /// 指定类型的可用资源快照（不做预留）
    pub fn list_available_by_type(
        &self,
        resource_type: ResourceType,
    ) -> RepositoryResult<Vec<Resource>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM resources WHERE resource_type = ?1 AND status = 'Available' ORDER BY id",
            RESOURCE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let resources = stmt
            .query_map(params![resource_type.to_db_str()], Self::map_row)?
            .collect::<rusqlite::Result<Vec<Resource>>>()?;
        Ok(resources)
    }

    /// 统计资源总数与 Busy 数
    pub fn count_total_and_busy(&self) -> RepositoryResult<(i64, i64)> {
        let conn = self.get_conn()?;
        let counts = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = 'Busy' THEN 1 ELSE 0 END), 0) FROM resources",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// Available -> Busy（原子 check-and-set）
    ///
    /// # 返回
    /// - true: 本次占用成功
    /// - false: 资源不存在或已被占用
    pub fn try_mark_busy(&self, resource_code: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        Self::try_mark_busy_on(&conn, resource_code)
    }

    /// 同上（事务内）
    pub fn try_mark_busy_tx(tx: &Transaction, resource_code: &str) -> RepositoryResult<bool> {
        Self::try_mark_busy_on(tx, resource_code)
    }

    fn try_mark_busy_on(conn: &Connection, resource_code: &str) -> RepositoryResult<bool> {
        let rows = conn.execute(
            "UPDATE resources SET status = 'Busy' WHERE resource_code = ?1 AND status = 'Available'",
            params![resource_code],
        )?;
        Ok(rows == 1)
    }

    /// -> Available（无条件，幂等）
    ///
    /// # 返回
    /// - true: 资源存在
    /// - false: 资源不存在
    pub fn mark_available(&self, resource_code: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        Self::mark_available_on(&conn, resource_code)
    }

    /// 同上（事务内）
    pub fn mark_available_tx(tx: &Transaction, resource_code: &str) -> RepositoryResult<bool> {
        Self::mark_available_on(tx, resource_code)
    }

    fn mark_available_on(conn: &Connection, resource_code: &str) -> RepositoryResult<bool> {
        let rows = conn.execute(
            "UPDATE resources SET status = 'Available' WHERE resource_code = ?1",
            params![resource_code],
        )?;
        Ok(rows == 1)
    }

    /// 插入资源（目录初始化用）
    pub fn insert_tx(tx: &Transaction, resource: &Resource) -> RepositoryResult<()> {
        tx.execute(
            "INSERT INTO resources (resource_code, resource_type, resource_name, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                resource.resource_code,
                resource.resource_type.to_db_str(),
                resource.resource_name,
                resource.status.to_db_str(),
            ],
        )?;
        Ok(())
    }

    /// 资源表行数
    pub fn count_tx(conn: &Connection) -> RepositoryResult<i64> {
        let count = conn.query_row("SELECT COUNT(*) FROM resources", [], |row| row.get(0))?;
        Ok(count)
    }
}
