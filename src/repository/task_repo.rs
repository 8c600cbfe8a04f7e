// ==========================================
// 仓库作业调度系统 - 任务数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 状态推进一律使用条件更新 (WHERE status = 旧状态)
// ==========================================

use crate::db::{format_datetime, parse_datetime};
use crate::domain::order::{Order, WarehouseTask};
use crate::domain::types::{OrderStatus, PriorityClass, StorageClass, TaskStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::invalid_column;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

const TASK_COLUMNS: &str = r#"
    t.id, t.task_no, t.order_no, t.product_name, t.product_code, t.storage_type,
    t.source_qty, t.created_at, t.status, t.warehouse_process_type, t.activity,
    t.batch, t.created_by, t.stock_type, t.owner_wh, t.uom, t.pallet_hu,
    t.allocated_resource, t.confirmed_by, t.confirmed_at, t.destination_qty,
    t.source_bin, t.dest_storage_type, t.dest_bin
"#;

/// 任务列数（联表查询时订单列的起始下标）
const TASK_COLUMN_COUNT: usize = 24;

// ==========================================
// TaskRepository - 任务仓储
// ==========================================
pub struct TaskRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TaskRepository {
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

    fn map_row(row: &Row) -> rusqlite::Result<WarehouseTask> {
        let storage_raw: String = row.get(5)?;
        let created_raw: String = row.get(7)?;
        let status_raw: String = row.get(8)?;
        let confirmed_raw: Option<String> = row.get(19)?;

        Ok(WarehouseTask {
            id: row.get(0)?,
            task_no: row.get(1)?,
            order_no: row.get(2)?,
            product_name: row.get(3)?,
            product_code: row.get(4)?,
            storage_class: StorageClass::from_str(&storage_raw)
                .ok_or_else(|| invalid_column(5, format!("未知存储类型: {}", storage_raw)))?,
            source_qty: row.get(6)?,
            created_at: parse_datetime(7, &created_raw)?,
            status: TaskStatus::from_str(&status_raw)
                .ok_or_else(|| invalid_column(8, format!("未知任务状态: {}", status_raw)))?,
            warehouse_process_type: row.get(9)?,
            activity: row.get(10)?,
            batch: row.get(11)?,
            created_by: row.get(12)?,
            stock_type: row.get(13)?,
            owner_wh: row.get(14)?,
            uom: row.get(15)?,
            pallet_hu: row.get(16)?,
            allocated_resource: row.get(17)?,
            confirmed_by: row.get(18)?,
            confirmed_at: confirmed_raw
                .as_deref()
                .map(|raw| parse_datetime(19, raw))
                .transpose()?,
            destination_qty: row.get(20)?,
            source_bin: row.get(21)?,
            dest_storage_type: row.get(22)?,
            dest_bin: row.get(23)?,
        })
    }

    fn map_order_columns(row: &Row, base: usize) -> rusqlite::Result<Order> {
        let priority_raw: String = row.get(base + 2)?;
        let created_raw: String = row.get(base + 3)?;
        let status_raw: String = row.get(base + 4)?;
        Ok(Order {
            id: row.get(base)?,
            order_no: row.get(base + 1)?,
            priority: PriorityClass::from_str(&priority_raw),
            created_at: parse_datetime(base + 3, &created_raw)?,
            status: OrderStatus::from_str(&status_raw)
                .ok_or_else(|| invalid_column(base + 4, format!("未知订单状态: {}", status_raw)))?,
        })
    }

    fn query_tasks(
        conn: &Connection,
        where_clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> RepositoryResult<Vec<WarehouseTask>> {
        let sql = format!(
            "SELECT {} FROM tasks t {} ORDER BY t.id",
            TASK_COLUMNS, where_clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params, Self::map_row)?
            .collect::<rusqlite::Result<Vec<WarehouseTask>>>()?;
        Ok(tasks)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 id 查询任务
    pub fn find_by_id(&self, task_id: i64) -> RepositoryResult<Option<WarehouseTask>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, task_id)
    }

    /// 按 id 查询任务（事务内）
    pub fn find_by_id_tx(conn: &Connection, task_id: i64) -> RepositoryResult<Option<WarehouseTask>> {
        let sql = format!("SELECT {} FROM tasks t WHERE t.id = ?1", TASK_COLUMNS);
        let task = conn
            .query_row(&sql, params![task_id], Self::map_row)
            .optional()?;
        Ok(task)
    }

    /// 查询全部任务
    pub fn list_all(&self) -> RepositoryResult<Vec<WarehouseTask>> {
        let conn = self.get_conn()?;
        Self::query_tasks(&conn, "", &[])
    }

    /// 查询订单下全部任务
    pub fn list_by_order(&self, order_no: &str) -> RepositoryResult<Vec<WarehouseTask>> {
        let conn = self.get_conn()?;
        Self::query_tasks(&conn, "WHERE t.order_no = ?1", &[&order_no])
    }

    /// 按状态查询任务
    pub fn list_by_status(&self, status: TaskStatus) -> RepositoryResult<Vec<WarehouseTask>> {
        let conn = self.get_conn()?;
        Self::query_tasks(&conn, "WHERE t.status = ?1", &[&status.to_db_str()])
    }

    /// 查询资源执行过的任务（新任务在前）
    pub fn list_by_resource(&self, resource_code: &str) -> RepositoryResult<Vec<WarehouseTask>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM tasks t WHERE t.allocated_resource = ?1 ORDER BY t.id DESC",
            TASK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![resource_code], Self::map_row)?
            .collect::<rusqlite::Result<Vec<WarehouseTask>>>()?;
        Ok(tasks)
    }

    /// 资源当前持有的 ALLOCATED 任务
    pub fn find_allocated_by_resource(
        &self,
        resource_code: &str,
    ) -> RepositoryResult<Option<WarehouseTask>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM tasks t WHERE t.allocated_resource = ?1 AND t.status = 'ALLOCATED' ORDER BY t.id LIMIT 1",
            TASK_COLUMNS
        );
        let task = conn
            .query_row(&sql, params![resource_code], Self::map_row)
            .optional()?;
        Ok(task)
    }

    /// 查询全部 OPEN 任务及其所属订单（分配快照）
    pub fn list_open_with_orders(&self) -> RepositoryResult<Vec<(WarehouseTask, Order)>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {}, o.id, o.order_no, o.priority, o.created_at, o.status
            FROM tasks t
            JOIN orders o ON o.order_no = t.order_no
            WHERE t.status = 'OPEN'
            ORDER BY o.id, t.id
            "#,
            TASK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                let task = Self::map_row(row)?;
                let order = Self::map_order_columns(row, TASK_COLUMN_COUNT)?;
                Ok((task, order))
            })?
            .collect::<rusqlite::Result<Vec<(WarehouseTask, Order)>>>()?;
        Ok(rows)
    }

    /// 按状态统计任务数
    pub fn count_by_status(&self, status: TaskStatus) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE status = ?1",
            params![status.to_db_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 每个订单下指定状态的任务数
    pub fn count_by_order_and_status(
        &self,
        status: TaskStatus,
    ) -> RepositoryResult<Vec<(String, i64)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT order_no, COUNT(*) FROM tasks WHERE status = ?1 GROUP BY order_no",
        )?;
        let rows = stmt
            .query_map(params![status.to_db_str()], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<(String, i64)>>>()?;
        Ok(rows)
    }

    /// 序号生成种子: 最大任务序号
    pub fn max_task_seq_tx(conn: &Connection, prefix: &str) -> RepositoryResult<Option<i64>> {
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(CAST(SUBSTR(task_no, ?1) AS INTEGER)) FROM tasks WHERE task_no LIKE ?2",
            params![prefix.len() as i64 + 1, format!("{}%", prefix)],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    /// 序号生成种子: 最近任务的托盘号
    pub fn last_pallet_no_tx(conn: &Connection) -> RepositoryResult<Option<String>> {
        let pallet = conn
            .query_row(
                "SELECT pallet_hu FROM tasks ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(pallet)
    }

    // ==========================================
    // 写入操作（事务内）
    // ==========================================

    /// 插入任务，返回自增 id（task.id 被忽略）
    pub fn insert_tx(tx: &Transaction, task: &WarehouseTask) -> RepositoryResult<i64> {
        tx.execute(
            r#"
            INSERT INTO tasks (
                task_no, order_no, product_name, product_code, storage_type,
                source_qty, created_at, status, warehouse_process_type, activity,
                batch, created_by, stock_type, owner_wh, uom, pallet_hu,
                allocated_resource, confirmed_by, confirmed_at, destination_qty,
                source_bin, dest_storage_type, dest_bin
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23
            )
            "#,
            params![
                task.task_no,
                task.order_no,
                task.product_name,
                task.product_code,
                task.storage_class.to_db_str(),
                task.source_qty,
                format_datetime(&task.created_at),
                task.status.to_db_str(),
                task.warehouse_process_type,
                task.activity,
                task.batch,
                task.created_by,
                task.stock_type,
                task.owner_wh,
                task.uom,
                task.pallet_hu,
                task.allocated_resource,
                task.confirmed_by,
                task.confirmed_at.as_ref().map(format_datetime),
                task.destination_qty,
                task.source_bin,
                task.dest_storage_type,
                task.dest_bin,
            ],
        )?;
        Ok(tx.last_insert_rowid())
    }

    /// OPEN -> ALLOCATED（条件更新）
    ///
    /// # 返回
    /// - true: 本事务完成分配
    /// - false: 任务已被其他分配轮次处理
    pub fn mark_allocated_tx(
        tx: &Transaction,
        task_id: i64,
        resource_code: &str,
    ) -> RepositoryResult<bool> {
        let rows = tx.execute(
            r#"
            UPDATE tasks SET status = 'ALLOCATED', allocated_resource = ?2
            WHERE id = ?1 AND status = 'OPEN'
            "#,
            params![task_id, resource_code],
        )?;
        Ok(rows == 1)
    }

    /// ALLOCATED -> CONFIRMED（条件更新，同时写入确认信息）
    ///
    /// # 返回
    /// - true: 本事务完成确认
    /// - false: 任务已不处于 ALLOCATED
    pub fn mark_confirmed_tx(
        tx: &Transaction,
        task_id: i64,
        confirmed_by: &str,
        confirmed_at: &NaiveDateTime,
        destination_qty: i64,
    ) -> RepositoryResult<bool> {
        let rows = tx.execute(
            r#"
            UPDATE tasks
            SET status = 'CONFIRMED', confirmed_by = ?2, confirmed_at = ?3, destination_qty = ?4
            WHERE id = ?1 AND status = 'ALLOCATED'
            "#,
            params![task_id, confirmed_by, format_datetime(confirmed_at), destination_qty],
        )?;
        Ok(rows == 1)
    }
}
