// ==========================================
// 仓库作业调度系统 - 订单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: *_tx 系列函数供引擎在同一事务内组合调用
// ==========================================

use crate::db::{format_datetime, parse_datetime};
use crate::domain::order::Order;
use crate::domain::types::{OrderStatus, PriorityClass};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::invalid_column;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

const ORDER_COLUMNS: &str = "id, order_no, priority, created_at, status";

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
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

    fn map_row(row: &Row) -> rusqlite::Result<Order> {
        let priority_raw: String = row.get(2)?;
        let created_raw: String = row.get(3)?;
        let status_raw: String = row.get(4)?;

        Ok(Order {
            id: row.get(0)?,
            order_no: row.get(1)?,
            priority: PriorityClass::from_str(&priority_raw),
            created_at: parse_datetime(3, &created_raw)?,
            status: OrderStatus::from_str(&status_raw)
                .ok_or_else(|| invalid_column(4, format!("未知订单状态: {}", status_raw)))?,
        })
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按订单号查询
    pub fn find_by_no(&self, order_no: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;
        Self::find_by_no_tx(&conn, order_no)
    }

    /// 按订单号查询（事务内）
    pub fn find_by_no_tx(conn: &Connection, order_no: &str) -> RepositoryResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE order_no = ?1", ORDER_COLUMNS);
        let order = conn
            .query_row(&sql, params![order_no], Self::map_row)
            .optional()?;
        Ok(order)
    }

    /// 查询全部订单（按创建序号升序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM orders ORDER BY id", ORDER_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map([], Self::map_row)?
            .collect::<rusqlite::Result<Vec<Order>>>()?;
        Ok(orders)
    }

    /// 按状态查询订单
    pub fn list_by_status(&self, status: OrderStatus) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM orders WHERE status = ?1 ORDER BY id",
            ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map(params![status.to_db_str()], Self::map_row)?
            .collect::<rusqlite::Result<Vec<Order>>>()?;
        Ok(orders)
    }

    /// 按状态统计订单数
    pub fn count_by_status(&self, status: OrderStatus) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM orders WHERE status = ?1",
            params![status.to_db_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 最近创建的订单号（序号生成种子）
    pub fn last_order_no_tx(conn: &Connection) -> RepositoryResult<Option<String>> {
        let order_no = conn
            .query_row(
                "SELECT order_no FROM orders ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(order_no)
    }

    // ==========================================
    // 写入操作（事务内）
    // ==========================================

    /// 插入订单，返回自增 id
    pub fn insert_tx(
        tx: &Transaction,
        order_no: &str,
        priority: PriorityClass,
        created_at: &NaiveDateTime,
    ) -> RepositoryResult<i64> {
        tx.execute(
            "INSERT INTO orders (order_no, priority, created_at, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                order_no,
                priority.to_db_str(),
                format_datetime(created_at),
                OrderStatus::Open.to_db_str(),
            ],
        )?;
        Ok(tx.last_insert_rowid())
    }

    /// OPEN -> ALLOCATED（条件更新，不会回退 CONFIRMED）
    ///
    /// # 返回
    /// 受影响行数（0 表示订单已不处于 OPEN）
    pub fn advance_to_allocated_tx(tx: &Transaction, order_no: &str) -> RepositoryResult<usize> {
        let rows = tx.execute(
            "UPDATE orders SET status = 'ALLOCATED' WHERE order_no = ?1 AND status = 'OPEN'",
            params![order_no],
        )?;
        Ok(rows)
    }

    /// 全部子任务已确认时置为 CONFIRMED
    ///
    /// 单条语句读取兄弟任务快照并更新，可重复执行
    ///
    /// # 返回
    /// - true: 本次或此前已为 CONFIRMED
    pub fn confirm_if_all_tasks_confirmed_tx(
        tx: &Transaction,
        order_no: &str,
    ) -> RepositoryResult<bool> {
        tx.execute(
            r#"
            UPDATE orders SET status = 'CONFIRMED'
            WHERE order_no = ?1
              AND EXISTS (SELECT 1 FROM tasks WHERE order_no = ?1)
              AND NOT EXISTS (
                  SELECT 1 FROM tasks WHERE order_no = ?1 AND status != 'CONFIRMED'
              )
            "#,
            params![order_no],
        )?;

        let status: String = tx.query_row(
            "SELECT status FROM orders WHERE order_no = ?1",
            params![order_no],
            |row| row.get(0),
        )?;
        Ok(status == OrderStatus::Confirmed.to_db_str())
    }
}
