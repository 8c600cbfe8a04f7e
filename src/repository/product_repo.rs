// ==========================================
// 仓库作业调度系统 - 产品主数据仓储
// ==========================================
// 参考数据: 启动时初始化, 之后只读
// ==========================================

use crate::domain::inventory::Product;
use crate::domain::types::StorageClass;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::invalid_column;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

pub struct ProductRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> rusqlite::Result<Product> {
        let storage_raw: String = row.get(2)?;
        Ok(Product {
            product_name: row.get(0)?,
            product_code: row.get(1)?,
            storage_class: StorageClass::from_str(&storage_raw)
                .ok_or_else(|| invalid_column(2, format!("未知存储类型: {}", storage_raw)))?,
            source_bin: row.get(3)?,
        })
    }

    /// 查询全部产品
    pub fn list_all(&self) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT product_name, product_code, storage_type, source_bin FROM products ORDER BY id",
        )?;
        let products = stmt
            .query_map([], Self::map_row)?
            .collect::<rusqlite::Result<Vec<Product>>>()?;
        Ok(products)
    }

    /// 按产品编码查询（事务内）
    pub fn find_by_code_tx(conn: &Connection, product_code: &str) -> RepositoryResult<Option<Product>> {
        let product = conn
            .query_row(
                "SELECT product_name, product_code, storage_type, source_bin FROM products WHERE product_code = ?1",
                params![product_code],
                Self::map_row,
            )
            .optional()?;
        Ok(product)
    }

    /// 插入产品（目录初始化用）
    pub fn insert_tx(tx: &Transaction, product: &Product) -> RepositoryResult<()> {
        tx.execute(
            "INSERT INTO products (product_name, product_code, storage_type, source_bin) VALUES (?1, ?2, ?3, ?4)",
            params![
                product.product_name,
                product.product_code,
                product.storage_class.to_db_str(),
                product.source_bin,
            ],
        )?;
        Ok(())
    }

    /// 产品表行数
    pub fn count_tx(conn: &Connection) -> RepositoryResult<i64> {
        let count = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count)
    }
}
