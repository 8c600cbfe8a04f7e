use super::core::ActionLogRepository;
use crate::db::parse_datetime;
use crate::domain::action_log::ActionLog;
use crate::repository::error::RepositoryResult;
use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};

const ACTION_LOG_COLUMNS: &str = r#"
    action_id, action_type, action_ts, actor,
    order_no, task_id, resource_code, bin_code,
    payload_json, detail
"#;

impl ActionLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 action_id 查询单个日志
    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE action_id = ?",
            ACTION_LOG_COLUMNS
        );
        let log = conn
            .query_row(&sql, params![action_id], Self::map_row)
            .optional()?;
        Ok(log)
    }

    /// 查询任务相关的操作日志（时间正序）
    pub fn find_by_task_id(&self, task_id: i64) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE task_id = ? ORDER BY action_ts, rowid",
            ACTION_LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![task_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 查询指定操作类型的日志（时间正序）
    pub fn find_by_action_type(&self, action_type: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE action_type = ? ORDER BY action_ts, rowid",
            ACTION_LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![action_type], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 查询最近的操作日志
    pub fn find_recent(&self, limit: i64) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log ORDER BY action_ts DESC, rowid DESC LIMIT ?",
            ACTION_LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![limit], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 映射数据库行到ActionLog实体
    fn map_row(row: &Row) -> SqliteResult<ActionLog> {
        let ts_raw: String = row.get(2)?;
        let payload_raw: Option<String> = row.get(8)?;

        Ok(ActionLog {
            action_id: row.get(0)?,
            action_type: row.get(1)?,
            action_ts: parse_datetime(2, &ts_raw)?,
            actor: row.get(3)?,
            order_no: row.get(4)?,
            task_id: row.get(5)?,
            resource_code: row.get(6)?,
            bin_code: row.get(7)?,
            // 非法 JSON 视为缺失，不阻断审计查询
            payload_json: payload_raw.and_then(|s| serde_json::from_str(&s).ok()),
            detail: row.get(9)?,
        })
    }
}
