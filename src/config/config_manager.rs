// ==========================================
// 仓库作业调度系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::domain::types::PriorityClass;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 参数
    /// - key: 配置键
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(RepositoryError::ValidationError("配置键不能为空".to_string()));
        }

        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    fn get_f64_or(&self, key: &str, default: f64) -> RepositoryResult<f64> {
        let value = self.get_config_or_default(key, &default.to_string())?;
        Ok(value.trim().parse::<f64>().unwrap_or_else(|_| {
            tracing::warn!(config_key = key, raw_value = %value, "配置值不是数字，使用默认值");
            default
        }))
    }

    fn get_i64_or(&self, key: &str, default: i64) -> RepositoryResult<i64> {
        let value = self.get_config_or_default(key, &default.to_string())?;
        Ok(value.trim().parse::<i64>().unwrap_or_else(|_| {
            tracing::warn!(config_key = key, raw_value = %value, "配置值不是整数，使用默认值");
            default
        }))
    }

    /// 读取按优先级的权重表 (JSON: {"P1": 10000, ...})
    ///
    /// 缺失的优先级沿用默认表，格式错误时整体使用默认表
    fn get_class_weights<T>(
        &self,
        key: &str,
        defaults: &HashMap<PriorityClass, T>,
    ) -> RepositoryResult<HashMap<PriorityClass, T>>
    where
        T: Copy + for<'de> Deserialize<'de>,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(defaults.clone()),
        };

        let parsed: HashMap<String, T> = match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(_) => {
                tracing::warn!(config_key = key, raw_value = %raw, "权重表配置格式错误，使用默认值");
                return Ok(defaults.clone());
            }
        };

        let mut weights = defaults.clone();
        for (class_raw, weight) in parsed {
            let class = PriorityClass::from_str(&class_raw);
            if class.is_known() {
                weights.insert(class, weight);
            }
        }
        Ok(weights)
    }

    // ===== 优先级打分配置 =====

    /// 获取打分配置（分配排序 + 展示排名）
    pub fn get_scoring_config(&self) -> RepositoryResult<ScoringConfig> {
        let defaults = ScoringConfig::default();

        Ok(ScoringConfig {
            base_weights: self
                .get_class_weights(config_keys::PRIORITY_BASE_WEIGHTS, &defaults.base_weights)?,
            unknown_weight: self
                .get_f64_or(config_keys::PRIORITY_UNKNOWN_WEIGHT, defaults.unknown_weight)?,
            aging_weight_per_minute: self.get_f64_or(
                config_keys::AGING_WEIGHT_PER_MINUTE,
                defaults.aging_weight_per_minute,
            )?,
            display_rank_weights: self.get_class_weights(
                config_keys::DISPLAY_RANK_WEIGHTS,
                &defaults.display_rank_weights,
            )?,
            display_rank_unknown_weight: self.get_i64_or(
                config_keys::DISPLAY_RANK_UNKNOWN_WEIGHT,
                defaults.display_rank_unknown_weight,
            )?,
            display_rank_class_factor: self.get_i64_or(
                config_keys::DISPLAY_RANK_CLASS_FACTOR,
                defaults.display_rank_class_factor,
            )?,
            display_rank_open_task_factor: self.get_i64_or(
                config_keys::DISPLAY_RANK_OPEN_TASK_FACTOR,
                defaults.display_rank_open_task_factor,
            )?,
        })
    }

    // ===== 补货配置 =====

    /// 获取默认补货量（默认 500）
    pub fn get_restock_amount(&self) -> RepositoryResult<i64> {
        let amount = self.get_i64_or(config_keys::RESTOCK_AMOUNT, DEFAULT_RESTOCK_AMOUNT)?;
        if amount < 0 {
            tracing::warn!(amount, "补货量为负，使用默认值");
            return Ok(DEFAULT_RESTOCK_AMOUNT);
        }
        Ok(amount)
    }
}

/// 默认补货量
pub const DEFAULT_RESTOCK_AMOUNT: i64 = 500;

// ==========================================
// ScoringConfig - 打分配置
// ==========================================
// 分配排序与展示排名使用两套独立权重表，互不推导
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    // ===== 分配排序 =====
    pub base_weights: HashMap<PriorityClass, f64>,
    pub unknown_weight: f64,
    pub aging_weight_per_minute: f64,

    // ===== 展示排名 =====
    pub display_rank_weights: HashMap<PriorityClass, i64>,
    pub display_rank_unknown_weight: i64,
    pub display_rank_class_factor: i64,
    pub display_rank_open_task_factor: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let base_weights = [
            (PriorityClass::P1, 10000.0),
            (PriorityClass::P2, 400.0),
            (PriorityClass::P3, 300.0),
            (PriorityClass::P4, 200.0),
            (PriorityClass::P5, 100.0),
        ]
        .into_iter()
        .collect();

        let display_rank_weights = [
            (PriorityClass::P1, 1),
            (PriorityClass::P2, 2),
            (PriorityClass::P3, 3),
            (PriorityClass::P4, 4),
            (PriorityClass::P5, 5),
        ]
        .into_iter()
        .collect();

        Self {
            base_weights,
            unknown_weight: 0.0,
            aging_weight_per_minute: 1.0,
            display_rank_weights,
            display_rank_unknown_weight: 5,
            display_rank_class_factor: 1000,
            display_rank_open_task_factor: 10,
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 分配排序
    pub const PRIORITY_BASE_WEIGHTS: &str = "priority_base_weights"; // JSON
    pub const PRIORITY_UNKNOWN_WEIGHT: &str = "priority_unknown_weight";
    pub const AGING_WEIGHT_PER_MINUTE: &str = "aging_weight_per_minute";

    // 展示排名
    pub const DISPLAY_RANK_WEIGHTS: &str = "display_rank_weights"; // JSON
    pub const DISPLAY_RANK_UNKNOWN_WEIGHT: &str = "display_rank_unknown_weight";
    pub const DISPLAY_RANK_CLASS_FACTOR: &str = "display_rank_class_factor";
    pub const DISPLAY_RANK_OPEN_TASK_FACTOR: &str = "display_rank_open_task_factor";

    // 补货
    pub const RESTOCK_AMOUNT: &str = "restock_amount";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_absent() {
        let manager = setup_manager();
        let config = manager.get_scoring_config().unwrap();

        assert_eq!(config, ScoringConfig::default());
        assert_eq!(config.base_weights[&PriorityClass::P1], 10000.0);
        assert_eq!(config.display_rank_weights[&PriorityClass::P5], 5);
        assert_eq!(manager.get_restock_amount().unwrap(), 500);
    }

    #[test]
    fn test_partial_weight_override() {
        let manager = setup_manager();
        manager
            .set_global_config_value(config_keys::PRIORITY_BASE_WEIGHTS, r#"{"P2": 5000, "X9": 1}"#)
            .unwrap();
        manager
            .set_global_config_value(config_keys::AGING_WEIGHT_PER_MINUTE, "2.5")
            .unwrap();

        let config = manager.get_scoring_config().unwrap();
        assert_eq!(config.base_weights[&PriorityClass::P2], 5000.0);
        assert_eq!(config.base_weights[&PriorityClass::P1], 10000.0);
        assert!(!config.base_weights.contains_key(&PriorityClass::Unknown));
        assert_eq!(config.aging_weight_per_minute, 2.5);
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let manager = setup_manager();
        manager
            .set_global_config_value(config_keys::DISPLAY_RANK_WEIGHTS, "not json")
            .unwrap();
        manager
            .set_global_config_value(config_keys::RESTOCK_AMOUNT, "abc")
            .unwrap();

        let config = manager.get_scoring_config().unwrap();
        assert_eq!(config.display_rank_weights, ScoringConfig::default().display_rank_weights);
        assert_eq!(manager.get_restock_amount().unwrap(), DEFAULT_RESTOCK_AMOUNT);
    }

    #[test]
    fn test_upsert_overwrites() {
        let manager = setup_manager();
        manager.set_global_config_value(config_keys::RESTOCK_AMOUNT, "200").unwrap();
        manager.set_global_config_value(config_keys::RESTOCK_AMOUNT, "300").unwrap();

        assert_eq!(manager.get_restock_amount().unwrap(), 300);
        assert_eq!(
            manager.get_global_config_value(config_keys::RESTOCK_AMOUNT).unwrap(),
            Some("300".to_string())
        );
        assert!(manager.set_global_config_value("  ", "1").is_err());
    }
}
