// ==========================================
// 仓库作业调度系统 - 储位库存管理
// ==========================================
// 职责: 原子检查并扣减 / 补货 (按容量截断)
// 红线: 扣减为单条 check-and-subtract, 不足时不做任何修改
// 红线: 0 <= current_qty <= capacity
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::inventory::StorageBin;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::repositories::WarehouseRepositories;
use crate::repository::{ActionLogRepository, StorageBinRepository};
use chrono::NaiveDateTime;
use rusqlite::{Connection, Transaction};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};

/// 扣减结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeductOutcome {
    /// 已扣减，附扣减后余量
    Deducted { remaining: i64 },
    /// 库存不足，附当前库存
    InsufficientStock { available: i64 },
}

/// 补货结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestockOutcome {
    pub bin_code: String,
    pub before_qty: i64,
    pub after_qty: i64,
    pub capacity: i64,
}

// ==========================================
// BinInventoryManager
// ==========================================
pub struct BinInventoryManager {
    repos: WarehouseRepositories,
}

impl BinInventoryManager {
    pub fn new(repos: WarehouseRepositories) -> Self {
        Self { repos }
    }

    /// 原子检查并扣减
    ///
    /// # 错误
    /// - InvalidInput: quantity <= 0
    /// - NotFound: 储位不存在
    pub fn check_and_deduct(&self, bin_code: &str, quantity: i64) -> EngineResult<DeductOutcome> {
        self.repos
            .in_transaction(|tx| Self::check_and_deduct_tx(tx, bin_code, quantity))
    }

    /// 同上（事务内，供确认引擎组合）
    pub fn check_and_deduct_tx(
        tx: &Transaction,
        bin_code: &str,
        quantity: i64,
    ) -> EngineResult<DeductOutcome> {
        if quantity <= 0 {
            return Err(EngineError::InvalidInput(format!(
                "扣减数量必须为正数: {}",
                quantity
            )));
        }

        if StorageBinRepository::try_deduct_tx(tx, bin_code, quantity)? {
            let bin = Self::load_bin(tx, bin_code)?;
            return Ok(DeductOutcome::Deducted {
                remaining: bin.current_qty,
            });
        }

        // 条件未满足: 区分储位不存在与库存不足
        let bin = Self::load_bin(tx, bin_code)?;
        Ok(DeductOutcome::InsufficientStock {
            available: bin.current_qty,
        })
    }

    /// 补货: current = min(capacity, current + amount)
    ///
    /// # 参数
    /// - `bin_code`: 储位编码
    /// - `amount`: 补货量（>= 0）
    /// - `actor`: 操作人（写入操作日志）
    /// - `now`: 操作时间
    #[instrument(skip(self, now))]
    pub fn restock(
        &self,
        bin_code: &str,
        amount: i64,
        actor: &str,
        now: NaiveDateTime,
    ) -> EngineResult<RestockOutcome> {
        if amount < 0 {
            return Err(EngineError::InvalidInput(format!(
                "补货数量不能为负: {}",
                amount
            )));
        }

        let outcome = self.repos.in_transaction(|tx| {
            let before = Self::load_bin(tx, bin_code)?;
            StorageBinRepository::restock_clamped_tx(tx, bin_code, amount)?;
            let after = Self::load_bin(tx, bin_code)?;

            let log = ActionLog::new(ActionType::Restock, actor, now)
                .with_bin(bin_code)
                .with_payload(json!({
                    "amount": amount,
                    "before_qty": before.current_qty,
                    "after_qty": after.current_qty,
                    "capacity": after.capacity,
                }));
            ActionLogRepository::insert_tx(tx, &log)?;

            Ok::<_, EngineError>(RestockOutcome {
                bin_code: bin_code.to_string(),
                before_qty: before.current_qty,
                after_qty: after.current_qty,
                capacity: after.capacity,
            })
        })?;

        info!(
            bin_code,
            before_qty = outcome.before_qty,
            after_qty = outcome.after_qty,
            capacity = outcome.capacity,
            "储位补货完成"
        );
        Ok(outcome)
    }

    /// 查询储位（不存在即 NotFound）
    pub fn get_bin(&self, bin_code: &str) -> EngineResult<StorageBin> {
        self.repos
            .bin_repo
            .find_by_code(bin_code)?
            .ok_or_else(|| EngineError::not_found("StorageBin", bin_code))
    }

    fn load_bin(conn: &Connection, bin_code: &str) -> EngineResult<StorageBin> {
        StorageBinRepository::find_by_code_tx(conn, bin_code)?
            .ok_or_else(|| EngineError::not_found("StorageBin", bin_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::{Arc, Mutex};

    fn setup_manager(bins: &[(&str, i64, i64)]) -> BinInventoryManager {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        {
            let tx = conn.transaction().unwrap();
            for (code, capacity, current) in bins {
                StorageBinRepository::insert_tx(
                    &tx,
                    &StorageBin {
                        bin_code: code.to_string(),
                        capacity: *capacity,
                        current_qty: *current,
                    },
                )
                .unwrap();
            }
            tx.commit().unwrap();
        }
        BinInventoryManager::new(WarehouseRepositories::new(Arc::new(Mutex::new(conn))))
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_deduct_success_and_exact_drain() {
        let manager = setup_manager(&[("B1", 1000, 1000)]);
        assert_eq!(
            manager.check_and_deduct("B1", 400).unwrap(),
            DeductOutcome::Deducted { remaining: 600 }
        );
        assert_eq!(
            manager.check_and_deduct("B1", 600).unwrap(),
            DeductOutcome::Deducted { remaining: 0 }
        );
    }

    #[test]
    fn test_insufficient_leaves_quantity_untouched() {
        let manager = setup_manager(&[("B1", 1000, 1000)]);
        assert_eq!(
            manager.check_and_deduct("B1", 1200).unwrap(),
            DeductOutcome::InsufficientStock { available: 1000 }
        );
        assert_eq!(manager.get_bin("B1").unwrap().current_qty, 1000);
    }

    #[test]
    fn test_deduct_rejects_non_positive_and_missing_bin() {
        let manager = setup_manager(&[("B1", 1000, 1000)]);
        assert!(matches!(
            manager.check_and_deduct("B1", 0),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            manager.check_and_deduct("B9", 10),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn test_restock_clamps_to_capacity() {
        let manager = setup_manager(&[("B1", 1000, 800)]);
        let outcome = manager.restock("B1", 500, "tester", now()).unwrap();
        assert_eq!(outcome.before_qty, 800);
        assert_eq!(outcome.after_qty, 1000);
        assert_eq!(manager.get_bin("B1").unwrap().current_qty, 1000);
    }

    #[test]
    fn test_restock_missing_bin_and_negative_amount() {
        let manager = setup_manager(&[("B1", 1000, 800)]);
        assert!(matches!(
            manager.restock("B9", 100, "tester", now()),
            Err(EngineError::NotFound { .. })
        ));
        assert!(matches!(
            manager.restock("B1", -1, "tester", now()),
            Err(EngineError::InvalidInput(_))
        ));
        assert_eq!(manager.get_bin("B1").unwrap().current_qty, 800);
    }
}
