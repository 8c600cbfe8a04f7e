// ==========================================
// 仓库作业调度系统 - 参考数据初始化
// ==========================================
// 职责: 资源池 / 产品主数据 / 储位 的一次性初始化
// 约束: 按表幂等 (表非空则跳过该表)
// ==========================================

use crate::domain::inventory::{Product, StorageBin};
use crate::domain::resource::Resource;
use crate::domain::types::{ResourceStatus, ResourceType, StorageClass};
use crate::repository::{ProductRepository, RepositoryResult, ResourceRepository, StorageBinRepository};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use tracing::info;

/// 储位初始容量
pub const SEED_BIN_CAPACITY: i64 = 1500;
/// 储位初始库存
pub const SEED_BIN_QTY: i64 = 1000;

const SEED_RESOURCES: [(&str, ResourceType); 22] = [
    ("RSG01", ResourceType::RT01),
    ("RSG02", ResourceType::RT01),
    ("RSG03", ResourceType::RT01),
    ("RSG04", ResourceType::RT01),
    ("RSG05", ResourceType::RT01),
    ("RSG06", ResourceType::RT01),
    ("RSG07", ResourceType::RT01),
    ("RSG08", ResourceType::RT01),
    ("RSG09", ResourceType::RT01),
    ("RSG10", ResourceType::RT01),
    ("RSG11", ResourceType::RT02),
    ("RSG12", ResourceType::RT02),
    ("RSG13", ResourceType::RT02),
    ("RSG14", ResourceType::RT02),
    ("RSG15", ResourceType::RT02),
    ("RSG16", ResourceType::RT02),
    ("RSG17", ResourceType::RT03),
    ("RSG18", ResourceType::RT03),
    ("RSG19", ResourceType::RT03),
    ("RSG20", ResourceType::RT03),
    ("RSG21", ResourceType::RT03),
    ("RSG22", ResourceType::RT03),
];

// (名称, 产品编码, 存储类型, 拣货储位)
const SEED_PRODUCTS: [(&str, &str, StorageClass, &str); 9] = [
    ("Soap1", "88013", StorageClass::ST01, "ST01-0001"),
    ("Soap2", "88014", StorageClass::ST01, "ST01-0002"),
    ("Soap3", "88015", StorageClass::ST01, "ST01-0003"),
    ("Soap4", "88016", StorageClass::ST02, "ST02-0001"),
    ("Soap5", "88017", StorageClass::ST02, "ST02-0002"),
    ("Soap6", "88018", StorageClass::ST02, "ST02-0003"),
    ("Soap8", "88019", StorageClass::ST03, "ST03-0001"),
    ("Soap9", "88020", StorageClass::ST03, "ST03-0002"),
    ("Soap10", "88021", StorageClass::ST03, "ST03-0003"),
];

const SEED_BINS: [&str; 16] = [
    "ST01-0001", "ST01-0002", "ST01-0003", "ST01-0004",
    "ST02-0001", "ST02-0002", "ST02-0003", "ST02-0004",
    "ST03-0001", "ST03-0002", "ST03-0003", "ST03-0004",
    "ST03-0005", "ST03-0006", "ST03-0007", "ST03-0008",
];

/// 本次初始化写入的行数（0 表示该表已有数据）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub resources: usize,
    pub products: usize,
    pub bins: usize,
}

/// 初始化参考数据（单事务）
pub fn seed_catalog(conn: &mut Connection) -> RepositoryResult<SeedSummary> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut summary = SeedSummary::default();

    if ResourceRepository::count_tx(&tx)? == 0 {
        for (code, resource_type) in SEED_RESOURCES {
            ResourceRepository::insert_tx(
                &tx,
                &Resource {
                    resource_code: code.to_string(),
                    resource_type,
                    resource_name: resource_type.display_name().to_string(),
                    status: ResourceStatus::Available,
                },
            )?;
        }
        summary.resources = SEED_RESOURCES.len();
    }

    if ProductRepository::count_tx(&tx)? == 0 {
        for (name, code, storage_class, source_bin) in SEED_PRODUCTS {
            ProductRepository::insert_tx(
                &tx,
                &Product {
                    product_name: name.to_string(),
                    product_code: code.to_string(),
                    storage_class,
                    source_bin: source_bin.to_string(),
                },
            )?;
        }
        summary.products = SEED_PRODUCTS.len();
    }

    if StorageBinRepository::count_tx(&tx)? == 0 {
        for bin_code in SEED_BINS {
            StorageBinRepository::insert_tx(
                &tx,
                &StorageBin {
                    bin_code: bin_code.to_string(),
                    capacity: SEED_BIN_CAPACITY,
                    current_qty: SEED_BIN_QTY,
                },
            )?;
        }
        summary.bins = SEED_BINS.len();
    }

    tx.commit()?;

    info!(
        resources = summary.resources,
        products = summary.products,
        bins = summary.bins,
        "参考数据初始化完成"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();

        let first = seed_catalog(&mut conn).unwrap();
        assert_eq!(first, SeedSummary { resources: 22, products: 9, bins: 16 });

        let second = seed_catalog(&mut conn).unwrap();
        assert_eq!(second, SeedSummary::default());

        assert_eq!(ResourceRepository::count_tx(&conn).unwrap(), 22);
        assert_eq!(StorageBinRepository::count_tx(&conn).unwrap(), 16);
    }

    #[test]
    fn test_every_product_bin_exists() {
        for (_, _, storage_class, source_bin) in SEED_PRODUCTS {
            assert!(SEED_BINS.contains(&source_bin));
            assert!(source_bin.starts_with(storage_class.to_db_str()));
        }
    }
}
