// ==========================================
// 仓库作业调度系统 - 订单受理与任务拆分
// ==========================================
// 职责: 建单 + 按订单行拆分拣货任务 + 序号生成
// 红线: 订单、任务、序号在同一 IMMEDIATE 事务中生成
// 序号: 订单 ORD100001 起; 任务全局 TSK1 起; 托盘 900129 起
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::inventory::Product;
use crate::domain::order::{task_defaults, Order, OrderLine, WarehouseTask};
use crate::domain::types::{OrderStatus, PriorityClass, TaskStatus};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::repositories::WarehouseRepositories;
use crate::repository::{
    ActionLogRepository, OrderRepository, ProductRepository, RepositoryError, TaskRepository,
};
use chrono::NaiveDateTime;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};

pub const ORDER_NO_PREFIX: &str = "ORD";
pub const TASK_NO_PREFIX: &str = "TSK";
pub const FIRST_ORDER_SEQ: i64 = 100001;
pub const FIRST_TASK_SEQ: i64 = 1;
pub const FIRST_PALLET_NO: i64 = 900129;

/// 演示拆分: 每单任务数范围
pub const DEMO_MAX_LINES: usize = 9;
/// 演示拆分: 可选数量
pub const DEMO_QUANTITIES: [i64; 9] = [100, 150, 200, 250, 300, 350, 400, 450, 500];

/// 建单结果
#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    pub order: Order,
    pub tasks: Vec<WarehouseTask>,
}

// ==========================================
// OrderIntake - 订单受理
// ==========================================
pub struct OrderIntake {
    repos: WarehouseRepositories,
}

impl OrderIntake {
    pub fn new(repos: WarehouseRepositories) -> Self {
        Self { repos }
    }

    /// 创建订单并拆分任务
    ///
    /// # 参数
    /// - `priority`: 订单优先级（必须是 P1..P5）
    /// - `lines`: 订单行（非空，数量为正，产品必须存在）
    /// - `now`: 创建时间
    ///
    /// # 错误
    /// - InvalidInput: 优先级非法 / 订单行为空 / 数量非正
    /// - NotFound: 产品不存在
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub fn create_order(
        &self,
        priority: PriorityClass,
        lines: &[OrderLine],
        now: NaiveDateTime,
    ) -> EngineResult<CreatedOrder> {
        if !priority.is_known() {
            return Err(EngineError::InvalidInput("优先级必须为 P1..P5".to_string()));
        }
        if lines.is_empty() {
            return Err(EngineError::InvalidInput("订单至少包含一个订单行".to_string()));
        }
        if let Some(line) = lines.iter().find(|l| l.quantity <= 0) {
            return Err(EngineError::InvalidInput(format!(
                "订单行数量必须为正数: product_code={}, quantity={}",
                line.product_code, line.quantity
            )));
        }

        let created = self.repos.in_transaction(|tx| {
            // ===== 序号生成（事务内读取种子） =====
            let order_no = next_order_no(OrderRepository::last_order_no_tx(tx)?.as_deref())?;
            let mut task_seq = TaskRepository::max_task_seq_tx(tx, TASK_NO_PREFIX)?
                .map(|max| max + 1)
                .unwrap_or(FIRST_TASK_SEQ);
            let mut pallet_no = next_pallet_no(TaskRepository::last_pallet_no_tx(tx)?.as_deref())?;

            let order_id = OrderRepository::insert_tx(tx, &order_no, priority, &now)?;

            let mut tasks = Vec::with_capacity(lines.len());
            for line in lines {
                let product = ProductRepository::find_by_code_tx(tx, &line.product_code)?
                    .ok_or_else(|| EngineError::not_found("Product", &line.product_code))?;

                let mut task = build_task(
                    &order_no,
                    &product,
                    line.quantity,
                    format!("{}{}", TASK_NO_PREFIX, task_seq),
                    pallet_no.to_string(),
                    now,
                );
                task.id = TaskRepository::insert_tx(tx, &task)?;
                tasks.push(task);

                task_seq += 1;
                pallet_no += 1;
            }

            let log = ActionLog::new(ActionType::CreateOrder, task_defaults::CREATED_BY, now)
                .with_order(&order_no)
                .with_payload(json!({
                    "priority": priority.to_db_str(),
                    "task_nos": tasks.iter().map(|t| t.task_no.as_str()).collect::<Vec<_>>(),
                }));
            ActionLogRepository::insert_tx(tx, &log)?;

            Ok::<_, EngineError>(CreatedOrder {
                order: Order {
                    id: order_id,
                    order_no,
                    priority,
                    created_at: now,
                    status: OrderStatus::Open,
                },
                tasks,
            })
        })?;

        info!(
            order_no = %created.order.order_no,
            priority = %priority,
            tasks = created.tasks.len(),
            "订单已创建"
        );
        Ok(created)
    }

    /// 用随机演示订单行建单
    pub fn create_demo_order<R: Rng + ?Sized>(
        &self,
        priority: PriorityClass,
        rng: &mut R,
        now: NaiveDateTime,
    ) -> EngineResult<CreatedOrder> {
        let products = self.repos.product_repo.list_all()?;
        if products.is_empty() {
            return Err(EngineError::InvalidInput(
                "产品主数据为空, 请先初始化参考数据".to_string(),
            ));
        }
        let lines = generate_demo_lines(&products, rng);
        self.create_order(priority, &lines, now)
    }
}

/// 由产品构造 OPEN 任务（id 由插入时回填）
fn build_task(
    order_no: &str,
    product: &Product,
    quantity: i64,
    task_no: String,
    pallet_hu: String,
    now: NaiveDateTime,
) -> WarehouseTask {
    WarehouseTask {
        id: 0,
        task_no,
        order_no: order_no.to_string(),
        product_name: product.product_name.clone(),
        product_code: product.product_code.clone(),
        storage_class: product.storage_class,
        source_qty: quantity,
        created_at: now,
        status: TaskStatus::Open,
        warehouse_process_type: task_defaults::WAREHOUSE_PROCESS_TYPE.to_string(),
        activity: task_defaults::ACTIVITY.to_string(),
        batch: task_defaults::BATCH.to_string(),
        created_by: task_defaults::CREATED_BY.to_string(),
        stock_type: task_defaults::STOCK_TYPE.to_string(),
        owner_wh: task_defaults::OWNER_WH.to_string(),
        uom: task_defaults::UOM.to_string(),
        pallet_hu,
        allocated_resource: None,
        confirmed_by: None,
        confirmed_at: None,
        destination_qty: None,
        source_bin: product.source_bin.clone(),
        dest_storage_type: task_defaults::DEST_STORAGE_TYPE.to_string(),
        dest_bin: product.storage_class.destination_bin().to_string(),
    }
}

// ==========================================
// 序号生成
// ==========================================

/// 下一个订单号: 最近订单号 + 1, 无历史时为 ORD100001
pub fn next_order_no(last: Option<&str>) -> EngineResult<String> {
    let seq = match last {
        None => FIRST_ORDER_SEQ,
        Some(raw) => parse_seq("order_no", raw, ORDER_NO_PREFIX)? + 1,
    };
    Ok(format!("{}{}", ORDER_NO_PREFIX, seq))
}

/// 下一个托盘号: 最近任务托盘号 + 1, 无历史时为 900129
pub fn next_pallet_no(last: Option<&str>) -> EngineResult<i64> {
    match last.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(FIRST_PALLET_NO),
        Some(raw) => Ok(parse_seq("pallet_hu", raw, "")? + 1),
    }
}

fn parse_seq(field: &str, raw: &str, prefix: &str) -> EngineResult<i64> {
    raw.trim()
        .strip_prefix(prefix)
        .and_then(|digits| digits.parse::<i64>().ok())
        .ok_or_else(|| {
            EngineError::Repository(RepositoryError::FieldValueError {
                field: field.to_string(),
                message: format!("无法解析序号: {}", raw),
            })
        })
}

// ==========================================
// 演示拆分
// ==========================================

/// 随机生成 1..=9 个订单行（产品可重复，数量取 100..500 的 50 倍数）
pub fn generate_demo_lines<R: Rng + ?Sized>(products: &[Product], rng: &mut R) -> Vec<OrderLine> {
    if products.is_empty() {
        return Vec::new();
    }

    let count = rng.random_range(1..=DEMO_MAX_LINES);
    (0..count)
        .filter_map(|_| {
            let product = products.choose(&mut *rng)?;
            let quantity = *DEMO_QUANTITIES.choose(&mut *rng)?;
            Some(OrderLine::new(product.product_code.clone(), quantity))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::StorageClass;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn setup_intake() -> OrderIntake {
        let mut conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        crate::seed::seed_catalog(&mut conn).unwrap();
        OrderIntake::new(WarehouseRepositories::new(Arc::new(Mutex::new(conn))))
    }

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_sequence_helpers() {
        assert_eq!(next_order_no(None).unwrap(), "ORD100001");
        assert_eq!(next_order_no(Some("ORD100041")).unwrap(), "ORD100042");
        assert!(next_order_no(Some("XYZ")).is_err());
        assert_eq!(next_pallet_no(None).unwrap(), 900129);
        assert_eq!(next_pallet_no(Some("")).unwrap(), 900129);
        assert_eq!(next_pallet_no(Some("900200")).unwrap(), 900201);
    }

    #[test]
    fn test_create_order_generates_sequences() {
        let intake = setup_intake();
        let first = intake
            .create_order(
                PriorityClass::P2,
                &[OrderLine::new("88013", 100), OrderLine::new("88019", 250)],
                now(),
            )
            .unwrap();

        assert_eq!(first.order.order_no, "ORD100001");
        assert_eq!(first.order.status, OrderStatus::Open);
        assert_eq!(first.tasks.len(), 2);
        assert_eq!(first.tasks[0].task_no, "TSK1");
        assert_eq!(first.tasks[1].task_no, "TSK2");
        assert_eq!(first.tasks[0].pallet_hu, "900129");
        assert_eq!(first.tasks[1].pallet_hu, "900130");
        assert_eq!(first.tasks[1].storage_class, StorageClass::ST03);
        assert_eq!(first.tasks[1].source_bin, "ST03-0001");
        assert_eq!(first.tasks[1].dest_bin, "GIZN-003");

        let second = intake
            .create_order(PriorityClass::P1, &[OrderLine::new("88016", 50)], now())
            .unwrap();
        assert_eq!(second.order.order_no, "ORD100002");
        assert_eq!(second.tasks[0].task_no, "TSK3");
        assert_eq!(second.tasks[0].pallet_hu, "900131");
    }

    #[test]
    fn test_create_order_validation_is_atomic() {
        let intake = setup_intake();

        assert!(matches!(
            intake.create_order(PriorityClass::Unknown, &[OrderLine::new("88013", 1)], now()),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            intake.create_order(PriorityClass::P1, &[], now()),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            intake.create_order(PriorityClass::P1, &[OrderLine::new("88013", 0)], now()),
            Err(EngineError::InvalidInput(_))
        ));
        // 第二行产品不存在: 整单回滚
        assert!(matches!(
            intake.create_order(
                PriorityClass::P1,
                &[OrderLine::new("88013", 10), OrderLine::new("00000", 10)],
                now()
            ),
            Err(EngineError::NotFound { .. })
        ));

        let created = intake
            .create_order(PriorityClass::P3, &[OrderLine::new("88013", 10)], now())
            .unwrap();
        assert_eq!(created.order.order_no, "ORD100001");
        assert_eq!(created.tasks[0].task_no, "TSK1");
    }

    #[test]
    fn test_demo_lines_shape() {
        let intake = setup_intake();
        let products = intake.repos.product_repo.list_all().unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let lines = generate_demo_lines(&products, &mut rng);
            assert!((1..=DEMO_MAX_LINES).contains(&lines.len()));
            for line in &lines {
                assert!(DEMO_QUANTITIES.contains(&line.quantity));
                assert!(products.iter().any(|p| p.product_code == line.product_code));
            }
        }
        assert!(generate_demo_lines(&[], &mut rng).is_empty());
    }

    #[test]
    fn test_create_demo_order() {
        let intake = setup_intake();
        let mut rng = StdRng::seed_from_u64(42);
        let created = intake
            .create_demo_order(PriorityClass::P4, &mut rng, now())
            .unwrap();
        assert!(!created.tasks.is_empty());
        assert!(created.tasks.iter().all(|t| t.status == TaskStatus::Open));
    }
}
