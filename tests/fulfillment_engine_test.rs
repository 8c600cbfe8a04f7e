// ==========================================
// 履约确认引擎集成测试
// ==========================================
// 职责: 验证确认结算、缺货保持、订单级联与补货截断
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod fulfillment_engine_test {
    use chrono::Duration;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use warehouse_alloc::domain::order::OrderLine;
    use warehouse_alloc::domain::types::{OrderStatus, PriorityClass, ResourceStatus, TaskStatus};
    use warehouse_alloc::engine::{
        BinInventoryManager, CreatedOrder, DeductOutcome, EngineError, FulfillmentEngine,
        OrderIntake, WarehouseRepositories,
    };

    use crate::test_helpers::{
        allocation_engine, assert_busy_iff_allocated, base_time, create_test_db, insert_bin,
        open_repos,
    };

    // ==========================================
    // 测试辅助函数
    // ==========================================

    /// 建单并执行一轮分配
    fn create_and_allocate(repos: &WarehouseRepositories, lines: &[OrderLine]) -> CreatedOrder {
        let created = OrderIntake::new(repos.clone())
            .create_order(PriorityClass::P2, lines, base_time())
            .unwrap();
        let report = allocation_engine(repos, &[]).run_sweep(base_time()).unwrap();
        assert_eq!(report.allocated_count(), lines.len());
        created
    }

    // ==========================================
    // 测试1: 正常确认
    // ==========================================

    #[test]
    fn test_confirm_settles_inventory_and_releases_resource() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = open_repos(&db_path);
        let created = create_and_allocate(&repos, &[OrderLine::new("88013", 300)]);
        let task_id = created.tasks[0].id;

        let engine = FulfillmentEngine::new(repos.clone());
        let confirmed_at = base_time() + Duration::minutes(12);
        let outcome = engine.confirm(task_id, confirmed_at).unwrap();

        assert_eq!(outcome.resource_code, "RSG01");
        assert_eq!(outcome.bin_code, "ST01-0001");
        assert_eq!(outcome.quantity, 300);
        assert_eq!(outcome.remaining_qty, 700);
        assert_eq!(outcome.order_status, OrderStatus::Confirmed);

        let task = repos.task_repo.find_by_id(task_id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Confirmed);
        assert_eq!(task.confirmed_by.as_deref(), Some("RSG01"));
        assert_eq!(task.confirmed_at, Some(confirmed_at));
        assert_eq!(task.destination_qty, Some(300));

        let resource = repos.resource_repo.find_by_code("RSG01").unwrap().unwrap();
        assert_eq!(resource.status, ResourceStatus::Available);

        let logs = repos.action_log_repo.find_by_task_id(task_id).unwrap();
        let types: Vec<&str> = logs.iter().map(|l| l.action_type.as_str()).collect();
        assert_eq!(types, vec!["Allocate", "Confirm"]);
        assert_busy_iff_allocated(&repos);
    }

    // ==========================================
    // 测试2: 缺货时任务保持 ALLOCATED，补货后可重试
    // ==========================================

    #[test]
    fn test_stock_out_keeps_allocation_until_restock() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = open_repos(&db_path);
        let created = create_and_allocate(&repos, &[OrderLine::new("88016", 1200)]);
        let task_id = created.tasks[0].id;
        let resource_code = created_resource(&repos, task_id);
        let order_no = created.order.order_no.clone();
        let order_before = repos.order_repo.find_by_no(&order_no).unwrap().unwrap();
        assert_eq!(order_before.status, OrderStatus::Allocated);

        let engine = FulfillmentEngine::new(repos.clone());
        let err = engine.confirm(task_id, base_time()).unwrap_err();
        match err {
            EngineError::InsufficientInventory {
                ref bin_code,
                requested,
                available,
            } => {
                assert_eq!(bin_code, "ST02-0001");
                assert_eq!(requested, 1200);
                assert_eq!(available, 1000);
            }
            ref other => panic!("预期 InsufficientInventory, 实际: {:?}", other),
        }
        assert!(err.is_retryable());

        // 无任何部分写入
        let bin = repos.bin_repo.find_by_code("ST02-0001").unwrap().unwrap();
        assert_eq!(bin.current_qty, 1000);
        let task = repos.task_repo.find_by_id(task_id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Allocated);
        assert!(task.confirmed_at.is_none());
        let resource = repos.resource_repo.find_by_code(&resource_code).unwrap().unwrap();
        assert_eq!(resource.status, ResourceStatus::Busy);
        let order_after = repos.order_repo.find_by_no(&order_no).unwrap().unwrap();
        assert_eq!(order_after.status, order_before.status);
        assert_busy_iff_allocated(&repos);

        let stock_outs = repos.action_log_repo.find_by_action_type("StockOut").unwrap();
        assert_eq!(stock_outs.len(), 1);
        assert_eq!(stock_outs[0].task_id, Some(task_id));
        assert!(repos.action_log_repo.find_by_action_type("Confirm").unwrap().is_empty());

        // 补货至容量后重试
        let inventory = BinInventoryManager::new(repos.clone());
        let restock = inventory.restock("ST02-0001", 500, "OPERATOR", base_time()).unwrap();
        assert_eq!(restock.after_qty, 1500);

        let outcome = engine
            .confirm(task_id, base_time() + Duration::minutes(5))
            .unwrap();
        assert_eq!(outcome.remaining_qty, 300);
        assert_eq!(outcome.order_status, OrderStatus::Confirmed);
    }

    fn created_resource(repos: &WarehouseRepositories, task_id: i64) -> String {
        repos
            .task_repo
            .find_by_id(task_id)
            .unwrap()
            .unwrap()
            .allocated_resource
            .unwrap()
    }

    // ==========================================
    // 测试3: 订单在最后一个任务确认后才完成（确认顺序任意）
    // ==========================================

    #[test]
    fn test_order_confirmed_after_last_task() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = open_repos(&db_path);
        let created = create_and_allocate(
            &repos,
            &[
                OrderLine::new("88013", 100),
                OrderLine::new("88014", 100),
                OrderLine::new("88015", 100),
            ],
        );
        let order_no = created.order.order_no.clone();
        let engine = FulfillmentEngine::new(repos.clone());

        // 逆序确认
        for (step, task) in created.tasks.iter().rev().enumerate() {
            let outcome = engine
                .confirm(task.id, base_time() + Duration::minutes(step as i64 + 1))
                .unwrap();
            let order = repos.order_repo.find_by_no(&order_no).unwrap().unwrap();

            if step < 2 {
                assert_eq!(outcome.order_status, OrderStatus::Allocated);
                assert_eq!(order.status, OrderStatus::Allocated);
            } else {
                assert_eq!(outcome.order_status, OrderStatus::Confirmed);
                assert_eq!(order.status, OrderStatus::Confirmed);
            }
        }

        let tasks = repos.task_repo.list_by_order(&order_no).unwrap();
        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|t| t.status == TaskStatus::Confirmed));
    }

    #[test]
    fn test_order_cascade_with_stock_out_first() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = open_repos(&db_path);
        let created = create_and_allocate(
            &repos,
            &[
                OrderLine::new("88013", 100),
                OrderLine::new("88014", 100),
                OrderLine::new("88016", 1200),
            ],
        );
        let order_no = created.order.order_no.clone();
        let engine = FulfillmentEngine::new(repos.clone());
        let order_status =
            || repos.order_repo.find_by_no(&order_no).unwrap().unwrap().status;

        // 第三个任务缺货，其余两个先确认
        let err = engine.confirm(created.tasks[2].id, base_time()).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientInventory { .. }));
        assert_eq!(order_status(), OrderStatus::Allocated);

        engine.confirm(created.tasks[1].id, base_time()).unwrap();
        assert_eq!(order_status(), OrderStatus::Allocated);
        engine.confirm(created.tasks[0].id, base_time()).unwrap();
        assert_eq!(order_status(), OrderStatus::Allocated);

        BinInventoryManager::new(repos.clone())
            .restock("ST02-0001", 500, "OPERATOR", base_time())
            .unwrap();
        let outcome = engine
            .confirm(created.tasks[2].id, base_time() + Duration::minutes(3))
            .unwrap();
        assert_eq!(outcome.order_status, OrderStatus::Confirmed);
        assert_eq!(order_status(), OrderStatus::Confirmed);
        assert_busy_iff_allocated(&repos);
    }

    // ==========================================
    // 测试4: 非 ALLOCATED 任务不可确认
    // ==========================================

    #[test]
    fn test_confirm_rejects_open_missing_and_repeated_tasks() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = open_repos(&db_path);
        let engine = FulfillmentEngine::new(repos.clone());

        let open = OrderIntake::new(repos.clone())
            .create_order(PriorityClass::P3, &[OrderLine::new("88019", 100)], base_time())
            .unwrap();
        let err = engine.confirm(open.tasks[0].id, base_time()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));

        let err = engine.confirm(9999, base_time()).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        allocation_engine(&repos, &[]).run_sweep(base_time()).unwrap();
        engine.confirm(open.tasks[0].id, base_time()).unwrap();
        let err = engine.confirm(open.tasks[0].id, base_time()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));

        // 只扣减一次
        let bin = repos.bin_repo.find_by_code("ST03-0001").unwrap().unwrap();
        assert_eq!(bin.current_qty, 900);
    }

    // ==========================================
    // 测试5: 释放的资源在下一轮可再分配
    // ==========================================

    #[test]
    fn test_released_resource_is_reallocated_next_sweep() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = open_repos(&db_path);
        let intake = OrderIntake::new(repos.clone());

        // 7 个 RT02 任务，6 个 RT02 资源
        let lines: Vec<OrderLine> = (0..7).map(|_| OrderLine::new("88017", 50)).collect();
        let created = intake.create_order(PriorityClass::P1, &lines, base_time()).unwrap();

        let allocator = allocation_engine(&repos, &[]);
        assert_eq!(allocator.run_sweep(base_time()).unwrap().allocated_count(), 6);

        let freed = created_resource(&repos, created.tasks[0].id);
        FulfillmentEngine::new(repos.clone())
            .confirm(created.tasks[0].id, base_time())
            .unwrap();

        let report = allocator.run_sweep(base_time() + Duration::minutes(1)).unwrap();
        assert_eq!(report.allocated_count(), 1);
        assert_eq!(report.allocated[0].task_id, created.tasks[6].id);
        assert_eq!(report.allocated[0].resource_code, freed);
        assert_busy_iff_allocated(&repos);
    }

    // ==========================================
    // 测试6: 补货按容量截断
    // ==========================================

    #[test]
    fn test_restock_clamps_to_capacity() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = open_repos(&db_path);
        insert_bin(&repos, "B1", 1000, 800);

        let inventory = BinInventoryManager::new(repos.clone());
        let outcome = inventory.restock("B1", 500, "OPERATOR", base_time()).unwrap();
        assert_eq!(outcome.before_qty, 800);
        assert_eq!(outcome.after_qty, 1000);
        assert_eq!(inventory.get_bin("B1").unwrap().current_qty, 1000);

        let logs = repos.action_log_repo.find_by_action_type("Restock").unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].bin_code.as_deref(), Some("B1"));

        assert!(matches!(
            inventory.restock("B1", -1, "OPERATOR", base_time()),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            inventory.restock("NOPE", 10, "OPERATOR", base_time()),
            Err(EngineError::NotFound { .. })
        ));
    }

    // ==========================================
    // 测试7: 随机扣减/补货序列下库存始终在 [0, capacity]
    // ==========================================

    #[test]
    fn test_bin_quantity_stays_within_bounds() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = open_repos(&db_path);
        insert_bin(&repos, "B2", 1000, 500);

        let inventory = BinInventoryManager::new(repos.clone());
        let mut rng = StdRng::seed_from_u64(2024);
        let mut expected = 500_i64;

        for step in 0..200 {
            let amount = rng.random_range(1..=400);
            if rng.random_bool(0.5) {
                match inventory.check_and_deduct("B2", amount).unwrap() {
                    DeductOutcome::Deducted { remaining } => {
                        assert!(expected >= amount, "step {}: 超量扣减", step);
                        expected -= amount;
                        assert_eq!(remaining, expected);
                    }
                    DeductOutcome::InsufficientStock { available } => {
                        assert!(expected < amount, "step {}: 误判缺货", step);
                        assert_eq!(available, expected);
                    }
                }
            } else {
                let outcome = inventory.restock("B2", amount, "OPERATOR", base_time()).unwrap();
                expected = (expected + amount).min(1000);
                assert_eq!(outcome.after_qty, expected);
            }

            let bin = inventory.get_bin("B2").unwrap();
            assert!(
                (0..=bin.capacity).contains(&bin.current_qty),
                "step {}: current_qty={} 越界",
                step,
                bin.current_qty
            );
            assert_eq!(bin.current_qty, expected);
        }
    }
}
