// ==========================================
// 分配引擎集成测试
// ==========================================
// 职责: 验证优先级排序、老化、资源选择与轮次幂等
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod allocation_engine_test {
    use chrono::Duration;
    use warehouse_alloc::domain::order::OrderLine;
    use warehouse_alloc::domain::types::{OrderStatus, PriorityClass, ResourceStatus, TaskStatus};
    use warehouse_alloc::engine::OrderIntake;

    use crate::test_helpers::{
        allocation_engine, assert_busy_iff_allocated, base_time, create_test_db,
        occupy_all_except, open_repos,
    };

    // ==========================================
    // 测试1: 高优先级抢占唯一资源
    // ==========================================

    #[test]
    fn test_higher_priority_takes_scarce_resource() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = open_repos(&db_path);
        let intake = OrderIntake::new(repos.clone());
        occupy_all_except(&repos, 1..=10, "RSG03");

        let t0 = base_time();
        let low = intake
            .create_order(PriorityClass::P5, &[OrderLine::new("88013", 100)], t0)
            .unwrap();
        let high = intake
            .create_order(PriorityClass::P1, &[OrderLine::new("88014", 100)], t0)
            .unwrap();

        let engine = allocation_engine(&repos, &[]);
        let report = engine.run_sweep(t0 + Duration::minutes(1)).unwrap();

        assert_eq!(report.considered, 2);
        assert_eq!(report.allocated_count(), 1);
        assert_eq!(report.allocated[0].order_no, high.order.order_no);
        assert_eq!(report.allocated[0].resource_code, "RSG03");
        assert_eq!(report.skipped_no_resource, 1);
        assert_eq!(report.remaining_open(), 1);

        let low_task = repos.task_repo.find_by_id(low.tasks[0].id).unwrap().unwrap();
        assert_eq!(low_task.status, TaskStatus::Open);
        assert!(low_task.allocated_resource.is_none());

        let high_order = repos.order_repo.find_by_no(&high.order.order_no).unwrap().unwrap();
        let low_order = repos.order_repo.find_by_no(&low.order.order_no).unwrap().unwrap();
        assert_eq!(high_order.status, OrderStatus::Allocated);
        assert_eq!(low_order.status, OrderStatus::Open);
    }

    // ==========================================
    // 测试2: 老化使低优先级订单最终胜出
    // ==========================================

    #[test]
    fn test_aging_lets_old_low_priority_win() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = open_repos(&db_path);
        let intake = OrderIntake::new(repos.clone());
        occupy_all_except(&repos, 11..=16, "RSG12");

        let now = base_time();
        // P5: 100 + 150 = 250 > P4: 200 + 0
        let old_p5 = intake
            .create_order(
                PriorityClass::P5,
                &[OrderLine::new("88016", 100)],
                now - Duration::minutes(150),
            )
            .unwrap();
        intake
            .create_order(PriorityClass::P4, &[OrderLine::new("88017", 100)], now)
            .unwrap();

        let engine = allocation_engine(&repos, &[]);
        let report = engine.run_sweep(now).unwrap();

        assert_eq!(report.allocated_count(), 1);
        assert_eq!(report.allocated[0].order_no, old_p5.order.order_no);
        assert_eq!(report.allocated[0].score, 250.0);
    }

    // ==========================================
    // 测试3: 选择预计时长最短的资源
    // ==========================================

    #[test]
    fn test_sweep_selects_fastest_compatible_resource() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = open_repos(&db_path);
        let intake = OrderIntake::new(repos.clone());
        let t0 = base_time();

        let created = intake
            .create_order(PriorityClass::P2, &[OrderLine::new("88019", 100)], t0)
            .unwrap();

        // RSG05 更快但类型不兼容 (RT01)
        let engine = allocation_engine(&repos, &[("RSG05", 1.0), ("RSG20", 4.0), ("RSG18", 6.0)]);
        let report = engine.run_sweep(t0).unwrap();

        assert_eq!(report.allocated_count(), 1);
        let assignment = &report.allocated[0];
        assert_eq!(assignment.task_id, created.tasks[0].id);
        assert_eq!(assignment.resource_code, "RSG20");
        assert_eq!(assignment.estimated_minutes, 4.0);

        let resource = repos.resource_repo.find_by_code("RSG20").unwrap().unwrap();
        assert_eq!(resource.status, ResourceStatus::Busy);
        assert_busy_iff_allocated(&repos);
    }

    // ==========================================
    // 测试4: 多任务订单在一轮内分配到不同资源
    // ==========================================

    #[test]
    fn test_multi_task_order_gets_distinct_resources() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = open_repos(&db_path);
        let intake = OrderIntake::new(repos.clone());
        let t0 = base_time();

        let created = intake
            .create_order(
                PriorityClass::P3,
                &[
                    OrderLine::new("88013", 100),
                    OrderLine::new("88014", 150),
                    OrderLine::new("88016", 200),
                    OrderLine::new("88020", 250),
                ],
                t0,
            )
            .unwrap();
        assert_eq!(created.tasks.len(), 4);

        let engine = allocation_engine(&repos, &[]);
        let report = engine.run_sweep(t0).unwrap();
        assert_eq!(report.allocated_count(), 4);

        let mut codes: Vec<&str> = report
            .allocated
            .iter()
            .map(|a| a.resource_code.as_str())
            .collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 4);

        // 同分按任务序号分配，同一类型依次取资源表顺序
        assert_eq!(report.allocated[0].resource_code, "RSG01");
        assert_eq!(report.allocated[1].resource_code, "RSG02");
        assert_eq!(report.allocated[2].resource_code, "RSG11");
        assert_eq!(report.allocated[3].resource_code, "RSG17");

        let order = repos.order_repo.find_by_no(&created.order.order_no).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Allocated);
        assert_busy_iff_allocated(&repos);
    }

    // ==========================================
    // 测试5: 连续两轮无变化时第二轮为空操作
    // ==========================================

    #[test]
    fn test_repeated_sweep_is_noop() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = open_repos(&db_path);
        let intake = OrderIntake::new(repos.clone());
        let t0 = base_time();

        // 7 个 RT03 任务，只有 6 个 RT03 资源
        let lines: Vec<OrderLine> = (0..7).map(|_| OrderLine::new("88021", 100)).collect();
        intake.create_order(PriorityClass::P2, &lines, t0).unwrap();

        let engine = allocation_engine(&repos, &[]);
        let first = engine.run_sweep(t0).unwrap();
        assert_eq!(first.allocated_count(), 6);
        assert_eq!(first.skipped_no_resource, 1);

        let second = engine.run_sweep(t0 + Duration::minutes(1)).unwrap();
        assert!(second.is_noop());
        assert_eq!(second.considered, 1);
        assert_eq!(second.skipped_no_resource, 1);

        assert_eq!(repos.task_repo.count_by_status(TaskStatus::Allocated).unwrap(), 6);
        assert_eq!(repos.task_repo.count_by_status(TaskStatus::Open).unwrap(), 1);
        assert_busy_iff_allocated(&repos);
    }

    // ==========================================
    // 测试6: 无 OPEN 任务时轮次不写任何日志
    // ==========================================

    #[test]
    fn test_empty_sweep_writes_nothing() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = open_repos(&db_path);

        let engine = allocation_engine(&repos, &[]);
        let report = engine.run_sweep(base_time()).unwrap();

        assert_eq!(report.considered, 0);
        assert!(report.is_noop());
        assert!(repos.action_log_repo.find_by_action_type("Allocate").unwrap().is_empty());
    }
}
