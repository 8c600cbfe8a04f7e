// ==========================================
// 仓库作业调度系统 - 优先级打分引擎
// ==========================================
// 职责: 分配排序打分 (PriorityScorer) 与展示排名 (DisplayRanker)
// 红线: 评估时间由调用方传入, 引擎不读取系统时钟
// 红线: 两套公式各用各的权重表, 允许排序结果不一致
// ==========================================

use crate::config::ScoringConfig;
use crate::domain::order::Order;
use crate::domain::types::PriorityClass;
use chrono::NaiveDateTime;
use std::collections::HashMap;

// ==========================================
// PriorityScorer - 分配排序打分
// ==========================================
// 有效分 = 基础权重 + 等待分钟数 × 老化系数 (越高越紧急)
pub struct PriorityScorer {
    config: ScoringConfig,
}

impl PriorityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// 优先级基础权重（未知优先级取 unknown_weight，不报错）
    pub fn base_weight(&self, priority: PriorityClass) -> f64 {
        if !priority.is_known() {
            return self.config.unknown_weight;
        }
        self.config
            .base_weights
            .get(&priority)
            .copied()
            .unwrap_or(self.config.unknown_weight)
    }

    /// 等待时长（分钟，含小数）
    ///
    /// 创建时间晚于评估时间（时钟偏移）时按 0 计
    pub fn age_minutes(created_at: NaiveDateTime, now: NaiveDateTime) -> f64 {
        let millis = (now - created_at).num_milliseconds();
        (millis as f64 / 60_000.0).max(0.0)
    }

    /// 计算有效分
    ///
    /// # 参数
    /// - `priority`: 订单优先级
    /// - `created_at`: 订单创建时间
    /// - `now`: 评估时间
    pub fn effective_score(
        &self,
        priority: PriorityClass,
        created_at: NaiveDateTime,
        now: NaiveDateTime,
    ) -> f64 {
        self.base_weight(priority)
            + Self::age_minutes(created_at, now) * self.config.aging_weight_per_minute
    }
}

impl Default for PriorityScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

// ==========================================
// DisplayRanker - 展示排名（只读报表用）
// ==========================================
// 综合值 = 优先级粗粒度权重 × class_factor
//        + 未完成(OPEN)任务数 × open_task_factor
//        + 订单序号
// 综合值升序, 名次从 1 开始
pub struct DisplayRanker {
    config: ScoringConfig,
}

/// 单个订单的展示排名
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRank {
    pub order_no: String,
    pub priority: PriorityClass,
    pub composite: i64,
    pub rank: usize,
}

impl DisplayRanker {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    fn class_weight(&self, priority: PriorityClass) -> i64 {
        self.config
            .display_rank_weights
            .get(&priority)
            .copied()
            .unwrap_or(self.config.display_rank_unknown_weight)
    }

    /// 单个订单的综合值
    pub fn composite(&self, order: &Order, open_tasks: i64) -> i64 {
        self.class_weight(order.priority) * self.config.display_rank_class_factor
            + open_tasks * self.config.display_rank_open_task_factor
            + order.id
    }

    /// 为订单集合排名
    ///
    /// # 参数
    /// - `orders`: 参与排名的订单
    /// - `open_task_counts`: order_no → OPEN 任务数（缺失视为 0）
    ///
    /// # 返回
    /// 按名次升序的排名列表
    pub fn rank(&self, orders: &[Order], open_task_counts: &HashMap<String, i64>) -> Vec<OrderRank> {
        let mut scored: Vec<(i64, &Order)> = orders
            .iter()
            .map(|order| {
                let open = open_task_counts.get(&order.order_no).copied().unwrap_or(0);
                (self.composite(order, open), order)
            })
            .collect();

        // 稳定排序: 综合值相同时保持输入顺序
        scored.sort_by_key(|(composite, _)| *composite);

        scored
            .into_iter()
            .enumerate()
            .map(|(idx, (composite, order))| OrderRank {
                order_no: order.order_no.clone(),
                priority: order.priority,
                composite,
                rank: idx + 1,
            })
            .collect()
    }
}

impl Default for DisplayRanker {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::OrderStatus;
    use chrono::{Duration, NaiveDate};

    fn ts(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn order(id: i64, priority: PriorityClass) -> Order {
        Order {
            id,
            order_no: format!("ORD{}", 100000 + id),
            priority,
            created_at: ts(8, 0),
            status: OrderStatus::Open,
        }
    }

    #[test]
    fn test_base_weights() {
        let scorer = PriorityScorer::default();
        assert_eq!(scorer.base_weight(PriorityClass::P1), 10000.0);
        assert_eq!(scorer.base_weight(PriorityClass::P2), 400.0);
        assert_eq!(scorer.base_weight(PriorityClass::P5), 100.0);
        assert_eq!(scorer.base_weight(PriorityClass::Unknown), 0.0);
    }

    #[test]
    fn test_linear_aging() {
        let scorer = PriorityScorer::default();
        let created = ts(8, 0);
        let now = created + Duration::minutes(90);

        assert_eq!(scorer.effective_score(PriorityClass::P3, created, now), 390.0);
        // 等待足够久的低优先级订单会超过刚创建的高一级订单
        let fresh_p2 = scorer.effective_score(PriorityClass::P2, now, now);
        let old_p5 = scorer.effective_score(PriorityClass::P5, created - Duration::minutes(400), now);
        assert!(old_p5 > fresh_p2);
    }

    #[test]
    fn test_future_created_at_clamped() {
        let scorer = PriorityScorer::default();
        let now = ts(8, 0);
        let created = now + Duration::minutes(30);
        assert_eq!(scorer.effective_score(PriorityClass::P4, created, now), 200.0);
    }

    #[test]
    fn test_fractional_minutes() {
        let created = ts(8, 0);
        let now = created + Duration::seconds(90);
        assert_eq!(PriorityScorer::age_minutes(created, now), 1.5);
    }

    #[test]
    fn test_display_rank_ascending_composite() {
        let ranker = DisplayRanker::default();
        let orders = vec![
            order(1, PriorityClass::P3),
            order(2, PriorityClass::P1),
            order(3, PriorityClass::Unknown),
        ];
        let mut open = HashMap::new();
        open.insert("ORD100002".to_string(), 4);

        let ranks = ranker.rank(&orders, &open);
        assert_eq!(ranks[0].order_no, "ORD100002");
        assert_eq!(ranks[0].composite, 1000 + 40 + 2);
        assert_eq!(ranks[0].rank, 1);
        assert_eq!(ranks[1].order_no, "ORD100001");
        assert_eq!(ranks[2].order_no, "ORD100003");
        assert_eq!(ranks[2].composite, 5003);
    }

    #[test]
    fn test_display_and_allocation_orderings_may_disagree() {
        // P2 订单积压大量 OPEN 任务: 分配排序不受影响, 展示排名被拉低
        let ranker = DisplayRanker::default();
        let scorer = PriorityScorer::default();
        let p2 = order(1, PriorityClass::P2);
        let p3 = order(2, PriorityClass::P3);
        let mut open = HashMap::new();
        open.insert(p2.order_no.clone(), 150);

        let ranks = ranker.rank(&[p2.clone(), p3.clone()], &open);
        assert_eq!(ranks[0].order_no, p3.order_no);

        let now = ts(9, 0);
        assert!(
            scorer.effective_score(p2.priority, p2.created_at, now)
                > scorer.effective_score(p3.priority, p3.created_at, now)
        );
    }
}
