// ==========================================
// 仓库作业调度系统 - 命令行入口
// ==========================================
// 用法: warehouse-alloc [--db PATH] <命令> [参数]
// 输出: 命令结果以 JSON 打印到 stdout, 日志写 stderr
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;

use warehouse_alloc::app::{get_default_db_path, AppState};
use warehouse_alloc::logging;

const USAGE: &str = "\
用法: warehouse-alloc [--db PATH] <命令> [参数]

命令:
  init                      初始化数据库与参考数据
  create-order <P1..P5>     创建演示订单（随机拆分 1-9 个任务）
  allocate                  执行一次分配轮次
  confirm <task_id>         确认任务
  refill <bin_code>         按配置补货量补货
  orders                    订单列表
  completed-orders          已完成订单
  tasks                     任务列表（含展示排名）
  bins                      储位库存
  resources                 资源状态
  resource <code>           资源详情与作业历史
  dashboard                 驾驶舱统计
  actions [limit]           最近的操作日志（默认 20 条）";

fn main() {
    logging::init();

    if let Err(e) = run(std::env::args().skip(1).collect()) {
        tracing::error!("命令执行失败: {:#}", e);
        eprintln!("错误: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Vec<String>) -> Result<()> {
    let (db_path, rest) = split_db_arg(args)?;
    let Some((command, params)) = rest.split_first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    tracing::info!("{} v{} 使用数据库: {}", warehouse_alloc::APP_NAME, warehouse_alloc::VERSION, db_path);
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;
    let api = &state.warehouse_api;

    match command.as_str() {
        "init" => print_json(&state.seed_summary),
        "create-order" => print_json(&api.create_demo_order(required(params, 0, "优先级")?)?),
        "allocate" => print_json(&api.allocate_tasks()?),
        "confirm" => {
            let raw = required(params, 0, "任务ID")?;
            let task_id: i64 = raw
                .parse()
                .with_context(|| format!("任务ID必须为整数: {}", raw))?;
            print_json(&api.confirm_task(task_id)?)
        }
        "refill" => print_json(&api.refill_bin(required(params, 0, "储位编码")?)?),
        "orders" => print_json(&api.list_orders()?),
        "completed-orders" => print_json(&api.list_completed_orders()?),
        "tasks" => print_json(&api.list_tasks()?),
        "bins" => print_json(&api.list_bins()?),
        "resources" => print_json(&api.list_resource_status()?),
        "resource" => print_json(&api.get_resource_detail(required(params, 0, "资源编码")?)?),
        "dashboard" => print_json(&api.get_dashboard()?),
        "actions" => {
            let limit = match params.first() {
                Some(raw) => raw
                    .parse()
                    .with_context(|| format!("limit 必须为整数: {}", raw))?,
                None => 20,
            };
            print_json(&api.list_recent_actions(limit)?)
        }
        other => bail!("未知命令: {}\n\n{}", other, USAGE),
    }
}

/// 拆出 `--db PATH`，未指定时使用默认路径
fn split_db_arg(args: Vec<String>) -> Result<(String, Vec<String>)> {
    let mut db_path = None;
    let mut rest = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        if arg == "--db" {
            let path = iter.next().ok_or_else(|| anyhow!("--db 缺少路径参数"))?;
            db_path = Some(path);
        } else {
            rest.push(arg);
        }
    }

    Ok((db_path.unwrap_or_else(get_default_db_path), rest))
}

fn required<'a>(params: &'a [String], idx: usize, name: &str) -> Result<&'a str> {
    params
        .get(idx)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("缺少参数: {}\n\n{}", name, USAGE))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
