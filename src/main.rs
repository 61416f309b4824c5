//! CCASS 持股明细抓取服务
//!
//! 从港交所披露易抓取中央结算系统参与者持股明细，支持两种运行方式：
//! - `ccass-crawler crawl <start> [end] [workers]`：按日期区间抓取并逐日写入 CSV
//! - `ccass-crawler [serve]`：启动 RESTful API 服务

mod config;     // 配置加载
mod error;      // 领域错误类型
mod handlers;   // HTTP 请求处理器
mod middleware; // 中间件
mod models;     // 数据模型定义
mod services;   // 业务逻辑服务

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{bail, Context};
use env_logger::Env;
use log::{info, warn};
use std::env;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::middleware::ApiKeyMiddleware;
use crate::models::TradeDate;
use crate::services::ccass::{
    CsvSink, DateRangeDriver, FetchClient, FixedWorkList, HoldDetailClient, HsgtStockList,
    HtmlRecordExtractor, HttpFetchClient, ParallelCrawlOrchestrator, WorkSource,
};

const USAGE: &str = "用法: ccass-crawler [serve] | ccass-crawler crawl <start> [end] [workers]";

/// 应用程序入口
///
/// 阻塞 HTTP 客户端需在异步运行时之外创建，因此不使用 `#[actix_web::main]`
fn main() -> anyhow::Result<()> {
    let (config, load_note) = AppConfig::load();

    // 初始化日志系统，RUST_LOG 优先于配置文件中的级别
    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));
    info!("{}", load_note);

    let args: Vec<String> = env::args().skip(1).collect();
    let command = parse_command(&args, &config)?;

    // 线程池按本次运行的分组数创建，保证每组各占一个线程
    let pool_size = match &command {
        Command::Crawl { workers, .. } => *workers,
        Command::Serve => config.crawl.workers,
    };

    let crawl = &config.crawl;
    let fetcher: Arc<dyn FetchClient> = Arc::new(HttpFetchClient::new(
        &crawl.user_agent,
        config.api.timeout(),
        config.api.connect_timeout(),
        crawl.retry_policy(),
    )?);
    let client = HoldDetailClient::new(
        Arc::clone(&fetcher),
        Arc::new(HtmlRecordExtractor::new()?),
        crawl.hold_detail_url.as_str(),
    );
    let orchestrator = Arc::new(ParallelCrawlOrchestrator::new(
        client,
        pool_size,
        crawl.failure_policy(),
    )?);

    let stock_list = Arc::new(HsgtStockList::new(fetcher, crawl.stock_list_url.clone()));
    let work_source: Arc<dyn WorkSource> = if crawl.stocks.is_empty() {
        Arc::clone(&stock_list) as Arc<dyn WorkSource>
    } else {
        info!("使用配置中的 {} 只股票", crawl.stocks.len());
        Arc::new(FixedWorkList(crawl.stocks.clone()))
    };

    match command {
        Command::Crawl {
            start,
            end,
            workers,
        } => run_crawl(
            &config,
            orchestrator,
            work_source.as_ref(),
            start,
            end,
            workers,
        ),
        Command::Serve => {
            let state = AppState {
                orchestrator,
                stock_list,
                work_source,
                default_workers: pool_size,
            };
            serve(&config, state)
        }
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    Serve,
    Crawl {
        start: TradeDate,
        end: TradeDate,
        workers: usize,
    },
}

/// 解析命令行；crawl 默认只抓香港时间昨天
fn parse_command(args: &[String], config: &AppConfig) -> anyhow::Result<Command> {
    match args.first().map(String::as_str) {
        None | Some("serve") => Ok(Command::Serve),
        Some("crawl") => {
            let start = match args.get(1) {
                Some(s) => TradeDate::parse(s)?,
                None => TradeDate::yesterday(),
            };
            let end = match args.get(2) {
                Some(s) => TradeDate::parse(s)?,
                None => start,
            };
            let workers = match args.get(3) {
                Some(s) => s
                    .parse::<usize>()
                    .with_context(|| format!("工作线程数必须是正整数: {}\n{}", s, USAGE))?,
                None => config.crawl.workers,
            };
            Ok(Command::Crawl {
                start,
                end,
                workers,
            })
        }
        Some(other) => bail!("未知命令 {:?}\n{}", other, USAGE),
    }
}

/// 按日期区间抓取并逐日写入 CSV
fn run_crawl(
    config: &AppConfig,
    orchestrator: Arc<ParallelCrawlOrchestrator>,
    source: &dyn WorkSource,
    start: TradeDate,
    end: TradeDate,
    workers: usize,
) -> anyhow::Result<()> {
    let sink = Arc::new(CsvSink::new(&config.crawl.output_dir));
    let driver = DateRangeDriver::new(orchestrator, sink);
    let summaries = driver.run_with_source(source, start, end, workers)?;

    let mut failed = 0;
    for summary in &summaries {
        info!(
            "{}: {} 条记录，失败 {} 只 -> {}",
            summary.trade_date,
            summary.records,
            summary.failed,
            summary.path.display()
        );
        failed += summary.failed;
    }
    if failed > 0 {
        warn!("共 {} 只股票抓取失败，详见各日 _status.csv", failed);
    }
    Ok(())
}

/// 启动 HTTP 服务器
fn serve(config: &AppConfig, state: AppState) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr();
    let api_key = config.api.api_key.clone();
    if api_key.is_empty() {
        warn!("未设置 API_KEY，接口不启用认证");
    }

    let state = web::Data::new(state);
    let http_workers = config.server.workers;
    info!("启动 CCASS 持股明细服务，监听 {}", bind_addr);

    actix_web::rt::System::new().block_on(async move {
        let mut server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .wrap(Logger::default())  // 添加请求日志中间件
                .wrap(ApiKeyMiddleware::new(api_key.clone()))  // API Key 认证
                .configure(handlers::config)  // 配置路由
        });
        if http_workers > 0 {
            server = server.workers(http_workers);
        }
        server.bind(bind_addr.as_str())?.run().await
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_command() {
        let config = AppConfig::default();
        assert_eq!(parse_command(&args(&[]), &config).unwrap(), Command::Serve);

        let day = TradeDate::parse("20240709").unwrap();
        assert_eq!(
            parse_command(&args(&["crawl", "20240709"]), &config).unwrap(),
            Command::Crawl {
                start: day,
                end: day,
                workers: config.crawl.workers,
            }
        );

        // 命令行给出的线程数决定线程池大小
        assert_eq!(
            parse_command(&args(&["crawl", "20240701", "2024-07-09", "5"]), &config).unwrap(),
            Command::Crawl {
                start: TradeDate::parse("20240701").unwrap(),
                end: day,
                workers: 5,
            }
        );
    }

    #[test]
    fn test_parse_command_rejects_bad_input() {
        let config = AppConfig::default();
        assert!(parse_command(&args(&["crawl", "20240701", "20240709", "-1"]), &config).is_err());
        assert!(parse_command(&args(&["crawl", "2024-13-01"]), &config).is_err());
        assert!(parse_command(&args(&["fetch"]), &config).is_err());
    }
}
