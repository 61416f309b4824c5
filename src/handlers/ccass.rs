use actix_web::{web, HttpResponse, Result};
use std::sync::Arc;

use crate::error::{CrawlError, CrawlResult};
use crate::models::{ApiResponse, DailyCrawlQuery, HoldDetailQuery, StockListQuery, TradeDate, WorkItem};
use crate::services::ccass::{HsgtStockList, ParallelCrawlOrchestrator, WorkSource};

/// 各接口共享的抓取组件
pub struct AppState {
    pub orchestrator: Arc<ParallelCrawlOrchestrator>,
    pub stock_list: Arc<HsgtStockList>,
    /// 按日全量抓取时的任务来源
    pub work_source: Arc<dyn WorkSource>,
    pub default_workers: usize,
}

/// 抓取使用阻塞客户端，放到阻塞线程池执行
async fn run_blocking<T, F>(job: F) -> CrawlResult<T>
where
    F: FnOnce() -> CrawlResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| CrawlError::Worker(format!("后台任务异常: {}", e)))?
}

fn trade_date_or_yesterday(date: Option<&str>) -> CrawlResult<TradeDate> {
    match date {
        Some(s) if !s.trim().is_empty() => TradeDate::parse(s),
        _ => Ok(TradeDate::yesterday()),
    }
}

/// 单只股票某日持股明细
pub async fn get_hold_detail(
    state: web::Data<AppState>,
    query: web::Query<HoldDetailQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let result = match trade_date_or_yesterday(query.date.as_deref()) {
        Ok(date) => {
            let item = WorkItem::new(query.hkshare_code, query.ashare_code);
            let client = state.orchestrator.client().clone();
            run_blocking(move || client.fetch(&item, &date))
                .await
                .map(|table| table.into_records())
        }
        Err(e) => Err(e),
    };
    Ok(ApiResponse::respond(result))
}

/// 某日沪深港通股票列表
pub async fn get_stocks(
    state: web::Data<AppState>,
    query: web::Query<StockListQuery>,
) -> Result<HttpResponse> {
    let result = match trade_date_or_yesterday(query.date.as_deref()) {
        Ok(date) => {
            let stock_list = Arc::clone(&state.stock_list);
            run_blocking(move || stock_list.fetch(&date)).await
        }
        Err(e) => Err(e),
    };
    Ok(ApiResponse::respond(result))
}

/// 抓取某日全部股票，返回合并结果和每只股票的执行情况
pub async fn crawl_daily(
    state: web::Data<AppState>,
    query: web::Query<DailyCrawlQuery>,
) -> Result<HttpResponse> {
    let workers = query.workers.unwrap_or(state.default_workers);
    let checked = state
        .orchestrator
        .check_worker_count(workers)
        .and_then(|_| trade_date_or_yesterday(query.date.as_deref()));
    let result = match checked {
        Ok(date) => {
            let orchestrator = Arc::clone(&state.orchestrator);
            let source = Arc::clone(&state.work_source);
            run_blocking(move || {
                let items = source.work_items(&date)?;
                orchestrator.run(&items, &date, workers)
            })
            .await
        }
        Err(e) => Err(e),
    };
    Ok(ApiResponse::respond(result))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/ccass")
            .route("/hold_detail", web::get().to(get_hold_detail))
            .route("/stocks", web::get().to(get_stocks))
            .route("/daily", web::get().to(crawl_daily)),
    );
}
