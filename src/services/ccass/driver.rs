//! 按日期区间逐日抓取并落盘

use log::info;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::orchestrator::ParallelCrawlOrchestrator;
use super::sink::DatasetSink;
use super::stock_list::{FixedWorkList, WorkSource};
use crate::error::CrawlResult;
use crate::models::{TradeDate, WorkItem};

/// 单个交易日的执行摘要
#[derive(Debug, Clone, Serialize)]
pub struct DateSummary {
    pub trade_date: TradeDate,
    pub records: usize,
    pub failed: usize,
    pub path: PathBuf,
}

pub struct DateRangeDriver {
    orchestrator: Arc<ParallelCrawlOrchestrator>,
    sink: Arc<dyn DatasetSink>,
}

impl DateRangeDriver {
    pub fn new(orchestrator: Arc<ParallelCrawlOrchestrator>, sink: Arc<dyn DatasetSink>) -> Self {
        Self { orchestrator, sink }
    }

    /// 每个交易日使用同一份任务列表
    pub fn run(
        &self,
        items: &[WorkItem],
        start: TradeDate,
        end: TradeDate,
        worker_count: usize,
    ) -> CrawlResult<Vec<DateSummary>> {
        self.run_with_source(&FixedWorkList(items.to_vec()), start, end, worker_count)
    }

    /// 逐日向 `source` 取任务，抓取后立即落盘，再处理下一日
    pub fn run_with_source(
        &self,
        source: &dyn WorkSource,
        start: TradeDate,
        end: TradeDate,
        worker_count: usize,
    ) -> CrawlResult<Vec<DateSummary>> {
        self.orchestrator.check_worker_count(worker_count)?;
        let dates = TradeDate::range_inclusive(start, end)?;
        info!(
            "抓取区间 {} ~ {}，共 {} 天，{} 组并行",
            start,
            end,
            dates.len(),
            worker_count
        );

        let mut summaries = Vec::with_capacity(dates.len());
        for trade_date in dates {
            let items = source.work_items(&trade_date)?;
            let report = self.orchestrator.run(&items, &trade_date, worker_count)?;
            let path = self.sink.persist(&report)?;

            summaries.push(DateSummary {
                trade_date,
                records: report.table.len(),
                failed: report.failed_count(),
                path,
            });
        }
        Ok(summaries)
    }
}
