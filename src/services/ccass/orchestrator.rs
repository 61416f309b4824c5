//! 单个交易日的并行抓取
//!
//! 任务分组后每组作为一个作业提交到线程池；作业内部顺序抓取，
//! 完成后经通道把本组结果交回，由调度方写入当日累加器并合并

use log::{error, info, warn};
use std::collections::BTreeMap;
use std::sync::{mpsc, Mutex, PoisonError};
use std::time::Instant;

use super::accumulator::SharedAccumulator;
use super::hold_detail::HoldDetailClient;
use super::partition::divide;
use super::pool::WorkerPool;
use crate::error::{CrawlError, CrawlResult};
use crate::models::{DateReport, ItemOutcome, ItemStatus, ResultTable, TradeDate, WorkItem};

/// 单只股票抓取失败后的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// 记录失败，继续本组后续股票
    #[default]
    Isolate,
    /// 本组停止，剩余股票记为跳过
    AbortWorker,
}

impl FailurePolicy {
    pub fn from_abort_flag(abort_worker_on_error: bool) -> Self {
        if abort_worker_on_error {
            Self::AbortWorker
        } else {
            Self::Isolate
        }
    }
}

/// 一个分组的执行结果
struct WorkerReport {
    group: usize,
    table: ResultTable,
    outcomes: Vec<ItemOutcome>,
}

fn crawl_group(
    client: &HoldDetailClient,
    group: usize,
    items: Vec<WorkItem>,
    trade_date: TradeDate,
    policy: FailurePolicy,
) -> WorkerReport {
    let mut table = ResultTable::empty();
    let mut outcomes = Vec::with_capacity(items.len());
    let mut aborted = false;

    for item in items {
        if aborted {
            outcomes.push(ItemOutcome {
                item,
                status: ItemStatus::Skipped,
            });
            continue;
        }

        let status = match client.fetch(&item, &trade_date) {
            Ok(part) => {
                let records = part.len();
                table.append(part);
                ItemStatus::Succeeded { records }
            }
            Err(e) => {
                error!(
                    "[{}] 第 {} 组 {} 抓取失败: {}",
                    trade_date,
                    group,
                    item.hkshare_code(),
                    e
                );
                aborted = policy == FailurePolicy::AbortWorker;
                ItemStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        outcomes.push(ItemOutcome { item, status });
    }

    WorkerReport {
        group,
        table,
        outcomes,
    }
}

/// 并行抓取调度器
///
/// 线程池在构造时创建，之后每个交易日复用。同一时间只处理一个交易日，
/// 保证累加器中不会混入两个日期的数据。
pub struct ParallelCrawlOrchestrator {
    pool: WorkerPool,
    client: HoldDetailClient,
    policy: FailurePolicy,
    accumulator: SharedAccumulator,
    run_lock: Mutex<()>,
}

impl ParallelCrawlOrchestrator {
    pub fn new(
        client: HoldDetailClient,
        pool_size: usize,
        policy: FailurePolicy,
    ) -> CrawlResult<Self> {
        Ok(Self {
            pool: WorkerPool::new(pool_size)?,
            client,
            policy,
            accumulator: SharedAccumulator::new(),
            run_lock: Mutex::new(()),
        })
    }

    pub fn client(&self) -> &HoldDetailClient {
        &self.client
    }

    /// 分组数须在 1 到线程池大小之间，保证每组都有独立线程并行执行
    pub fn check_worker_count(&self, worker_count: usize) -> CrawlResult<()> {
        let pool_size = self.pool.size();
        if worker_count == 0 || worker_count > pool_size {
            return Err(CrawlError::Configuration(format!(
                "工作线程数必须在 1 到 {} 之间，收到 {}",
                pool_size, worker_count
            )));
        }
        Ok(())
    }

    /// 抓取一个交易日的全部任务
    ///
    /// 阻塞直到所有分组都返回结果。合并后记录的顺序取决于各组完成先后，
    /// 不保证稳定；`outcomes` 按任务列表原顺序排列。
    pub fn run(
        &self,
        items: &[WorkItem],
        trade_date: &TradeDate,
        worker_count: usize,
    ) -> CrawlResult<DateReport> {
        self.check_worker_count(worker_count)?;
        let groups = divide(items, worker_count)?;

        let _running = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let started = Instant::now();
        self.accumulator.reset(trade_date);
        info!(
            "[{}] 开始抓取 {} 只股票，分 {} 组",
            trade_date,
            items.len(),
            worker_count
        );

        let (tx, rx) = mpsc::channel::<WorkerReport>();
        let mut pending: BTreeMap<usize, Vec<WorkItem>> = BTreeMap::new();

        for (group, group_items) in groups.into_iter().enumerate() {
            if group_items.is_empty() {
                continue;
            }
            pending.insert(group, group_items.clone());

            let tx = tx.clone();
            let client = self.client.clone();
            let date = *trade_date;
            let policy = self.policy;
            self.pool.execute(move || {
                let report = crawl_group(&client, group, group_items, date, policy);
                let _ = tx.send(report);
            });
        }
        drop(tx);

        let mut finished: Vec<(usize, Vec<ItemOutcome>)> = Vec::with_capacity(pending.len());
        for WorkerReport {
            group,
            table,
            outcomes,
        } in rx
        {
            self.accumulator.append(table)?;
            pending.remove(&group);
            finished.push((group, outcomes));
        }

        // 作业异常终止时不会有结果返回
        for (group, lost) in pending {
            warn!("[{}] 第 {} 组未返回结果，共 {} 只股票", trade_date, group, lost.len());
            let outcomes = lost
                .into_iter()
                .map(|item| ItemOutcome {
                    item,
                    status: ItemStatus::Failed {
                        error: "工作线程异常终止".to_string(),
                    },
                })
                .collect();
            finished.push((group, outcomes));
        }
        finished.sort_by_key(|(group, _)| *group);

        let report = DateReport {
            trade_date: *trade_date,
            table: ResultTable::concat(self.accumulator.take()),
            outcomes: finished.into_iter().flat_map(|(_, o)| o).collect(),
        };

        info!(
            "[{}] 抓取完成: {} 条记录，失败 {} 只，耗时 {:?}",
            trade_date,
            report.table.len(),
            report.failed_count(),
            started.elapsed()
        );
        Ok(report)
    }
}
