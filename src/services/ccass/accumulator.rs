//! 按交易日汇总的结果累加器

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{CrawlError, CrawlResult};
use crate::models::{ResultTable, TradeDate};

#[derive(Debug, Default)]
struct State {
    trade_date: Option<TradeDate>,
    tables: Vec<ResultTable>,
}

/// 当前交易日的结果表集合
///
/// 生命周期恰好是一个交易日：`reset` 开始新的一天，`take` 取出并清空。
/// 追加的表中若含有其他日期的记录则拒绝写入。
#[derive(Debug, Default)]
pub struct SharedAccumulator {
    state: Mutex<State>,
}

impl SharedAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 清空并切换到新的交易日
    pub fn reset(&self, trade_date: &TradeDate) {
        let mut state = self.lock();
        state.trade_date = Some(*trade_date);
        state.tables.clear();
    }

    pub fn append(&self, table: ResultTable) -> CrawlResult<()> {
        let mut state = self.lock();
        let current = state
            .trade_date
            .ok_or_else(|| CrawlError::Worker("累加器尚未设置交易日".to_string()))?;

        if let Some(other) = table.records().iter().find(|r| r.trade_date != current) {
            return Err(CrawlError::Worker(format!(
                "累加器当前交易日为 {}，收到 {} 的记录",
                current, other.trade_date
            )));
        }

        state.tables.push(table);
        Ok(())
    }

    /// 取出当日全部结果表并清空
    pub fn take(&self) -> Vec<ResultTable> {
        let mut state = self.lock();
        state.trade_date = None;
        std::mem::take(&mut state.tables)
    }

    #[cfg(test)]
    pub fn table_count(&self) -> usize {
        self.lock().tables.len()
    }
}
