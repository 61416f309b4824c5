//! 按交易日落盘

use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CrawlResult;
use crate::models::{DateReport, ItemStatus, TradeDate, HOLD_DETAIL_COLUMNS};

/// 数据集名称，如 ccass_hold_detail_20240709
pub fn dataset_name(trade_date: &TradeDate) -> String {
    format!("ccass_hold_detail_{}", trade_date)
}

/// 某个交易日汇总结果的存放位置
pub trait DatasetSink: Send + Sync {
    /// 写入一个交易日的结果，返回数据集位置
    fn persist(&self, report: &DateReport) -> CrawlResult<PathBuf>;
}

/// 每个交易日写一个 CSV；有失败任务时另写一个 `_status.csv`
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dataset_path(&self, trade_date: &TradeDate) -> PathBuf {
        self.dir.join(format!("{}.csv", dataset_name(trade_date)))
    }

    pub fn status_path(&self, trade_date: &TradeDate) -> PathBuf {
        self.dir
            .join(format!("{}_status.csv", dataset_name(trade_date)))
    }

    fn write_dataset(&self, path: &Path, report: &DateReport) -> CrawlResult<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;

        // 空表也写表头
        wtr.write_record(HOLD_DETAIL_COLUMNS)?;
        for record in report.table.records() {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_status(&self, path: &Path, report: &DateReport) -> CrawlResult<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(["hkshare_code", "stock_code", "status", "records", "error"])?;

        for outcome in &report.outcomes {
            let (status, records, error) = match &outcome.status {
                ItemStatus::Succeeded { records } => ("succeeded", records.to_string(), ""),
                ItemStatus::Failed { error } => ("failed", String::new(), error.as_str()),
                ItemStatus::Skipped => ("skipped", String::new(), ""),
            };
            wtr.write_record([
                outcome.item.hkshare_code(),
                outcome.item.output_code(),
                status,
                records.as_str(),
                error,
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl DatasetSink for CsvSink {
    fn persist(&self, report: &DateReport) -> CrawlResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let path = self.dataset_path(&report.trade_date);
        self.write_dataset(&path, report)?;

        let status_path = self.status_path(&report.trade_date);
        if report.failed_count() > 0 {
            self.write_status(&status_path, report)?;
            info!(
                "{} 有 {} 只股票未成功，明细见 {}",
                report.trade_date,
                report.failed_count(),
                status_path.display()
            );
        } else if status_path.exists() {
            // 重跑成功后清掉上次的失败记录
            fs::remove_file(&status_path)?;
        }

        info!("已写入 {}（{} 条记录）", path.display(), report.table.len());
        Ok(path)
    }
}
