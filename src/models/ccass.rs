//! 中央结算系统（CCASS）持股数据模型
//!
//! 定义抓取任务、交易日、持股记录及按日汇总结果

use chrono::{Duration, NaiveDate, Utc};
use chrono_tz::Asia::Hong_Kong;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{CrawlError, CrawlResult};

/// 输出数据集的固定列
pub const HOLD_DETAIL_COLUMNS: [&str; 6] = [
    "stock_code",
    "trade_date",
    "col_participant_id",
    "col_participant_name",
    "col_shareholding",
    "col_shareholding_percent",
];

/// 交易日
///
/// 规范文本形式为 8 位 YYYYMMDD，请求披露网站时使用 YYYY/MM/DD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TradeDate(NaiveDate);

impl TradeDate {
    /// 解析日期字符串，支持 YYYYMMDD、YYYY/MM/DD、YYYY-MM-DD
    pub fn parse(s: &str) -> CrawlResult<Self> {
        let s = s.trim();
        let compact = s.len() == 8 && s.chars().all(|c| c.is_ascii_digit());
        let parsed = if compact {
            NaiveDate::parse_from_str(s, "%Y%m%d").ok()
        } else {
            ["%Y/%m/%d", "%Y-%m-%d"]
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        };

        parsed
            .map(Self)
            .ok_or_else(|| CrawlError::Configuration(format!("无法识别的日期: {:?}", s)))
    }

    /// 香港时间的昨天，作为未指定日期时的默认值
    pub fn yesterday() -> Self {
        let today = Utc::now().with_timezone(&Hong_Kong).date_naive();
        Self(today - Duration::days(1))
    }

    /// 请求参数中的日期格式 YYYY/MM/DD
    pub fn as_query(&self) -> String {
        self.0.format("%Y/%m/%d").to_string()
    }

    /// [start, end] 闭区间内的每一个自然日
    pub fn range_inclusive(start: TradeDate, end: TradeDate) -> CrawlResult<Vec<TradeDate>> {
        if start > end {
            return Err(CrawlError::Configuration(format!(
                "开始日期 {} 晚于结束日期 {}",
                start, end
            )));
        }

        Ok(start
            .0
            .iter_days()
            .take_while(|d| *d <= end.0)
            .map(TradeDate)
            .collect())
    }
}

impl fmt::Display for TradeDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d"))
    }
}

impl Serialize for TradeDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TradeDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TradeDate::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// 抓取任务：港股代码 + 对应的 A 股代码
///
/// 构建后不可变。输出记录的 stock_code 优先使用 A 股代码
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    hkshare_code: String,
    #[serde(default)]
    ashare_code: Option<String>,
}

impl WorkItem {
    pub fn new(hkshare_code: impl Into<String>, ashare_code: Option<String>) -> Self {
        Self {
            hkshare_code: hkshare_code.into(),
            ashare_code,
        }
    }

    pub fn hkshare_code(&self) -> &str {
        &self.hkshare_code
    }

    pub fn ashare_code(&self) -> Option<&str> {
        self.ashare_code.as_deref()
    }

    /// 写入记录的股票代码
    pub fn output_code(&self) -> &str {
        self.ashare_code().unwrap_or(&self.hkshare_code)
    }
}

/// 单个参与者在某日对某只股票的持股记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareholdingRecord {
    pub stock_code: String,
    pub trade_date: TradeDate,
    #[serde(rename = "col_participant_id")]
    pub participant_id: String,
    #[serde(rename = "col_participant_name")]
    pub participant_name: String,
    #[serde(rename = "col_shareholding")]
    pub shareholding: u64,
    #[serde(rename = "col_shareholding_percent")]
    pub shareholding_percent: f64,
}

/// 一次抓取解析（或多次合并）得到的结果表，始终带固定列
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    columns: &'static [&'static str],
    records: Vec<ShareholdingRecord>,
}

impl Default for ResultTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<ShareholdingRecord>> for ResultTable {
    fn from(records: Vec<ShareholdingRecord>) -> Self {
        Self {
            columns: &HOLD_DETAIL_COLUMNS,
            records,
        }
    }
}

impl ResultTable {
    pub fn empty() -> Self {
        Self::from(Vec::new())
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    pub fn records(&self) -> &[ShareholdingRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ShareholdingRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: ShareholdingRecord) {
        self.records.push(record);
    }

    pub fn append(&mut self, other: ResultTable) {
        self.records.extend(other.records);
    }

    /// 按给定顺序拼接多张表
    pub fn concat<I: IntoIterator<Item = ResultTable>>(tables: I) -> Self {
        let mut merged = Self::empty();
        for table in tables {
            merged.append(table);
        }
        merged
    }
}

/// 单个抓取任务的执行结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Succeeded { records: usize },
    Failed { error: String },
    /// 同组前序任务失败且配置为中止时，剩余任务不再执行
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemOutcome {
    pub item: WorkItem,
    #[serde(flatten)]
    pub status: ItemStatus,
}

impl ItemOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self.status, ItemStatus::Succeeded { .. })
    }
}

/// 某个交易日的汇总结果：合并后的数据表 + 每个任务的执行情况
#[derive(Debug, Clone, Serialize)]
pub struct DateReport {
    pub trade_date: TradeDate,
    pub table: ResultTable,
    pub outcomes: Vec<ItemOutcome>,
}

impl DateReport {
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }
}

/// 沪深港通股票（港股代码与 A 股代码对照）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HsgtStock {
    pub trade_date: TradeDate,
    pub hkshare_code: String,
    pub ashare_code: String,
    pub name: String,
}

impl HsgtStock {
    pub fn work_item(&self) -> WorkItem {
        WorkItem::new(self.hkshare_code.clone(), Some(self.ashare_code.clone()))
    }
}

/// 单只股票持股明细查询参数
#[derive(Debug, Deserialize)]
pub struct HoldDetailQuery {
    /// 港股代码（如 93883）
    pub hkshare_code: String,
    /// A 股代码（如 603883.SH），为空时使用港股代码
    pub ashare_code: Option<String>,
    /// 查询日期，默认香港时间昨天
    pub date: Option<String>,
}

/// 按日全量抓取参数
#[derive(Debug, Deserialize)]
pub struct DailyCrawlQuery {
    pub date: Option<String>,
    /// 分组数，默认使用配置值
    pub workers: Option<usize>,
}

/// 股票列表查询参数
#[derive(Debug, Deserialize)]
pub struct StockListQuery {
    pub date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_date_accepts_all_formats() {
        let expected = TradeDate(NaiveDate::from_ymd_opt(2024, 7, 9).unwrap());
        for input in ["20240709", "2024/07/09", "2024-07-09", " 20240709 "] {
            assert_eq!(TradeDate::parse(input).unwrap(), expected, "{}", input);
        }
    }

    #[test]
    fn test_trade_date_rejects_malformed() {
        for input in ["2024079", "2024/13/01", "abcdefgh", ""] {
            assert!(
                matches!(TradeDate::parse(input), Err(CrawlError::Configuration(_))),
                "{} 应该被拒绝",
                input
            );
        }
    }

    #[test]
    fn test_trade_date_formats() {
        let date = TradeDate::parse("2023/07/12").unwrap();
        assert_eq!(date.to_string(), "20230712");
        assert_eq!(date.as_query(), "2023/07/12");
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"20230712\"");
    }

    #[test]
    fn test_range_inclusive_crosses_month() {
        let start = TradeDate::parse("20240130").unwrap();
        let end = TradeDate::parse("20240202").unwrap();
        let days: Vec<String> = TradeDate::range_inclusive(start, end)
            .unwrap()
            .iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(days, vec!["20240130", "20240131", "20240201", "20240202"]);
    }

    #[test]
    fn test_range_single_day_and_reversed() {
        let day = TradeDate::parse("20240709").unwrap();
        assert_eq!(TradeDate::range_inclusive(day, day).unwrap(), vec![day]);

        let earlier = TradeDate::parse("20240708").unwrap();
        assert!(TradeDate::range_inclusive(day, earlier).is_err());
    }

    #[test]
    fn test_work_item_output_code() {
        let paired = WorkItem::new("93883", Some("603883.SH".to_string()));
        assert_eq!(paired.output_code(), "603883.SH");

        let bare = WorkItem::new("00700", None);
        assert_eq!(bare.output_code(), "00700");
    }

    #[test]
    fn test_empty_table_keeps_schema() {
        let table = ResultTable::empty();
        assert!(table.is_empty());
        assert_eq!(table.columns(), &HOLD_DETAIL_COLUMNS);

        let merged = ResultTable::concat(vec![ResultTable::empty(), ResultTable::default()]);
        assert_eq!(merged.columns().len(), 6);
        assert_eq!(merged.len(), 0);
    }
}
