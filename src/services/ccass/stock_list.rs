//! 沪深港通股票列表
//!
//! 披露网站按日期提供可查询的股票列表，名称中带有 "(A #600000)" 标记的
//! 即为沪深港通股票，据此得到港股代码与 A 股代码的对照

use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;

use super::fetch::FetchClient;
use crate::error::{CrawlError, CrawlResult};
use crate::models::{HsgtStock, TradeDate, WorkItem};

/// 股票列表中的一项，`c` 为港股代码，`n` 为名称
#[derive(Debug, Deserialize)]
struct StockListEntry {
    #[serde(rename = "c")]
    code: String,
    #[serde(rename = "n")]
    name: String,
}

/// 严格按 JSON 解析股票列表响应，只保留带 A 股代码的股票
pub fn parse_stock_list(text: &str, trade_date: &TradeDate) -> CrawlResult<Vec<HsgtStock>> {
    let entries: Vec<StockListEntry> =
        serde_json::from_str(text.trim()).map_err(|e| CrawlError::StockList(e.to_string()))?;

    let pattern = Regex::new(r"\(A #(\d+)\)")
        .map_err(|e| CrawlError::Configuration(e.to_string()))?;

    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let ashare_code = extract_ashare_code(&pattern, &entry.name)?;
            Some(HsgtStock {
                trade_date: *trade_date,
                hkshare_code: entry.code.trim().to_string(),
                ashare_code,
                name: entry.name.trim().to_string(),
            })
        })
        .collect())
}

/// 从名称中提取 A 股代码，6 开头为上交所，其余为深交所
fn extract_ashare_code(pattern: &Regex, name: &str) -> Option<String> {
    let code = pattern.captures(name)?.get(1)?.as_str();
    let suffix = if code.starts_with('6') { "SH" } else { "SZ" };
    Some(format!("{}.{}", code, suffix))
}

/// 按交易日提供抓取任务的来源
pub trait WorkSource: Send + Sync {
    fn work_items(&self, trade_date: &TradeDate) -> CrawlResult<Vec<WorkItem>>;
}

/// 固定任务列表，每个交易日相同
pub struct FixedWorkList(pub Vec<WorkItem>);

impl WorkSource for FixedWorkList {
    fn work_items(&self, _trade_date: &TradeDate) -> CrawlResult<Vec<WorkItem>> {
        Ok(self.0.clone())
    }
}

/// 每个交易日从披露网站拉取当日的沪深港通股票列表
pub struct HsgtStockList {
    fetcher: Arc<dyn FetchClient>,
    url: String,
}

impl HsgtStockList {
    pub fn new(fetcher: Arc<dyn FetchClient>, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }

    pub fn fetch(&self, trade_date: &TradeDate) -> CrawlResult<Vec<HsgtStock>> {
        let params = [
            ("sortby", "stockcode".to_string()),
            ("shareholdingdate", trade_date.to_string()),
        ];
        let text = self.fetcher.fetch(&self.url, &params)?;
        let stocks = parse_stock_list(&text, trade_date)?;
        log::info!("{} 沪深港通股票共 {} 只", trade_date, stocks.len());
        Ok(stocks)
    }
}

impl WorkSource for HsgtStockList {
    fn work_items(&self, trade_date: &TradeDate) -> CrawlResult<Vec<WorkItem>> {
        Ok(self
            .fetch(trade_date)?
            .iter()
            .map(HsgtStock::work_item)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const SAMPLE: &str = r#"[
        {"c":"00001","n":"CKH HOLDINGS"},
        {"c":"90000","n":"PING AN BANK (A #000001)"},
        {"c":"93883","n":"LAOBAIXING (A #603883)"},
        {"c":"77001","n":"ZHEJIANG NHU (A #002001)"}
    ]"#;

    fn date() -> TradeDate {
        TradeDate::parse("20240709").unwrap()
    }

    #[test]
    fn test_parse_stock_list_derives_ashare_codes() {
        let stocks = parse_stock_list(SAMPLE, &date()).unwrap();
        let codes: Vec<(&str, &str)> = stocks
            .iter()
            .map(|s| (s.hkshare_code.as_str(), s.ashare_code.as_str()))
            .collect();
        assert_eq!(
            codes,
            vec![
                ("90000", "000001.SZ"),
                ("93883", "603883.SH"),
                ("77001", "002001.SZ")
            ]
        );
        assert!(stocks.iter().all(|s| s.trade_date == date()));
    }

    #[test]
    fn test_parse_stock_list_rejects_non_json() {
        let err = parse_stock_list("__import__('os').system('ls')", &date()).unwrap_err();
        assert!(matches!(err, CrawlError::StockList(_)));

        let err = parse_stock_list(r#"[{"c":"00001"}]"#, &date()).unwrap_err();
        assert!(matches!(err, CrawlError::StockList(_)));
    }

    struct RecordingFetcher {
        body: String,
        seen: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl FetchClient for RecordingFetcher {
        fn fetch(&self, _url: &str, params: &[(&'static str, String)]) -> CrawlResult<String> {
            self.seen.lock().unwrap().push(
                params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            );
            Ok(self.body.clone())
        }
    }

    #[test]
    fn test_hsgt_source_builds_work_items() {
        let fetcher = Arc::new(RecordingFetcher {
            body: SAMPLE.to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let source = HsgtStockList::new(fetcher.clone(), "http://example.test/stocklist.aspx");

        let items = source.work_items(&date()).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].hkshare_code(), "93883");
        assert_eq!(items[1].output_code(), "603883.SH");

        let seen = fetcher.seen.lock().unwrap();
        assert_eq!(
            seen[0],
            vec![
                ("sortby".to_string(), "stockcode".to_string()),
                ("shareholdingdate".to_string(), "20240709".to_string())
            ]
        );
    }
}
