//! 单只股票单日持股明细：拼装请求参数、抓取、解析

use log::debug;
use std::sync::Arc;

use super::fetch::FetchClient;
use super::parser::HtmlRecordExtractor;
use crate::error::CrawlResult;
use crate::models::{ResultTable, TradeDate, WorkItem};

/// 披露网站持股查询表单参数
pub fn request_params(item: &WorkItem, trade_date: &TradeDate) -> Vec<(&'static str, String)> {
    vec![
        ("__EVENTTARGET", "btnSearch".to_string()),
        ("__EVENTARGUMENT", String::new()),
        ("sortBy", "participantid".to_string()),
        ("sortDirection", "asc".to_string()),
        ("alertMsg", String::new()),
        ("txtShareholdingDate", trade_date.as_query()),
        ("txtStockCode", item.hkshare_code().to_string()),
    ]
}

/// 持股明细查询客户端，可廉价克隆后分发到各工作线程
#[derive(Clone)]
pub struct HoldDetailClient {
    fetcher: Arc<dyn FetchClient>,
    extractor: Arc<HtmlRecordExtractor>,
    url: Arc<str>,
}

impl HoldDetailClient {
    pub fn new(
        fetcher: Arc<dyn FetchClient>,
        extractor: Arc<HtmlRecordExtractor>,
        url: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            url: url.into(),
        }
    }

    /// 抓取并解析一只股票在某日的持股明细
    ///
    /// 记录中的 stock_code 使用任务的 A 股代码（缺省时为港股代码）
    pub fn fetch(&self, item: &WorkItem, trade_date: &TradeDate) -> CrawlResult<ResultTable> {
        let params = request_params(item, trade_date);
        let html = self.fetcher.fetch(&self.url, &params)?;
        let table = self
            .extractor
            .parse(&html, item.output_code(), trade_date)?;

        debug!(
            "[{}] {} -> {} 条持股记录",
            trade_date,
            item.hkshare_code(),
            table.len()
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ccass::testing::{fixture_page, StubFetcher};

    #[test]
    fn test_request_params_shape() {
        let item = WorkItem::new("93883", Some("603883.SH".to_string()));
        let date = TradeDate::parse("20230712").unwrap();
        let params = request_params(&item, &date);

        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("sortBy"), Some("participantid"));
        assert_eq!(get("sortDirection"), Some("asc"));
        assert_eq!(get("txtShareholdingDate"), Some("2023/07/12"));
        assert_eq!(get("txtStockCode"), Some("93883"));
        assert_eq!(get("__EVENTTARGET"), Some("btnSearch"));
    }

    #[test]
    fn test_fetch_uses_secondary_code() {
        let fetcher = Arc::new(StubFetcher::new(|code, _date| {
            Ok(fixture_page(&[(format!("{}-P1", code).as_str(), "1,000", "1.00%")]))
        }));
        let client = HoldDetailClient::new(
            fetcher.clone(),
            Arc::new(HtmlRecordExtractor::new().unwrap()),
            "http://example.test/searchsdw.aspx",
        );

        let date = TradeDate::parse("20240709").unwrap();
        let table = client
            .fetch(&WorkItem::new("93883", Some("603883.SH".to_string())), &date)
            .unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].stock_code, "603883.SH");
        assert_eq!(table.records()[0].participant_id, "93883-P1");
        assert_eq!(fetcher.calls(), vec![("93883".to_string(), "2024/07/09".to_string())]);
    }
}
