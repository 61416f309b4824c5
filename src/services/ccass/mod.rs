//! 中央结算系统（CCASS）持股明细服务
//!
//! 数据来源：港交所披露易 https://www3.hkexnews.hk/sdw/search/searchsdw.aspx
//!
//! ## 流程
//! - 按交易日拉取沪深港通股票列表（或使用固定列表）作为抓取任务
//! - 任务分组后交给工作线程池，每组在一个线程内顺序抓取、解析
//! - 各组结果经通道汇总到当日累加器，合并后按日落盘

mod accumulator;
mod driver;
mod fetch;
mod hold_detail;
mod orchestrator;
mod parser;
mod partition;
mod pool;
mod sink;
mod stock_list;

pub use accumulator::SharedAccumulator;
pub use driver::{DateRangeDriver, DateSummary};
pub use fetch::{FetchClient, HttpFetchClient, QueryParams, RetryPolicy};
pub use hold_detail::{request_params, HoldDetailClient};
pub use orchestrator::{FailurePolicy, ParallelCrawlOrchestrator};
pub use parser::HtmlRecordExtractor;
pub use partition::divide;
pub use sink::{dataset_name, CsvSink, DatasetSink};
pub use stock_list::{parse_stock_list, FixedWorkList, HsgtStockList, WorkSource};

/// 披露易持股查询页面
pub const HKEX_HOLD_DETAIL_URL: &str = "https://www3.hkexnews.hk/sdw/search/searchsdw.aspx";
/// 披露易股票列表接口
pub const HKEX_STOCK_LIST_URL: &str = "https://www3.hkexnews.hk/sdw/search/stocklist.aspx";
