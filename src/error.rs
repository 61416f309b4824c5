//! 抓取流程的错误类型

use thiserror::Error;

/// 抓取、解析、落盘过程中可能出现的错误
///
/// 注意：某日无披露数据不是错误，解析器会返回带固定列的空表
#[derive(Debug, Error)]
pub enum CrawlError {
    /// 配置错误（分组数、日期区间、URL 等），在发起任何网络请求前失败
    #[error("配置错误: {0}")]
    Configuration(String),

    /// 重试次数耗尽后仍未取得响应
    #[error("请求 {url} 失败（共尝试 {attempts} 次）: {message}")]
    Fetch {
        url: String,
        attempts: u32,
        message: String,
    },

    /// 页面结构与预期不符
    #[error("页面结构不匹配（第 {row} 行，字段 {field}）: {detail}")]
    StructuralParse {
        row: usize,
        field: &'static str,
        detail: String,
    },

    /// 股票列表响应不是预期的 JSON 结构
    #[error("股票列表解析失败: {0}")]
    StockList(String),

    /// 数据写入失败
    #[error("数据写入失败: {0}")]
    Persist(String),

    /// 工作线程池无法创建或已关闭
    #[error("工作线程错误: {0}")]
    Worker(String),
}

impl CrawlError {
    pub fn structural(row: usize, field: &'static str, detail: impl Into<String>) -> Self {
        Self::StructuralParse {
            row,
            field,
            detail: detail.into(),
        }
    }
}

impl From<std::io::Error> for CrawlError {
    fn from(err: std::io::Error) -> Self {
        CrawlError::Persist(err.to_string())
    }
}

impl From<csv::Error> for CrawlError {
    fn from(err: csv::Error) -> Self {
        CrawlError::Persist(err.to_string())
    }
}

pub type CrawlResult<T> = std::result::Result<T, CrawlError>;
