//! 带重试的 HTTP 抓取客户端
//!
//! 工作线程是普通的操作系统线程，这里使用 reqwest 的阻塞客户端。
//! 每次尝试有独立的超时，超出最大尝试次数后返回 `CrawlError::Fetch`。

use log::{debug, warn};
use reqwest::blocking::Client;
use std::thread;
use std::time::Duration;
use url::Url;

use crate::error::{CrawlError, CrawlResult};

/// 查询参数（键固定，值随日期和代码变化）
pub type QueryParams = [(&'static str, String)];

/// 抓取客户端
///
/// 给定 URL 和查询参数返回响应正文；重试、超时由实现自行负责
pub trait FetchClient: Send + Sync {
    fn fetch(&self, url: &str, params: &QueryParams) -> CrawlResult<String>;
}

/// 重试策略：指数退避并设上限
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_tries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: 50,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// 第 `attempt` 次（从 1 开始）失败后的等待时间
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let factor = 1u32.checked_shl(exp).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// 按策略反复执行 `op`，直到成功或次数耗尽
    pub fn run<F>(&self, target: &str, mut op: F) -> CrawlResult<String>
    where
        F: FnMut() -> Result<String, String>,
    {
        let max_tries = self.max_tries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_tries {
            match op() {
                Ok(body) => return Ok(body),
                Err(e) => {
                    last_error = e;
                    if attempt < max_tries {
                        let delay = self.delay_for(attempt);
                        warn!(
                            "请求 {} 第 {}/{} 次失败: {}，{:?} 后重试",
                            target, attempt, max_tries, last_error, delay
                        );
                        thread::sleep(delay);
                    }
                }
            }
        }

        Err(CrawlError::Fetch {
            url: target.to_string(),
            attempts: max_tries,
            message: last_error,
        })
    }
}

/// 基于 reqwest 阻塞客户端的实现
pub struct HttpFetchClient {
    client: Client,
    policy: RetryPolicy,
}

impl HttpFetchClient {
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        connect_timeout: Duration,
        policy: RetryPolicy,
    ) -> CrawlResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .gzip(true)
            .cookie_store(true)
            .build()
            .map_err(|e| CrawlError::Configuration(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self { client, policy })
    }

    fn get_once(&self, url: &Url) -> Result<String, String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP 状态码 {}", status));
        }

        response.text().map_err(|e| e.to_string())
    }
}

impl FetchClient for HttpFetchClient {
    fn fetch(&self, url: &str, params: &QueryParams) -> CrawlResult<String> {
        let url = Url::parse_with_params(url, params.iter().map(|(k, v)| (*k, v.as_str())))
            .map_err(|e| CrawlError::Configuration(format!("无效的 URL {}: {}", url, e)))?;

        debug!("📡 请求 URL: {}", url);
        self.policy.run(url.as_str(), || self.get_once(&url))
    }
}
