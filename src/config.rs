//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置，环境变量 API_KEY 可覆盖文件中的密钥

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::models::WorkItem;
use crate::services::ccass::{
    FailurePolicy, RetryPolicy, HKEX_HOLD_DETAIL_URL, HKEX_STOCK_LIST_URL,
};

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API Key（为空则不启用认证）
    #[serde(default)]
    pub api_key: String,
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 抓取配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// 默认分组数，同时也是线程池大小
    #[serde(default = "default_crawl_workers")]
    pub workers: usize,
    /// 单个请求最多尝试次数
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
    /// 首次重试等待（毫秒），之后逐次翻倍
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    /// 重试等待上限（毫秒）
    #[serde(default = "default_retry_cap_ms")]
    pub retry_cap_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_hold_detail_url")]
    pub hold_detail_url: String,
    #[serde(default = "default_stock_list_url")]
    pub stock_list_url: String,
    /// 每日 CSV 输出目录
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// 某只股票失败后是否放弃同组剩余股票
    #[serde(default)]
    pub abort_worker_on_error: bool,
    /// 固定抓取列表，为空时按日拉取沪深港通股票列表
    #[serde(default)]
    pub stocks: Vec<WorkItem>,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// API 配置
    #[serde(default)]
    pub api: ApiConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
    /// 抓取配置
    #[serde(default)]
    pub crawl: CrawlConfig,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_timeout() -> u64 { 30 }
fn default_connect_timeout() -> u64 { 10 }
fn default_log_level() -> String { "info".to_string() }
fn default_crawl_workers() -> usize { 10 }
fn default_max_tries() -> u32 { 50 }
fn default_retry_base_ms() -> u64 { 500 }
fn default_retry_cap_ms() -> u64 { 10_000 }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}
fn default_hold_detail_url() -> String { HKEX_HOLD_DETAIL_URL.to_string() }
fn default_stock_list_url() -> String { HKEX_STOCK_LIST_URL.to_string() }
fn default_output_dir() -> String { "ccass_hold_detail".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            workers: default_crawl_workers(),
            max_tries: default_max_tries(),
            retry_base_ms: default_retry_base_ms(),
            retry_cap_ms: default_retry_cap_ms(),
            user_agent: default_user_agent(),
            hold_detail_url: default_hold_detail_url(),
            stock_list_url: default_stock_list_url(),
            output_dir: default_output_dir(),
            abort_worker_on_error: false,
            stocks: Vec::new(),
        }
    }
}

impl CrawlConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_tries: self.max_tries,
            base_delay: Duration::from_millis(self.retry_base_ms),
            max_delay: Duration::from_millis(self.retry_cap_ms),
        }
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::from_abort_flag(self.abort_worker_on_error)
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置，优先从文件，失败则使用默认值
    ///
    /// 此时日志尚未初始化，加载情况由调用方在初始化日志后输出
    pub fn load() -> (Self, String) {
        let config_paths = ["config.json", "config/config.json"];

        let mut notes = Vec::new();
        for path in config_paths {
            if Path::new(path).exists() {
                match Self::from_file(path) {
                    Ok(config) => {
                        return (config.with_env(), format!("从 {} 加载配置成功", path));
                    }
                    Err(e) => notes.push(format!("加载配置文件 {} 失败: {}", path, e)),
                }
            }
        }

        notes.push("使用默认配置".to_string());
        (Self::default().with_env(), notes.join("；"))
    }

    /// 环境变量覆盖
    fn with_env(mut self) -> Self {
        if let Ok(key) = env::var("API_KEY") {
            self.api.api_key = key;
        }
        self
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.crawl.workers, 10);
        assert_eq!(config.crawl.output_dir, "ccass_hold_detail");
        assert_eq!(config.crawl.retry_policy(), RetryPolicy::default());
        assert_eq!(config.crawl.failure_policy(), FailurePolicy::Isolate);
        assert!(config.crawl.stocks.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "server": {"port": 9000},
                "crawl": {
                    "workers": 4,
                    "abort_worker_on_error": true,
                    "stocks": [
                        {"hkshare_code": "93883", "ashare_code": "603883.SH"},
                        {"hkshare_code": "00700"}
                    ]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.log.level, "info");
        assert_eq!(config.crawl.workers, 4);
        assert_eq!(config.crawl.max_tries, 50);
        assert_eq!(config.crawl.hold_detail_url, HKEX_HOLD_DETAIL_URL);
        assert_eq!(config.crawl.failure_policy(), FailurePolicy::AbortWorker);
        assert_eq!(config.crawl.stocks[0].output_code(), "603883.SH");
        assert_eq!(config.crawl.stocks[1].output_code(), "00700");
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("ccass-config-{}.json", std::process::id()));
        fs::write(&path, r#"{"crawl": {"retry_base_ms": 100, "retry_cap_ms": 800}}"#).unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        let policy = config.crawl.retry_policy();
        assert_eq!(policy.base_delay, Duration::from_millis(100));
        assert_eq!(policy.delay_for(5), Duration::from_millis(800));

        fs::write(&path, "not json").unwrap();
        assert!(AppConfig::from_file(&path).is_err());
        fs::remove_file(&path).unwrap();
    }
}
