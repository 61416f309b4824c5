//! 通用 API 响应模型
//!
//! 定义统一的 API 响应格式，以及领域错误到 HTTP 状态码的映射

use actix_web::{http::StatusCode, HttpResponse};
use chrono::Utc;
use chrono_tz::Asia::Shanghai;
use serde::{Deserialize, Serialize};

use crate::error::CrawlError;

/// 获取北京时间（UTC+8）
fn get_beijing_time() -> chrono::DateTime<chrono_tz::Tz> {
    Utc::now().with_timezone(&Shanghai)
}

/// 统一 API 响应结构
///
/// - success: 请求是否成功
/// - data: 响应数据（成功时有值）
/// - message: 响应消息
/// - timestamp: 响应时间戳（北京时间）
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
            timestamp: get_beijing_time().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
            timestamp: get_beijing_time().to_rfc3339(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// 将抓取结果包装成 HTTP 响应
    pub fn respond(result: Result<T, CrawlError>) -> HttpResponse {
        match result {
            Ok(data) => HttpResponse::Ok().json(Self::success(data)),
            Err(e) => HttpResponse::build(status_for(&e)).json(Self::error(e.to_string())),
        }
    }
}

/// 错误对应的 HTTP 状态码
///
/// 参数问题返回 400，上游网站不可用或页面改版返回 502
pub fn status_for(err: &CrawlError) -> StatusCode {
    match err {
        CrawlError::Configuration(_) => StatusCode::BAD_REQUEST,
        CrawlError::Fetch { .. } | CrawlError::StructuralParse { .. } | CrawlError::StockList(_) => {
            StatusCode::BAD_GATEWAY
        }
        CrawlError::Persist(_) | CrawlError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
