use actix_web::{web, HttpResponse, Result};
use serde::Serialize;

use crate::models::ApiResponse;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub service: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Result<HttpResponse> {
    let response = ApiResponse::success(HealthStatus {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    });
    Ok(HttpResponse::Ok().json(response))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
