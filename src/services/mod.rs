//! 业务逻辑服务模块
//! 
//! 封装数据抓取、解析和落盘逻辑

pub mod ccass; // 中央结算系统持股明细
