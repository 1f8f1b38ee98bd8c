//! mmtop 公共模块
//!
//! 提供监控引擎与展示层共享的内容：
//! - 数据模型（目标、会话进程、快照、日志）
//! - 错误类型
//! - 配置加载
//! - API 响应封装

pub mod config;
pub mod errors;
pub mod models;
pub mod response;
