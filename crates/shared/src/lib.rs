//! 共享库
//!
//! 包含规则服务共用的配置加载和可观测性（日志、指标、HTTP 中间件）基础设施代码。

pub mod config;
pub mod observability;
