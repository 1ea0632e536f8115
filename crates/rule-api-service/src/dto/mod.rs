//! 规则服务 DTO 模块
//!
//! 包含所有请求和响应的数据传输对象

pub mod request;
pub mod response;

pub use request::{CombineRulesRequest, CompileRuleRequest, EvaluateRuleRequest};
pub use response::{ApiResponse, CompiledRuleDto, EvaluationDto};
