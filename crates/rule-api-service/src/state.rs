//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use rule_engine::{RuleCompiler, RuleExecutor};
use rule_shared::config::EngineConfig;

/// Axum 应用共享状态
///
/// 规则编译器只携带输入限制，不保存跨请求的状态
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// 带长度、数量和深度限制的规则编译器
    pub compiler: RuleCompiler,
    /// 请求未指定时是否返回评估追踪
    pub trace_enabled: bool,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(compiler: RuleCompiler, trace_enabled: bool) -> Self {
        Self {
            compiler,
            trace_enabled,
        }
    }

    /// 根据引擎配置创建
    pub fn from_config(config: &EngineConfig) -> Self {
        let compiler = RuleCompiler::new()
            .with_max_rule_length(config.max_rule_length)
            .with_max_combine_rules(config.max_combine_rules)
            .with_max_depth(config.max_depth);
        Self::new(compiler, config.trace_enabled)
    }

    /// 构建执行器
    pub fn executor(&self, trace: bool) -> RuleExecutor {
        if trace {
            RuleExecutor::new().with_trace()
        } else {
            RuleExecutor::new()
        }
    }
}
