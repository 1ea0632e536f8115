//! 规则引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("表达式格式错误: {0}")]
    MalformedExpression(String),

    #[error("没有提供需要组合的规则")]
    EmptyInput,

    #[error("无效的操作数: {0}")]
    InvalidOperand(String),

    #[error("无法比较 {left} 和 {right}")]
    InvalidComparison { left: String, right: String },

    #[error("未知的操作符: {0}")]
    UnknownOperator(String),

    #[error("规则长度 {length} 超过上限 {max}")]
    RuleTooLong { length: usize, max: usize },

    #[error("组合规则数量 {count} 超过上限 {max}")]
    TooManyRules { count: usize, max: usize },

    #[error("表达式树深度超过上限 {max}")]
    TreeTooDeep { max: usize },

    #[error("无效的评估数据: {0}")]
    InvalidContext(String),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RuleError {
    /// 稳定的错误码，供边界层映射响应
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedExpression(_) => "MALFORMED_EXPRESSION",
            Self::EmptyInput => "EMPTY_INPUT",
            Self::InvalidOperand(_) => "INVALID_OPERAND",
            Self::InvalidComparison { .. } => "INVALID_COMPARISON",
            Self::UnknownOperator(_) => "UNKNOWN_OPERATOR",
            Self::RuleTooLong { .. } => "RULE_TOO_LONG",
            Self::TooManyRules { .. } => "TOO_MANY_RULES",
            Self::TreeTooDeep { .. } => "TREE_TOO_DEEP",
            Self::InvalidContext(_) => "INVALID_CONTEXT",
            Self::JsonError(_) => "JSON_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
