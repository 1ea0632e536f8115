//! 规则操作符定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 表达式操作符
///
/// 所有操作符都是二元、左结合的。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    // 逻辑运算
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,

    // 关系比较
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "==")]
    Eq,
}

impl Operator {
    /// 按词法单元识别操作符（区分大小写）
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            ">" => Some(Self::Gt),
            "<" => Some(Self::Lt),
            "==" => Some(Self::Eq),
            _ => None,
        }
    }

    /// 优先级：OR < AND < 关系比较
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Gt | Self::Lt | Self::Eq => 3,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Eq => "==",
        }
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// 逻辑操作符（用于组合多条规则）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl From<LogicalOperator> for Operator {
    fn from(op: LogicalOperator) -> Self {
        match op {
            LogicalOperator::And => Operator::And,
            LogicalOperator::Or => Operator::Or,
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}
