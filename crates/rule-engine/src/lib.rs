//! 规则表达式引擎
//!
//! 将形如 `age > 30 AND department == 'Sales'` 的规则文本编译为二叉表达式树，
//! 并针对一份 JSON 数据求值，支持：
//! - 词法分析和基于调度场算法的解析
//! - 多条规则按 AND / OR 组合
//! - 带类型转换的求值和可选的评估追踪
//! - 表达式树的 JSON 序列化和反序列化

pub mod compiler;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod models;
pub mod operators;
pub mod parser;
pub mod tokenizer;

pub use compiler::{CompiledRule, RuleCompiler, combine_rules, compile_rule};
pub use error::{Result, RuleError};
pub use evaluator::OperatorEvaluator;
pub use executor::{RuleExecutor, evaluate};
pub use models::{
    EvalValue, EvaluationContext, EvaluationResult, ExpressionNode, MAX_TREE_DEPTH, OperandValue,
};
pub use operators::{LogicalOperator, Operator};
pub use parser::ExpressionParser;
pub use tokenizer::tokenize;
