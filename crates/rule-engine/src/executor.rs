//! 规则执行器
//!
//! 深度优先遍历表达式树求值，可选记录评估追踪信息。
//! 左右子树总是都会被求值（不短路），不修改树和数据。

use crate::error::Result;
use crate::evaluator::OperatorEvaluator;
use crate::models::{EvalValue, EvaluationContext, EvaluationResult, ExpressionNode};
use std::time::Instant;
use tracing::instrument;

/// 规则执行器
#[derive(Debug, Clone, Default)]
pub struct RuleExecutor {
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl RuleExecutor {
    pub fn new() -> Self {
        Self {
            trace_enabled: false,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 对数据求值，只返回结果
    #[instrument(level = "trace", skip_all)]
    pub fn evaluate(&self, node: &ExpressionNode, context: &EvaluationContext) -> Result<EvalValue> {
        self.evaluate_node(node, context, &mut None, "root")
    }

    /// 执行规则评估，附带耗时和追踪信息
    #[instrument(level = "debug", skip_all, fields(nodes = node.node_count()))]
    pub fn execute(
        &self,
        node: &ExpressionNode,
        context: &EvaluationContext,
    ) -> Result<EvaluationResult> {
        let start = Instant::now();

        let mut trace = self.trace_enabled.then(Vec::new);
        let value = self.evaluate_node(node, context, &mut trace, "root")?;

        let mut result = EvaluationResult::new(value);
        result.evaluation_trace = trace.unwrap_or_default();
        result.evaluation_time_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        Ok(result)
    }

    /// 递归评估节点
    fn evaluate_node(
        &self,
        node: &ExpressionNode,
        context: &EvaluationContext,
        trace: &mut Option<Vec<String>>,
        path: &str,
    ) -> Result<EvalValue> {
        match node {
            ExpressionNode::Operand { value } => {
                let resolved: EvalValue =
                    OperatorEvaluator::resolve_operand(value, context).into();

                if let Some(trace) = trace {
                    trace.push(format!("{}: {} => {}", path, value, resolved));
                }

                Ok(resolved)
            }
            ExpressionNode::Operator {
                operator,
                left,
                right,
            } => {
                // 只有记录追踪时才需要子节点路径
                let (left_path, right_path) = if trace.is_some() {
                    (format!("{}.left", path), format!("{}.right", path))
                } else {
                    (String::new(), String::new())
                };

                let left_value = self.evaluate_node(left, context, trace, &left_path)?;
                let right_value = self.evaluate_node(right, context, trace, &right_path)?;

                let result = OperatorEvaluator::apply(*operator, &left_value, &right_value)?;

                if let Some(trace) = trace {
                    trace.push(format!("{}: {} => {}", path, node, result));
                }

                Ok(result)
            }
        }
    }
}

/// 对数据求值表达式树
pub fn evaluate(node: &ExpressionNode, context: &EvaluationContext) -> Result<EvalValue> {
    RuleExecutor::new().evaluate(node, context)
}
