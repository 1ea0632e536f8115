//! 规则编译器
//!
//! 将规则字符串编译成内存中的表达式树，并支持多条规则按逻辑操作符组合。

use crate::error::{Result, RuleError};
use crate::evaluator::parse_numeric_literal;
use crate::models::{ExpressionNode, MAX_TREE_DEPTH};
use crate::operators::LogicalOperator;
use crate::parser::ExpressionParser;
use crate::tokenizer::tokenize;
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// 编译后的规则
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    /// 原始规则文本（组合规则为渲染后的文本）
    pub source: String,
    /// 表达式树根节点
    pub root: ExpressionNode,
    /// 可能从评估数据中取值的操作数名称（去除引号，按字典序）
    pub referenced_fields: BTreeSet<String>,
}

impl CompiledRule {
    fn new(source: String, root: ExpressionNode) -> Self {
        let referenced_fields = extract_fields(&root);
        Self {
            source,
            root,
            referenced_fields,
        }
    }

    /// 获取根节点
    pub fn root(&self) -> &ExpressionNode {
        &self.root
    }

    pub fn into_root(self) -> ExpressionNode {
        self.root
    }
}

/// 规则编译器
///
/// 不保存跨调用的状态，只携带输入限制。树深度总是有上限，默认为 MAX_TREE_DEPTH。
#[derive(Debug, Clone)]
pub struct RuleCompiler {
    max_rule_length: Option<usize>,
    max_combine_rules: Option<usize>,
    max_depth: usize,
}

impl Default for RuleCompiler {
    fn default() -> Self {
        Self {
            max_rule_length: None,
            max_combine_rules: None,
            max_depth: MAX_TREE_DEPTH,
        }
    }
}

impl RuleCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 限制单条规则的字节长度
    pub fn with_max_rule_length(mut self, max: usize) -> Self {
        self.max_rule_length = Some(max);
        self
    }

    /// 限制一次组合的规则数量
    pub fn with_max_combine_rules(mut self, max: usize) -> Self {
        self.max_combine_rules = Some(max);
        self
    }

    /// 限制表达式树深度，不能超过 MAX_TREE_DEPTH
    pub fn with_max_depth(mut self, max: usize) -> Self {
        self.max_depth = max.min(MAX_TREE_DEPTH);
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// 编译单条规则
    #[instrument(level = "debug", skip(self))]
    pub fn compile(&self, rule: &str) -> Result<CompiledRule> {
        let root = self.parse_rule(rule)?;
        Ok(CompiledRule::new(rule.to_string(), root))
    }

    /// 编译并组合多条规则
    ///
    /// 从左到右折叠：每一步以已累积的树为左子树、下一棵树为右子树。
    /// 只有一条规则时直接返回该规则的树。
    #[instrument(level = "debug", skip(self, rules), fields(count = rules.len()))]
    pub fn combine<S: AsRef<str>>(
        &self,
        rules: &[S],
        operator: LogicalOperator,
    ) -> Result<CompiledRule> {
        if let Some(max) = self.max_combine_rules {
            if rules.len() > max {
                return Err(RuleError::TooManyRules {
                    count: rules.len(),
                    max,
                });
            }
        }

        let mut trees = rules.iter().map(|rule| self.parse_rule(rule.as_ref()));

        let mut combined = trees.next().ok_or(RuleError::EmptyInput)??;
        let mut depth = combined.depth();
        for tree in trees {
            let tree = tree?;
            depth = 1 + depth.max(tree.depth());
            if depth > self.max_depth {
                return Err(RuleError::TreeTooDeep {
                    max: self.max_depth,
                });
            }
            combined = ExpressionNode::operator(operator.into(), combined, tree);
        }

        let source = if rules.len() == 1 {
            rules[0].as_ref().to_string()
        } else {
            combined.to_string()
        };

        debug!(nodes = combined.node_count(), "rules combined");
        Ok(CompiledRule::new(source, combined))
    }

    fn parse_rule(&self, rule: &str) -> Result<ExpressionNode> {
        if let Some(max) = self.max_rule_length {
            if rule.len() > max {
                return Err(RuleError::RuleTooLong {
                    length: rule.len(),
                    max,
                });
            }
        }

        let tokens = tokenize(rule);
        debug!(tokens = tokens.len(), "rule tokenized");
        ExpressionParser::with_max_depth(self.max_depth).parse_tokens(&tokens)
    }
}

/// 编译规则字符串为表达式树
pub fn compile_rule(rule: &str) -> Result<ExpressionNode> {
    RuleCompiler::new().compile(rule).map(CompiledRule::into_root)
}

/// 将多条规则组合为一棵表达式树
pub fn combine_rules<S: AsRef<str>>(
    rules: &[S],
    operator: LogicalOperator,
) -> Result<ExpressionNode> {
    RuleCompiler::new()
        .combine(rules, operator)
        .map(CompiledRule::into_root)
}

/// 提取规则中可能引用数据字段的操作数
fn extract_fields(node: &ExpressionNode) -> BTreeSet<String> {
    node.operands()
        .into_iter()
        .filter(|operand| parse_numeric_literal(operand).is_none())
        .map(|operand| crate::evaluator::strip_quotes(operand).to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
