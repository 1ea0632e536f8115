//! 表达式解析器
//!
//! 基于调度场（shunting-yard）算法，将词法单元序列归约为一棵二叉表达式树。
//! 同级操作符从左到右归约（左结合）。树的深度在归约时检查，不会超过上限。

use crate::error::{Result, RuleError};
use crate::models::{ExpressionNode, MAX_TREE_DEPTH};
use crate::operators::Operator;

/// 操作符栈中的元素，附带其在词法单元序列中的位置
#[derive(Debug, Clone, Copy)]
enum StackEntry {
    LeftParen(usize),
    Operator(Operator, usize),
}

/// 表达式解析器
///
/// 每次解析使用独立的栈状态，不在调用之间共享。
/// 结果栈中的每棵子树都带有其深度。
#[derive(Debug)]
pub struct ExpressionParser {
    operators: Vec<StackEntry>,
    output: Vec<(ExpressionNode, usize)>,
    max_depth: usize,
}

impl Default for ExpressionParser {
    fn default() -> Self {
        Self::with_max_depth(MAX_TREE_DEPTH)
    }
}

impl ExpressionParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定树深度上限（不超过 MAX_TREE_DEPTH）
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            operators: Vec::new(),
            output: Vec::new(),
            max_depth: max_depth.min(MAX_TREE_DEPTH),
        }
    }

    /// 使用默认深度上限解析词法单元序列
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<ExpressionNode> {
        Self::new().parse_tokens(tokens)
    }

    /// 解析词法单元序列
    pub fn parse_tokens<S: AsRef<str>>(mut self, tokens: &[S]) -> Result<ExpressionNode> {
        for (position, token) in tokens.iter().enumerate() {
            self.push_token(token.as_ref(), position)?;
        }
        self.finish()
    }

    fn push_token(&mut self, token: &str, position: usize) -> Result<()> {
        match token {
            "(" => self.operators.push(StackEntry::LeftParen(position)),
            ")" => self.close_paren(position)?,
            _ => match Operator::from_token(token) {
                Some(op) => self.push_operator(op, position)?,
                None => self.output.push((ExpressionNode::operand(token), 1)),
            },
        }
        Ok(())
    }

    /// 归约到最近的左括号并丢弃它
    fn close_paren(&mut self, position: usize) -> Result<()> {
        loop {
            match self.operators.pop() {
                Some(StackEntry::LeftParen(_)) => return Ok(()),
                Some(StackEntry::Operator(op, op_position)) => self.reduce(op, op_position)?,
                None => {
                    return Err(RuleError::MalformedExpression(format!(
                        "位置 {} 的右括号没有匹配的左括号",
                        position
                    )));
                }
            }
        }
    }

    /// 先归约栈顶优先级不低于当前操作符的操作符，再压栈
    fn push_operator(&mut self, op: Operator, position: usize) -> Result<()> {
        while let Some(StackEntry::Operator(top, top_position)) = self.operators.last().copied() {
            if top.precedence() < op.precedence() {
                break;
            }
            self.operators.pop();
            self.reduce(top, top_position)?;
        }

        self.operators.push(StackEntry::Operator(op, position));
        Ok(())
    }

    /// 弹出两个节点构造操作符节点：先弹出的为右子树，后弹出的为左子树
    fn reduce(&mut self, op: Operator, position: usize) -> Result<()> {
        let (Some((right, right_depth)), Some((left, left_depth))) =
            (self.output.pop(), self.output.pop())
        else {
            return Err(RuleError::MalformedExpression(format!(
                "位置 {} 的操作符 '{}' 缺少操作数",
                position, op
            )));
        };

        let depth = 1 + left_depth.max(right_depth);
        if depth > self.max_depth {
            return Err(RuleError::TreeTooDeep {
                max: self.max_depth,
            });
        }

        self.output
            .push((ExpressionNode::operator(op, left, right), depth));
        Ok(())
    }

    fn finish(mut self) -> Result<ExpressionNode> {
        while let Some(entry) = self.operators.pop() {
            match entry {
                StackEntry::Operator(op, position) => self.reduce(op, position)?,
                StackEntry::LeftParen(position) => {
                    return Err(RuleError::MalformedExpression(format!(
                        "位置 {} 的左括号没有闭合",
                        position
                    )));
                }
            }
        }

        let (root, _) = self.output.pop().ok_or_else(|| {
            RuleError::MalformedExpression("表达式为空".to_string())
        })?;

        if !self.output.is_empty() {
            return Err(RuleError::MalformedExpression(format!(
                "表达式包含 {} 个未被操作符连接的部分",
                self.output.len() + 1
            )));
        }

        Ok(root)
    }
}

/// 解析词法单元序列为表达式树
pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<ExpressionNode> {
    ExpressionParser::parse(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn parse_str(rule: &str) -> Result<ExpressionNode> {
        parse(&tokenize(rule))
    }

    fn op(o: Operator, left: ExpressionNode, right: ExpressionNode) -> ExpressionNode {
        ExpressionNode::operator(o, left, right)
    }

    fn leaf(v: &str) -> ExpressionNode {
        ExpressionNode::operand(v)
    }

    #[test]
    fn test_single_operand() {
        assert_eq!(parse_str("age").unwrap(), leaf("age"));
    }

    #[test]
    fn test_simple_comparison() {
        assert_eq!(
            parse_str("age > 30").unwrap(),
            op(Operator::Gt, leaf("age"), leaf("30"))
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        assert_eq!(
            parse_str("a OR b AND c").unwrap(),
            op(Operator::Or, leaf("a"), op(Operator::And, leaf("b"), leaf("c")))
        );
    }

    #[test]
    fn test_equal_precedence_is_left_associative() {
        assert_eq!(
            parse_str("a AND b AND c").unwrap(),
            op(Operator::And, op(Operator::And, leaf("a"), leaf("b")), leaf("c"))
        );
    }

    #[test]
    fn test_parentheses_override_precedence() {
        assert_eq!(
            parse_str("(a OR b) AND c").unwrap(),
            op(Operator::And, op(Operator::Or, leaf("a"), leaf("b")), leaf("c"))
        );
    }

    #[test]
    fn test_redundant_parentheses() {
        assert_eq!(parse_str("((age > 30))").unwrap(), parse_str("age > 30").unwrap());
    }

    #[test]
    fn test_accepts_borrowed_tokens() {
        let tokens = ["x", "==", "1"];
        assert_eq!(
            parse(&tokens).unwrap(),
            op(Operator::Eq, leaf("x"), leaf("1"))
        );
    }

    #[test]
    fn test_empty_input_is_malformed() {
        assert!(matches!(parse_str(""), Err(RuleError::MalformedExpression(_))));
        assert!(matches!(parse_str("()"), Err(RuleError::MalformedExpression(_))));
    }

    #[test]
    fn test_dangling_operator_is_malformed() {
        for rule in ["AND age", "age >", "age > 30 AND", "OR"] {
            assert!(
                matches!(parse_str(rule), Err(RuleError::MalformedExpression(_))),
                "rule: {}",
                rule
            );
        }
    }

    #[test]
    fn test_unbalanced_parentheses_are_malformed() {
        let err = parse_str("(age > 30").unwrap_err();
        assert!(err.to_string().contains("左括号"));

        let err = parse_str("age > 30)").unwrap_err();
        assert!(err.to_string().contains("右括号"));
    }

    #[test]
    fn test_depth_limit() {
        // 左结合的链每多一个条件深度加一
        let chain = |n: usize| vec!["a > 1"; n].join(" AND ");

        let tokens = tokenize(&chain(4));
        assert_eq!(
            ExpressionParser::with_max_depth(5).parse_tokens(&tokens).unwrap().depth(),
            5
        );

        let tokens = tokenize(&chain(5));
        let err = ExpressionParser::with_max_depth(5)
            .parse_tokens(&tokens)
            .unwrap_err();
        assert!(matches!(err, RuleError::TreeTooDeep { max: 5 }));
    }

    #[test]
    fn test_depth_limit_is_capped() {
        let parser = ExpressionParser::with_max_depth(usize::MAX);
        assert_eq!(parser.max_depth, MAX_TREE_DEPTH);
    }

    #[test]
    fn test_deep_right_nesting_is_rejected() {
        let depth = MAX_TREE_DEPTH + 10;
        let rule = format!("{}a{}", "(a AND ".repeat(depth), ")".repeat(depth));
        let err = parse_str(&rule).unwrap_err();
        assert!(matches!(err, RuleError::TreeTooDeep { max: MAX_TREE_DEPTH }));
    }

    #[test]
    fn test_unconnected_operands_are_malformed() {
        let err = parse_str("age 30").unwrap_err();
        assert!(matches!(err, RuleError::MalformedExpression(_)));
    }
}
