//! 操作数解析与操作符求值
//!
//! 实现叶子节点的三路解析（数字字面量 / 数据字段 / 字符串字面量）
//! 以及逻辑、关系操作符的类型转换规则。

use crate::error::{Result, RuleError};
use crate::models::{EvalValue, EvaluationContext, OperandValue};
use crate::operators::Operator;

/// 操作符求值器
pub struct OperatorEvaluator;

impl OperatorEvaluator {
    /// 解析操作数
    ///
    /// 1. 能识别为数字字面量时返回数字；
    /// 2. 否则去掉首尾各一个单引号，若数据中存在同名字段则返回字段值；
    /// 3. 否则返回去引号后的文本。
    pub fn resolve_operand(value: &str, context: &EvaluationContext) -> OperandValue {
        if let Some(n) = parse_numeric_literal(value) {
            return OperandValue::Number(n);
        }

        let key = strip_quotes(value);
        match context.get_field(key) {
            Some(field) => OperandValue::FromData(field.clone()),
            None => OperandValue::Text(key.to_string()),
        }
    }

    /// 对已求值的左右操作数应用操作符
    pub fn apply(operator: Operator, left: &EvalValue, right: &EvalValue) -> Result<EvalValue> {
        match operator {
            Operator::And => Ok(EvalValue::Bool(left.is_truthy() && right.is_truthy())),
            Operator::Or => Ok(EvalValue::Bool(left.is_truthy() || right.is_truthy())),
            Operator::Eq | Operator::Gt | Operator::Lt => Self::compare(operator, left, right),
        }
    }

    /// 关系比较
    ///
    /// 两侧都是字符串时 `==` 做精确字符串比较；其余情况两侧都转为数字比较，
    /// 字符串之间的 `>`、`<` 也按数字比较，不做字典序比较。
    fn compare(operator: Operator, left: &EvalValue, right: &EvalValue) -> Result<EvalValue> {
        if let (Operator::Eq, EvalValue::Text(l), EvalValue::Text(r)) = (operator, left, right) {
            return Ok(EvalValue::Bool(l == r));
        }

        let (Some(l), Some(r)) = (Self::to_number(left), Self::to_number(right)) else {
            return Err(RuleError::InvalidComparison {
                left: left.to_string(),
                right: right.to_string(),
            });
        };

        let matched = match operator {
            Operator::Gt => l > r,
            Operator::Lt => l < r,
            Operator::Eq => l == r,
            Operator::And | Operator::Or => {
                return Err(RuleError::UnknownOperator(operator.to_string()));
            }
        };

        Ok(EvalValue::Bool(matched))
    }

    /// 关系比较时的数字转换：数字原样返回，字符串取最长的数字前缀
    fn to_number(value: &EvalValue) -> Option<f64> {
        match value {
            EvalValue::Number(n) if !n.is_nan() => Some(*n),
            EvalValue::Text(s) => parse_float_prefix(s),
            _ => None,
        }
    }
}

/// 去掉首尾各一个单引号（两端独立处理）
pub fn strip_quotes(value: &str) -> &str {
    let value = value.strip_prefix('\'').unwrap_or(value);
    value.strip_suffix('\'').unwrap_or(value)
}

/// 识别数字字面量
///
/// 整个文本必须是一个数字：十进制（可带符号、小数、指数）、`Infinity`，
/// 或 `0x`/`0o`/`0b` 前缀的整数。空白文本视为 0。`NaN`、`inf` 等写法不是数字。
pub fn parse_numeric_literal(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0.0);
    }

    if let Some(n) = parse_radix_literal(text) {
        return Some(n);
    }

    let (sign, unsigned) = split_sign(text);
    if unsigned == "Infinity" {
        return Some(sign * f64::INFINITY);
    }

    let valid_chars = unsigned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !valid_chars || !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }

    unsigned.parse::<f64>().ok().map(|n| sign * n)
}

/// 解析数字前缀（忽略前导空白，取最长的合法十进制前缀）
pub fn parse_float_prefix(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let (sign, unsigned) = split_sign(text);
    if unsigned.starts_with("Infinity") {
        return Some(sign * f64::INFINITY);
    }

    let bytes = unsigned.as_bytes();
    let mut end = 0;
    let mut digits = 0;

    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return None;
    }

    // 指数部分后面必须跟数字才计入
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    unsigned[..end].parse::<f64>().ok().map(|n| sign * n)
}

fn split_sign(text: &str) -> (f64, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (-1.0, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (1.0, rest)
    } else {
        (1.0, text)
    }
}

/// `0x`/`0o`/`0b` 前缀整数，不允许符号
fn parse_radix_literal(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    if bytes.len() < 3 || bytes[0] != b'0' {
        return None;
    }

    let radix = match bytes[1] {
        b'x' | b'X' => 16,
        b'o' | b'O' => 8,
        b'b' | b'B' => 2,
        _ => return None,
    };

    text[2..].chars().try_fold(0.0_f64, |acc, c| {
        c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
    })
}
