//! 规则引擎领域模型

use crate::error::RuleError;
use crate::operators::Operator;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// 表达式树的最大深度（单个叶子为 1）
///
/// 线上格式每层树对应一层 JSON 嵌套，该上限保证编译结果能被 JSON 解析器重新读入。
pub const MAX_TREE_DEPTH: usize = 100;

/// 表达式树节点
///
/// 每个操作符节点独占两个子节点，树在构造后不可变。
/// 线上格式为 `{"type", "value", "left", "right"}`，叶子节点的 left/right 为 null。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireNode")]
pub enum ExpressionNode {
    /// 操作数：保留原始词法单元文本（数字、标识符或带引号的字面量）
    Operand { value: String },
    /// 二元操作符
    Operator {
        operator: Operator,
        left: Box<ExpressionNode>,
        right: Box<ExpressionNode>,
    },
}

impl ExpressionNode {
    pub fn operand(value: impl Into<String>) -> Self {
        Self::Operand {
            value: value.into(),
        }
    }

    pub fn operator(operator: Operator, left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::Operator {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// 从 JSON 值还原表达式树（同时校验节点结构和深度）
    pub fn from_value(value: Value) -> crate::error::Result<Self> {
        if exceeds_depth(&value, MAX_TREE_DEPTH) {
            return Err(RuleError::TreeTooDeep {
                max: MAX_TREE_DEPTH,
            });
        }
        let wire: WireNode = serde_json::from_value(value)?;
        Self::try_from(wire)
    }

    /// 从 JSON 字符串还原表达式树
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn is_operand(&self) -> bool {
        matches!(self, Self::Operand { .. })
    }

    /// 按从左到右的顺序返回所有叶子节点的文本
    pub fn operands(&self) -> Vec<&str> {
        let mut leaves = Vec::new();
        self.collect_operands(&mut leaves);
        leaves
    }

    fn collect_operands<'a>(&'a self, leaves: &mut Vec<&'a str>) {
        match self {
            Self::Operand { value } => leaves.push(value),
            Self::Operator { left, right, .. } => {
                left.collect_operands(leaves);
                right.collect_operands(leaves);
            }
        }
    }

    /// 树的深度（单个叶子为 1）
    pub fn depth(&self) -> usize {
        match self {
            Self::Operand { .. } => 1,
            Self::Operator { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn node_count(&self) -> usize {
        match self {
            Self::Operand { .. } => 1,
            Self::Operator { left, right, .. } => 1 + left.node_count() + right.node_count(),
        }
    }
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operand { value } => write!(f, "{}", value),
            Self::Operator {
                operator,
                left,
                right,
            } => {
                write_child(f, left)?;
                write!(f, " {} ", operator)?;
                write_child(f, right)
            }
        }
    }
}

/// 嵌套的操作符子树一律加括号，保证重新编译得到同一棵树
fn write_child(f: &mut fmt::Formatter<'_>, node: &ExpressionNode) -> fmt::Result {
    if node.is_operand() {
        write!(f, "{}", node)
    } else {
        write!(f, "({})", node)
    }
}

impl Serialize for ExpressionNode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("ExpressionNode", 4)?;
        match self {
            Self::Operand { value } => {
                state.serialize_field("type", &NodeKind::Operand)?;
                state.serialize_field("value", value)?;
                state.serialize_field("left", &Option::<()>::None)?;
                state.serialize_field("right", &Option::<()>::None)?;
            }
            Self::Operator {
                operator,
                left,
                right,
            } => {
                state.serialize_field("type", &NodeKind::Operator)?;
                state.serialize_field("value", operator)?;
                state.serialize_field("left", left)?;
                state.serialize_field("right", right)?;
            }
        }
        state.end()
    }
}

/// 节点类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum NodeKind {
    Operator,
    Operand,
}

/// 线上格式的节点，反序列化后再校验转换为 ExpressionNode
#[derive(Debug, Deserialize)]
struct WireNode {
    #[serde(rename = "type")]
    kind: NodeKind,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    left: Option<Box<WireNode>>,
    #[serde(default)]
    right: Option<Box<WireNode>>,
}

/// 沿 left/right 迭代检查线上格式的嵌套深度，避免在反序列化时深度递归
fn exceeds_depth(value: &Value, max: usize) -> bool {
    let mut pending = vec![(value, 1usize)];
    while let Some((node, depth)) = pending.pop() {
        if depth > max {
            return true;
        }
        for side in ["left", "right"] {
            if let Some(child) = node.get(side).filter(|child| !child.is_null()) {
                pending.push((child, depth + 1));
            }
        }
    }
    false
}

impl TryFrom<WireNode> for ExpressionNode {
    type Error = RuleError;

    fn try_from(node: WireNode) -> std::result::Result<Self, Self::Error> {
        Self::from_wire(node, 1)
    }
}

impl ExpressionNode {
    fn from_wire(node: WireNode, depth: usize) -> crate::error::Result<Self> {
        if depth > MAX_TREE_DEPTH {
            return Err(RuleError::TreeTooDeep {
                max: MAX_TREE_DEPTH,
            });
        }

        match node.kind {
            NodeKind::Operand => {
                if node.left.is_some() || node.right.is_some() {
                    return Err(RuleError::MalformedExpression(
                        "操作数节点不能包含子节点".to_string(),
                    ));
                }

                let value = match node.value {
                    Some(Value::String(s)) => s,
                    Some(Value::Number(n)) => n.to_string(),
                    Some(other) => return Err(RuleError::InvalidOperand(other.to_string())),
                    None => return Err(RuleError::InvalidOperand("null".to_string())),
                };

                Ok(Self::Operand { value })
            }
            NodeKind::Operator => {
                let operator = match &node.value {
                    Some(Value::String(s)) => Operator::from_token(s)
                        .ok_or_else(|| RuleError::UnknownOperator(s.clone()))?,
                    Some(other) => return Err(RuleError::UnknownOperator(other.to_string())),
                    None => return Err(RuleError::UnknownOperator("null".to_string())),
                };

                let (Some(left), Some(right)) = (node.left, node.right) else {
                    return Err(RuleError::MalformedExpression(format!(
                        "操作符 '{}' 缺少左右子节点",
                        operator
                    )));
                };

                Ok(Self::operator(
                    operator,
                    Self::from_wire(*left, depth + 1)?,
                    Self::from_wire(*right, depth + 1)?,
                ))
            }
        }
    }
}

/// 操作数解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum OperandValue {
    /// 数字字面量
    Number(f64),
    /// 字符串字面量（已去除引号）
    Text(String),
    /// 从评估数据中取得的值
    FromData(Value),
}

/// 表达式求值结果
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Bool(bool),
    Number(f64),
    Text(String),
    /// null、数组、对象等无法归类的数据值，原样保留
    Data(Value),
}

impl EvalValue {
    /// 真值判断：false、0、NaN、空字符串、null 为假，其余为真
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(s) => !s.is_empty(),
            Self::Data(Value::Null) => false,
            Self::Data(_) => true,
        }
    }
}

impl From<Value> for EvalValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(b),
            Value::String(s) => Self::Text(s),
            Value::Number(n) => match n.as_f64() {
                Some(f) => Self::Number(f),
                None => Self::Data(Value::Number(n)),
            },
            other => Self::Data(other),
        }
    }
}

impl From<OperandValue> for EvalValue {
    fn from(value: OperandValue) -> Self {
        match value {
            OperandValue::Number(n) => Self::Number(n),
            OperandValue::Text(s) => Self::Text(s),
            OperandValue::FromData(v) => v.into(),
        }
    }
}

impl fmt::Display for EvalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", format_number(*n)),
            Self::Text(s) => write!(f, "{}", s),
            Self::Data(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for EvalValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) if is_integral(*n) => serializer.serialize_i64(*n as i64),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Data(v) => v.serialize(serializer),
        }
    }
}

/// 2^53 以内的整数按整数输出
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER
}

/// 数字的文本形式：整数不带小数点
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if is_integral(n) {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// 评估上下文 - 提供给规则引擎的数据记录
///
/// 字段名精确匹配，不做路径解析。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationContext {
    data: Map<String, Value>,
}

impl EvaluationContext {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// 从 JSON 值创建，要求是对象
    pub fn from_value(value: Value) -> crate::error::Result<Self> {
        match value {
            Value::Object(data) => Ok(Self { data }),
            other => Err(RuleError::InvalidContext(format!(
                "评估数据必须是 JSON 对象，实际为 {}",
                json_type_name(&other)
            ))),
        }
    }

    /// 从 JSON 字符串创建
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// 获取字段值
    pub fn get_field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn contains_field(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// 获取底层数据
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }
}

impl From<Map<String, Value>> for EvaluationContext {
    fn from(data: Map<String, Value>) -> Self {
        Self::new(data)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 评估结果
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub value: EvalValue,
    pub evaluation_trace: Vec<String>,
    pub evaluation_time_us: u64,
}

impl EvaluationResult {
    pub fn new(value: EvalValue) -> Self {
        Self {
            value,
            evaluation_trace: Vec::new(),
            evaluation_time_us: 0,
        }
    }
}
