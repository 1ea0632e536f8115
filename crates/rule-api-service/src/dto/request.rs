//! 请求 DTO 定义
//!
//! 所有 REST API 的请求体结构，字段采用 camelCase

use std::borrow::Cow;

use rule_engine::LogicalOperator;
use serde::Deserialize;
use serde_json::Value;
use validator::{Validate, ValidationError};

/// 编译规则请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompileRuleRequest {
    #[validate(length(min = 1, message = "ruleString 不能为空"))]
    pub rule_string: String,
}

/// 组合规则请求
///
/// 空列表交给规则引擎处理，返回 EMPTY_INPUT。
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CombineRulesRequest {
    #[validate(custom(function = "validate_rule_strings"))]
    pub rule_strings: Vec<String>,
    /// 组合操作符，默认 AND
    #[serde(default)]
    pub operator: LogicalOperator,
}

/// 评估规则请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRuleRequest {
    /// 线上格式的表达式树
    #[validate(custom(function = "validate_ast"))]
    pub ast: Value,
    /// 评估数据，必须是 JSON 对象
    #[validate(custom(function = "validate_user_data"))]
    pub user_data: Value,
    /// 是否返回评估追踪，未指定时使用服务配置
    #[serde(default)]
    pub trace: Option<bool>,
}

fn validation_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// 每条规则都不能是空字符串
fn validate_rule_strings(rules: &[String]) -> Result<(), ValidationError> {
    if rules.iter().any(|rule| rule.is_empty()) {
        return Err(validation_error("empty_rule", "ruleStrings 不能包含空规则"));
    }
    Ok(())
}

fn validate_ast(ast: &Value) -> Result<(), ValidationError> {
    if ast.is_null() {
        return Err(validation_error("required", "ast 不能为空"));
    }
    Ok(())
}

fn validate_user_data(user_data: &Value) -> Result<(), ValidationError> {
    if !user_data.is_object() {
        return Err(validation_error("not_object", "userData 必须是 JSON 对象"));
    }
    Ok(())
}
