//! 响应 DTO 定义
//!
//! 所有 REST API 的响应体结构

use rule_engine::{CompiledRule, EvalValue, EvaluationResult, ExpressionNode};
use serde::Serialize;

/// API 统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }

    /// 创建成功响应（自定义消息）
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

/// 编译/组合结果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledRuleDto {
    /// 线上格式的表达式树
    pub ast: ExpressionNode,
    /// 规则文本（组合规则为渲染后的文本）
    pub rule: String,
    pub referenced_fields: Vec<String>,
}

impl From<CompiledRule> for CompiledRuleDto {
    fn from(compiled: CompiledRule) -> Self {
        Self {
            ast: compiled.root,
            rule: compiled.source,
            referenced_fields: compiled.referenced_fields.into_iter().collect(),
        }
    }
}

/// 评估结果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationDto {
    pub result: EvalValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<String>>,
    pub evaluation_time_us: u64,
}

impl EvaluationDto {
    /// 转换评估结果，只有请求追踪时才返回 trace
    pub fn from_result(result: EvaluationResult, include_trace: bool) -> Self {
        Self {
            result: result.value,
            trace: include_trace.then_some(result.evaluation_trace),
            evaluation_time_us: result.evaluation_time_us,
        }
    }
}
