//! 规则 API 处理器
//!
//! 实现规则的编译、组合和评估操作。

use std::time::Instant;

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use rule_engine::{EvaluationContext, ExpressionNode};
use rule_shared::observability::metrics::{record_rule_compilation, record_rule_evaluation};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    dto::{
        ApiResponse, CombineRulesRequest, CompileRuleRequest, CompiledRuleDto, EvaluateRuleRequest,
        EvaluationDto,
    },
    error::ApiError,
    state::AppState,
};

/// 编译单条规则
///
/// POST /api/rules/compile
pub async fn compile_rule(
    State(state): State<AppState>,
    payload: Result<Json<CompileRuleRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CompiledRuleDto>>, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let compiled = state.compiler.compile(&req.rule_string).map_err(|e| {
        record_rule_compilation("compile", "error");
        warn!(code = e.code(), error = %e, "Rule compilation failed");
        ApiError::Compile(e)
    })?;

    record_rule_compilation("compile", "success");
    info!(
        nodes = compiled.root.node_count(),
        fields = compiled.referenced_fields.len(),
        "Rule compiled"
    );

    Ok(Json(ApiResponse::success_with_message(
        compiled.into(),
        "规则编译成功",
    )))
}

/// 组合多条规则
///
/// POST /api/rules/combine
pub async fn combine_rules(
    State(state): State<AppState>,
    payload: Result<Json<CombineRulesRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CompiledRuleDto>>, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let combined = state
        .compiler
        .combine(&req.rule_strings, req.operator)
        .map_err(|e| {
            record_rule_compilation("combine", "error");
            warn!(code = e.code(), error = %e, "Rule combination failed");
            ApiError::Compile(e)
        })?;

    record_rule_compilation("combine", "success");
    info!(
        count = req.rule_strings.len(),
        operator = %req.operator,
        "Rules combined"
    );

    Ok(Json(ApiResponse::success_with_message(
        combined.into(),
        "规则组合成功",
    )))
}

/// 对数据评估表达式树
///
/// POST /api/rules/evaluate
pub async fn evaluate_rule(
    State(state): State<AppState>,
    payload: Result<Json<EvaluateRuleRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<EvaluationDto>>, ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let ast = ExpressionNode::from_value(req.ast).map_err(|e| {
        warn!(code = e.code(), error = %e, "Rejected invalid AST");
        ApiError::InvalidAst(e)
    })?;
    let context = EvaluationContext::from_value(req.user_data)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let trace = req.trace.unwrap_or(state.trace_enabled);
    let start = Instant::now();
    let outcome = state.executor(trace).execute(&ast, &context);
    let elapsed = start.elapsed().as_secs_f64();

    let result = match outcome {
        Ok(result) => {
            record_rule_evaluation("success", elapsed);
            result
        }
        Err(e) => {
            record_rule_evaluation("error", elapsed);
            warn!(code = e.code(), error = %e, "Rule evaluation failed");
            return Err(ApiError::Evaluation(e));
        }
    };

    info!(
        result = %result.value,
        evaluation_time_us = result.evaluation_time_us,
        "Rule evaluated"
    );

    Ok(Json(ApiResponse::success_with_message(
        EvaluationDto::from_result(result, trace),
        "规则评估完成",
    )))
}
