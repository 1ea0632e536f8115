//! 规则服务错误类型定义
//!
//! 将请求校验失败和规则引擎错误映射为统一的 HTTP 响应

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rule_engine::RuleError;
use serde_json::json;

/// 规则服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 请求错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    // 规则引擎错误
    #[error("规则编译失败: {0}")]
    Compile(RuleError),
    #[error("表达式树无效: {0}")]
    InvalidAst(RuleError),
    #[error("规则评估失败: {0}")]
    Evaluation(RuleError),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Compile(_) | Self::InvalidAst(_) => StatusCode::BAD_REQUEST,
            Self::Evaluation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    ///
    /// 编译和组合失败直接使用规则引擎的错误码。
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Compile(e) => e.code(),
            Self::InvalidAst(_) => "INVALID_AST",
            Self::Evaluation(_) => "EVALUATION_FAILED",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "Request failed");
        }

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": self.to_string(),
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 请求体不是合法 JSON 或字段类型不匹配
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    fn all_error_variants() -> Vec<(ApiError, StatusCode, &'static str)> {
        vec![
            (
                ApiError::Validation("ruleString 不能为空".into()),
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                ApiError::Compile(RuleError::MalformedExpression("表达式为空".into())),
                StatusCode::BAD_REQUEST,
                "MALFORMED_EXPRESSION",
            ),
            (
                ApiError::Compile(RuleError::EmptyInput),
                StatusCode::BAD_REQUEST,
                "EMPTY_INPUT",
            ),
            (
                ApiError::Compile(RuleError::TooManyRules { count: 5, max: 2 }),
                StatusCode::BAD_REQUEST,
                "TOO_MANY_RULES",
            ),
            (
                ApiError::InvalidAst(RuleError::UnknownOperator("XOR".into())),
                StatusCode::BAD_REQUEST,
                "INVALID_AST",
            ),
            (
                ApiError::Evaluation(RuleError::InvalidComparison {
                    left: "Sales".into(),
                    right: "5".into(),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
                "EVALUATION_FAILED",
            ),
        ]
    }

    #[test]
    fn test_status_and_code_mapping() {
        for (error, status, code) in all_error_variants() {
            assert_eq!(error.status_code(), status, "variant: {:?}", error);
            assert_eq!(error.error_code(), code, "variant: {:?}", error);
        }
    }

    async fn response_body(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_envelope_shape() {
        let (status, body) = response_body(ApiError::Compile(RuleError::EmptyInput)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "EMPTY_INPUT");
        assert!(body["message"].as_str().unwrap().contains("规则编译失败"));
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_evaluation_message_is_preserved() {
        let error = ApiError::Evaluation(RuleError::InvalidComparison {
            left: "Sales".into(),
            right: "5".into(),
        });
        let (_, body) = response_body(error).await;

        let message = body["message"].as_str().unwrap();
        assert!(message.contains("Sales"));
    }
}
