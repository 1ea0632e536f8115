//! 规则 API 集成测试
//!
//! 通过 oneshot 直接驱动路由，验证请求校验、错误映射和响应格式。

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use rule_api_service::{AppState, routes};
use rule_shared::config::EngineConfig;
use serde_json::{Value, json};
use tower::ServiceExt;

fn create_test_app() -> Router {
    routes::app(AppState::from_config(&EngineConfig::default()))
}

fn create_limited_app() -> Router {
    let config = EngineConfig {
        max_rule_length: 16,
        max_combine_rules: 2,
        max_depth: 3,
        trace_enabled: true,
    };
    routes::app(AppState::from_config(&config))
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, uri, serde_json::to_string(&body).unwrap()).await
}

async fn post_raw(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

// ==================== 健康检查 ====================

#[tokio::test]
async fn test_health_check() {
    let response = create_test_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"OK");
}

// ==================== 编译 ====================

#[tokio::test]
async fn test_compile_rule() {
    let (status, body) = post_json(
        create_test_app(),
        "/api/rules/compile",
        json!({"ruleString": "age > 30 AND department == 'Sales'"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["code"], "SUCCESS");
    assert_eq!(body["data"]["rule"], "age > 30 AND department == 'Sales'");
    assert_eq!(
        body["data"]["referencedFields"],
        json!(["Sales", "age", "department"])
    );

    let ast = &body["data"]["ast"];
    assert_eq!(ast["type"], "operator");
    assert_eq!(ast["value"], "AND");
    assert_eq!(ast["left"]["value"], ">");
    assert_eq!(ast["right"]["right"]["value"], "'Sales'");
    assert!(ast["right"]["right"]["left"].is_null());
}

#[tokio::test]
async fn test_compile_empty_rule_is_validation_error() {
    let (status, body) =
        post_json(create_test_app(), "/api/rules/compile", json!({"ruleString": ""})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_compile_missing_field_is_validation_error() {
    let (status, body) = post_json(create_test_app(), "/api/rules/compile", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_invalid_json_body_is_validation_error() {
    let (status, body) =
        post_raw(create_test_app(), "/api/rules/compile", "{not json".to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_compile_malformed_rule() {
    for rule in ["AND age", "(age > 30"] {
        let (status, body) =
            post_json(create_test_app(), "/api/rules/compile", json!({"ruleString": rule})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "rule: {}", rule);
        assert_eq!(body["code"], "MALFORMED_EXPRESSION", "rule: {}", rule);
    }
}

#[tokio::test]
async fn test_compile_rule_too_long() {
    let (status, body) = post_json(
        create_limited_app(),
        "/api/rules/compile",
        json!({"ruleString": "age > 30 AND salary > 50000"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "RULE_TOO_LONG");
}

// ==================== 组合 ====================

#[tokio::test]
async fn test_combine_rules_with_or() {
    let (status, body) = post_json(
        create_test_app(),
        "/api/rules/combine",
        json!({"ruleStrings": ["age > 30", "department == Sales"], "operator": "OR"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ast"]["value"], "OR");
    assert_eq!(body["data"]["rule"], "(age > 30) OR (department == Sales)");
}

#[tokio::test]
async fn test_combine_defaults_to_and() {
    let (status, body) = post_json(
        create_test_app(),
        "/api/rules/combine",
        json!({"ruleStrings": ["a > 1", "b > 2"]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ast"]["value"], "AND");
}

#[tokio::test]
async fn test_combine_empty_list() {
    let (status, body) =
        post_json(create_test_app(), "/api/rules/combine", json!({"ruleStrings": []})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "EMPTY_INPUT");
}

#[tokio::test]
async fn test_combine_requires_string_array() {
    let (status, body) = post_json(
        create_test_app(),
        "/api/rules/combine",
        json!({"ruleStrings": "age > 30"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_combine_too_many_rules() {
    let (status, body) = post_json(
        create_limited_app(),
        "/api/rules/combine",
        json!({"ruleStrings": ["a", "b", "c"]}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "TOO_MANY_RULES");
}

// ==================== 评估 ====================

#[tokio::test]
async fn test_compile_then_evaluate() {
    let rule = "((age > 30 AND department == Sales) OR (age < 25 AND department == Marketing)) \
                AND (salary > 50000 OR experience > 5)";
    let (_, compiled) =
        post_json(create_test_app(), "/api/rules/compile", json!({"ruleString": rule})).await;

    let (status, body) = post_json(
        create_test_app(),
        "/api/rules/evaluate",
        json!({
            "ast": compiled["data"]["ast"],
            "userData": {"age": 32, "department": "Sales", "salary": 60000, "experience": 6}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result"], true);
    assert!(body["data"]["evaluationTimeUs"].is_u64());
    assert!(body["data"].get("trace").is_none());
}

#[tokio::test]
async fn test_evaluate_with_trace() {
    let ast = json!({
        "type": "operator", "value": ">",
        "left": {"type": "operand", "value": "age", "left": null, "right": null},
        "right": {"type": "operand", "value": 30, "left": null, "right": null}
    });

    let (status, body) = post_json(
        create_test_app(),
        "/api/rules/evaluate",
        json!({"ast": ast, "userData": {"age": 28}, "trace": true}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result"], false);
    assert_eq!(
        body["data"]["trace"],
        json!(["root.left: age => 28", "root.right: 30 => 30", "root: age > 30 => false"])
    );
}

#[tokio::test]
async fn test_evaluate_trace_follows_config() {
    let ast = json!({"type": "operand", "value": "salary", "left": null, "right": null});

    let (status, body) = post_json(
        create_limited_app(),
        "/api/rules/evaluate",
        json!({"ast": ast, "userData": {"salary": 60000}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result"], 60000);
    assert_eq!(body["data"]["trace"], json!(["root: salary => 60000"]));
}

#[tokio::test]
async fn test_evaluate_missing_user_data() {
    let ast = json!({"type": "operand", "value": "x", "left": null, "right": null});
    let (status, body) =
        post_json(create_test_app(), "/api/rules/evaluate", json!({"ast": ast})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_evaluate_user_data_must_be_object() {
    let ast = json!({"type": "operand", "value": "x", "left": null, "right": null});
    let (status, body) = post_json(
        create_test_app(),
        "/api/rules/evaluate",
        json!({"ast": ast, "userData": [1, 2, 3]}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_evaluate_invalid_ast() {
    let cases = [
        json!({"type": "operator", "value": "XOR",
               "left": {"type": "operand", "value": "a"},
               "right": {"type": "operand", "value": "b"}}),
        json!({"type": "operand", "value": true}),
        json!({"type": "operator", "value": "AND", "left": null, "right": null}),
        json!({"type": "function", "value": "f"}),
    ];

    for ast in cases {
        let (status, body) = post_json(
            create_test_app(),
            "/api/rules/evaluate",
            json!({"ast": ast.clone(), "userData": {}}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "ast: {}", ast);
        assert_eq!(body["code"], "INVALID_AST", "ast: {}", ast);
    }
}

#[tokio::test]
async fn test_evaluate_invalid_comparison() {
    let ast = json!({
        "type": "operator", "value": ">",
        "left": {"type": "operand", "value": "department", "left": null, "right": null},
        "right": {"type": "operand", "value": "5", "left": null, "right": null}
    });

    let (status, body) = post_json(
        create_test_app(),
        "/api/rules/evaluate",
        json!({"ast": ast, "userData": {"department": "Sales"}}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "EVALUATION_FAILED");
    assert!(body["message"].as_str().unwrap().contains("Sales"));
}

// ==================== 树深度 ====================

fn and_chain(clauses: usize) -> String {
    vec!["a > 1"; clauses].join(" AND ")
}

#[tokio::test]
async fn test_deepest_compiled_tree_can_be_evaluated() {
    // n 个条件的左结合链深度为 n + 1
    let (status, compiled) = post_json(
        create_test_app(),
        "/api/rules/compile",
        json!({"ruleString": and_chain(rule_engine::MAX_TREE_DEPTH - 1)}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(
        create_test_app(),
        "/api/rules/evaluate",
        json!({"ast": compiled["data"]["ast"], "userData": {"a": 2}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["data"]["result"], true);
}

#[tokio::test]
async fn test_compile_rejects_tree_deeper_than_json_limit() {
    let (status, body) = post_json(
        create_test_app(),
        "/api/rules/compile",
        json!({"ruleString": and_chain(130)}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "TREE_TOO_DEEP");
}

#[tokio::test]
async fn test_combine_rejects_too_deep_result() {
    let rules = vec!["a > 1"; 100];
    let (status, body) = post_json(
        create_test_app(),
        "/api/rules/combine",
        json!({"ruleStrings": rules}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "TREE_TOO_DEEP");
}

#[tokio::test]
async fn test_compile_respects_configured_depth() {
    let (status, body) = post_json(
        create_limited_app(),
        "/api/rules/compile",
        json!({"ruleString": "a OR b OR c OR d"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "TREE_TOO_DEEP");
}

#[tokio::test]
async fn test_evaluate_rejects_too_deep_ast() {
    let mut ast = json!({"type": "operand", "value": "a", "left": null, "right": null});
    for _ in 0..rule_engine::MAX_TREE_DEPTH + 5 {
        ast = json!({
            "type": "operator", "value": "AND",
            "left": ast,
            "right": {"type": "operand", "value": "b", "left": null, "right": null}
        });
    }

    let (status, body) = post_json(
        create_test_app(),
        "/api/rules/evaluate",
        json!({"ast": ast, "userData": {}}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_AST");
}

#[tokio::test]
async fn test_combine_rejects_empty_rule_string() {
    let (status, body) = post_json(
        create_test_app(),
        "/api/rules/combine",
        json!({"ruleStrings": ["a > 1", ""]}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
