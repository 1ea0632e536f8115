//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router, middleware,
    routing::{get, post},
};
use rule_shared::observability::middleware as obs_middleware;

use crate::{handlers, state::AppState};

/// 构建规则相关的路由
pub fn rule_routes() -> Router<AppState> {
    Router::new()
        .route("/rules/compile", post(handlers::rule::compile_rule))
        .route("/rules/combine", post(handlers::rule::combine_rules))
        .route("/rules/evaluate", post(handlers::rule::evaluate_rule))
}

/// 构建完整的应用路由（含可观测性中间件）
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", rule_routes())
        .route("/health", get(handlers::health_check))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
