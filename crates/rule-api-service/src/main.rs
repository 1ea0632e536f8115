//! 规则表达式服务
//!
//! 提供规则编译、组合和评估的 REST API。

use axum::http::HeaderValue;
use rule_api_service::{routes, state::AppState};
use rule_shared::{
    config::AppConfig,
    observability::{self, ObservabilityConfig},
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const SERVICE_NAME: &str = "rule-api-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;

    let obs_config = ObservabilityConfig::from_app_config(&config);
    let _guard = observability::init(&obs_config).await?;

    info!(
        environment = %config.environment,
        max_rule_length = config.engine.max_rule_length,
        max_combine_rules = config.engine.max_combine_rules,
        "Starting {} on {}",
        SERVICE_NAME,
        config.server_addr()
    );

    let state = AppState::from_config(&config.engine);

    let app = routes::app(state).layer(cors_layer(config.is_production()));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 收到 SIGTERM 或 Ctrl+C 时停止接收新连接并等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// CORS 配置：通过 RULES_CORS_ORIGINS 环境变量控制允许的来源
fn cors_layer(is_production: bool) -> CorsLayer {
    let allowed_origins = std::env::var("RULES_CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    if allowed_origins == "*" {
        if is_production {
            warn!("RULES_CORS_ORIGINS=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        info!("CORS allowed_origins: * (all origins)");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        info!("CORS allowed_origins: {}", allowed_origins);
        let origins: Vec<_> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// 监听关闭信号
///
/// 收到 SIGTERM 或 Ctrl+C 任一信号后返回，触发 axum 的优雅关闭流程。
/// 信号处理器注册失败时该信号分支永不完成。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("注册 Ctrl+C 处理器失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("注册 SIGTERM 处理器失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
