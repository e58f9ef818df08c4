//! 证书管理后台服务入口
//!
//! 装配生成引擎与投递工作器，对外暴露 REST API。

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, http::HeaderValue, routing::get};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use cert_admin_service::{routes, state::AppState};
use cert_shared::config::AppConfig;
use cert_shared::observability;
use cert_shared::status::StatusTracker;
use cert_shared::store::{CertificateStore, MemoryCertificateStore};
use certificate_engine::batch::BatchGenerator;
use certificate_engine::render::{CertificateRenderer, StructuredEncoder};
use certificate_engine::storage::{ContentStore, FsContentStore};
use delivery_worker::chat::{ChatSession, SimulatedChatTransport};
use delivery_worker::email::{EmailAdapter, HttpMailTransport};
use delivery_worker::orchestrator::DeliveryOrchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(AppConfig::load("cert-admin-service").unwrap_or_default());
    let _guard = observability::init(&config.observability)?;

    info!("Starting cert-admin-service on {}", config.server_addr());

    // 生成引擎装配：制品落盘到本地目录，编码器产出结构化文档
    let content: Arc<dyn ContentStore> =
        Arc::new(FsContentStore::new(&config.storage.artifact_dir));
    let tracker = Arc::new(StatusTracker::new());
    // 证书记录的内存仓储；跨进程持久化由外部协作方提供，
    // 接入时替换为同一 trait 的数据库实现
    let store: Arc<dyn CertificateStore> = Arc::new(MemoryCertificateStore::new());
    let renderer = CertificateRenderer::new(
        content.clone(),
        Arc::new(StructuredEncoder::document()),
        config.storage.verify_base_url.clone(),
    );
    let generator = Arc::new(BatchGenerator::new(
        renderer,
        tracker.clone(),
        store.clone(),
    ));

    // 投递工作器装配
    let mail_transport = Arc::new(HttpMailTransport::new(&config.email)?);
    let email = Arc::new(EmailAdapter::new(mail_transport, content.clone()));
    // 聊天传输当前为模拟实现，接入真实网关时替换为同一 trait 的实现
    let chat = Arc::new(ChatSession::new(
        Arc::new(SimulatedChatTransport),
        content.clone(),
        config.chat.clone(),
    ));
    let orchestrator = Arc::new(DeliveryOrchestrator::new(
        email.clone(),
        chat.clone(),
        tracker.clone(),
        store.clone(),
        &config.email,
        &config.chat,
        &config.delivery,
    ));

    let state = AppState::new(
        config.clone(),
        tracker,
        store,
        generator,
        orchestrator,
        chat,
        email,
    );

    // CORS 配置：通过 CERT_CORS_ORIGINS 环境变量控制允许的来源
    // 默认允许本地开发地址，生产环境应设置为实际域名
    let allowed_origins = std::env::var("CERT_CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3001,http://localhost:5173".to_string());
    let cors = if allowed_origins == "*" {
        if config.is_production() {
            warn!("CERT_CORS_ORIGINS=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
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
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api", routes::api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(60)))
                .layer(cors),
        )
        .with_state(state);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("cert-admin-service listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("cert-admin-service shut down");
    Ok(())
}

/// 存活探针：服务进程正常即返回 ok
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "cert-admin-service"
    }))
}

/// 监听关闭信号
///
/// K8s 通过 SIGTERM 通知 Pod 停止；本地开发通过 Ctrl+C。
/// 收到任一信号后返回，触发 axum 的优雅关闭流程。
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("注册 Ctrl+C 处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("注册 SIGTERM 处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("收到 Ctrl+C，开始优雅关闭..."),
        _ = terminate => info!("收到 SIGTERM，开始优雅关闭..."),
    }
}
