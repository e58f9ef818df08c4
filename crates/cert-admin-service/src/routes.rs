//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router,
    routing::{get, post},
};

use crate::{handlers, state::AppState};

/// 聊天会话管理路由
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/chat/session/start", post(handlers::session::start_session))
        .route("/chat/session/stop", post(handlers::session::stop_session))
        .route("/chat/session", get(handlers::session::session_info))
        .route("/chat/test", post(handlers::diagnostics::chat_test))
        .route("/email/test", post(handlers::diagnostics::email_test))
}

/// 证书生成、投递与状态路由
pub fn certificate_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/certificates/generate/{event_id}",
            post(handlers::certificates::generate),
        )
        .route(
            "/certificates/deliver/{event_id}",
            post(handlers::certificates::deliver),
        )
        .route(
            "/certificates/status/{event_id}",
            get(handlers::status::event_status),
        )
        .route(
            "/certificates/{certificate_id}",
            get(handlers::status::certificate_detail),
        )
}

/// 汇总全部 API 路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(session_routes())
        .merge(certificate_routes())
}
